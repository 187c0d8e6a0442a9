//! HTTP API surface.
//!
//! Admin gateway management, checkout dispatch, instant-session status and
//! cancellation, and receipt upload. The core emits typed results; this
//! layer only translates them to JSON and status codes.

pub mod checkout;
pub mod gateways;
pub mod receipts;
pub mod sessions;

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};

use crate::dispatch::PaymentDispatcher;
use crate::gateways::GatewayRepository;
use crate::middleware::logging::{request_logging, UuidRequestId};
use crate::receipts::ReceiptIntake;
use crate::sessions::SessionManager;

#[derive(Clone)]
pub struct AppState {
    pub gateways: Arc<dyn GatewayRepository>,
    pub dispatcher: Arc<PaymentDispatcher>,
    pub sessions: Arc<SessionManager>,
    pub receipts: Arc<ReceiptIntake>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/admin/gateways",
            post(gateways::create).get(gateways::list),
        )
        .route("/api/admin/gateways/active", get(gateways::active))
        .route(
            "/api/admin/gateways/{id}",
            patch(gateways::update).delete(gateways::remove),
        )
        .route("/api/admin/gateways/{id}/enable", post(gateways::enable))
        .route("/api/checkout/payment", post(checkout::dispatch))
        .route("/api/payments/instant/{payment_id}", get(sessions::status))
        .route(
            "/api/payments/instant/{payment_id}/cancel",
            post(sessions::cancel),
        )
        .route("/api/orders/{order_id}/receipt", post(receipts::upload))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(axum::middleware::from_fn(request_logging))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}
