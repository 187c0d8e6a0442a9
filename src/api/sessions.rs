//! Instant-payment session status and cancellation endpoints.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::AppState;
use crate::dispatch::SessionSummary;
use crate::error::AppError;
use crate::sessions::SessionStatus;

pub async fn status(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Json<SessionSummary>, AppError> {
    let (session, remaining) = state
        .sessions
        .snapshot_by_payment_id(&payment_id)
        .await
        .ok_or(AppError::SessionNotFound {
            reference: payment_id,
        })?;
    Ok(Json(SessionSummary::from_session(&session, remaining)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
}

/// Cancel is idempotent: cancelling an unknown or already-torn-down
/// session reports `cancelled: false` rather than failing.
pub async fn cancel(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Json<CancelResponse> {
    let status = state
        .sessions
        .get_by_payment_id(&payment_id)
        .await
        .map(|s| s.status());
    let cancelled = state.sessions.cancel_by_payment_id(&payment_id).await;
    let status = if cancelled {
        Some(SessionStatus::Cancelled)
    } else {
        status
    };
    Json(CancelResponse { cancelled, status })
}
