//! Admin endpoints for payment gateway configuration.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::api::AppState;
use crate::error::AppError;
use crate::gateways::{GatewayConfig, NewGateway};

/// Save responses carry an advisory list of still-missing required fields:
/// saving incomplete is allowed, dispatching with it is not.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    #[serde(flatten)]
    pub gateway: GatewayConfig,
    pub missing_fields: Vec<&'static str>,
}

impl From<GatewayConfig> for GatewayResponse {
    fn from(gateway: GatewayConfig) -> Self {
        let missing_fields = gateway.settings.missing_required_fields();
        Self {
            gateway,
            missing_fields,
        }
    }
}

pub async fn create(
    State(state): State<AppState>,
    Json(new): Json<NewGateway>,
) -> Result<(StatusCode, Json<GatewayResponse>), AppError> {
    let gateway = state.gateways.create(new).await?;
    Ok((StatusCode::CREATED, Json(gateway.into())))
}

pub async fn list(State(state): State<AppState>) -> Json<Vec<GatewayResponse>> {
    let gateways = state.gateways.list().await;
    Json(gateways.into_iter().map(Into::into).collect())
}

pub async fn active(State(state): State<AppState>) -> Result<Json<GatewayResponse>, AppError> {
    match state.gateways.get_active().await {
        Some(gateway) => Ok(Json(gateway.into())),
        None => Err(AppError::NoActiveGateway),
    }
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<serde_json::Value>,
) -> Result<Json<GatewayResponse>, AppError> {
    let gateway = state.gateways.update(id, patch).await?;
    Ok(Json(gateway.into()))
}

pub async fn enable(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GatewayResponse>, AppError> {
    let gateway = state.gateways.set_enabled(id).await?;
    Ok(Json(gateway.into()))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.gateways.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
