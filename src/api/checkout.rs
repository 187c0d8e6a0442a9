//! Checkout payment dispatch endpoint.

use axum::extract::State;
use axum::Json;

use crate::api::AppState;
use crate::dispatch::{DispatchRequest, DispatchResult};
use crate::error::AppError;

pub async fn dispatch(
    State(state): State<AppState>,
    Json(req): Json<DispatchRequest>,
) -> Result<Json<DispatchResult>, AppError> {
    let result = state.dispatcher.dispatch(req).await?;
    Ok(Json(result))
}
