//! Application-wide error taxonomy.
//!
//! Every fallible operation in the payment core returns [`AppError`]. The
//! variants map one-to-one onto the error surface exposed by the HTTP API:
//! each carries a stable machine-readable code, an HTTP status, and a
//! user-facing message with enough detail to fix the input.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Bad input on save or dispatch (missing name, malformed patch, ...).
    #[error("validation failed: {message}")]
    Validation { message: String },

    #[error("payment gateway not found: {id}")]
    GatewayNotFound { id: Uuid },

    /// Dispatch was attempted while zero gateways are enabled.
    #[error("no active payment gateway")]
    NoActiveGateway,

    /// The enabled gateway failed validation at dispatch time.
    #[error("active gateway is misconfigured, missing fields: {}", missing.join(", "))]
    GatewayMisconfigured { missing: Vec<String> },

    /// The requested payment method cannot be served by the active gateway.
    #[error("payment method {method} is not available on the active gateway ({gateway})")]
    MethodNotAvailable { method: String, gateway: String },

    /// Network or remote failure talking to the instant-payment provider.
    /// Retryable errors are retried on the next poll tick; creation
    /// failures are surfaced immediately.
    #[error("provider request failed: {message}")]
    Provider { message: String, retryable: bool },

    /// Receipt upload violated a file constraint (mime type or size).
    #[error("invalid receipt file: {constraint}")]
    InvalidFile { constraint: String },

    /// The provider handed back a payment whose validity window has
    /// already closed.
    #[error("payment session {payment_id} is already past its expiry")]
    ExpiredSession { payment_id: String },

    #[error("no payment session found for {reference}")]
    SessionNotFound { reference: String },

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn provider(message: impl Into<String>, retryable: bool) -> Self {
        Self::Provider {
            message: message.into(),
            retryable,
        }
    }

    /// Stable machine-readable code for API clients.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::GatewayNotFound { .. } => "GATEWAY_NOT_FOUND",
            Self::NoActiveGateway => "NO_ACTIVE_GATEWAY",
            Self::GatewayMisconfigured { .. } => "GATEWAY_MISCONFIGURED",
            Self::MethodNotAvailable { .. } => "METHOD_NOT_AVAILABLE",
            Self::Provider { .. } => "PROVIDER_REQUEST_FAILED",
            Self::InvalidFile { .. } => "INVALID_FILE",
            Self::ExpiredSession { .. } => "SESSION_EXPIRED",
            Self::SessionNotFound { .. } => "SESSION_NOT_FOUND",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::InvalidFile { .. } => StatusCode::BAD_REQUEST,
            Self::GatewayNotFound { .. } | Self::SessionNotFound { .. } => StatusCode::NOT_FOUND,
            Self::NoActiveGateway => StatusCode::CONFLICT,
            Self::GatewayMisconfigured { .. } | Self::MethodNotAvailable { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Provider { .. } => StatusCode::BAD_GATEWAY,
            Self::ExpiredSession { .. } => StatusCode::GONE,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider { retryable, .. } => *retryable,
            Self::Storage(_) => true,
            _ => false,
        }
    }

    /// Message safe to show to an end user or administrator.
    pub fn user_message(&self) -> String {
        match self {
            Self::NoActiveGateway => "No active payment gateway is configured.".to_string(),
            Self::Provider { .. } => {
                "The payment provider could not be reached. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Wire format for error responses, mirrored by API clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let missing_fields = match &self {
            AppError::GatewayMisconfigured { missing } => Some(missing.clone()),
            _ => None,
        };
        let body = ErrorBody {
            code: self.error_code(),
            message: self.user_message(),
            missing_fields,
            retry_after_secs: self.is_retryable().then_some(10),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
