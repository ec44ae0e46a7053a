use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::erp::ErpError;

/// JSON error body returned by the HTTP surface.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Not Found", "Service Unavailable").
    pub error: String,
    /// Human-readable error description.
    pub message: String,
    /// ISO 8601 timestamp when the error occurred.
    pub timestamp: String,
}

/// Service-level error taxonomy surfaced to callers of `get_status`.
///
/// Everything else in the reconciliation pipeline is absorbed internally:
/// a missing document type is treated as zero rows, partial variant
/// resolution falls back to inline text, and row coercion never fails.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The MTO has no production orders at all. Fatal, not retried.
    #[error("MTO {0} not found")]
    MtoNotFound(String),

    /// An ERP call failed after retries were exhausted. The inner text is
    /// logged but never leaked to API consumers.
    #[error("upstream ERP unavailable: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ErpError> for ServiceError {
    fn from(err: ErpError) -> Self {
        match err {
            // Readers absorb this before it can reach the service layer;
            // mapping it anyway keeps the conversion total.
            ErpError::FormNotFound(form) => {
                ServiceError::Upstream(format!("form {form} unavailable"))
            }
            ErpError::Timeout => ServiceError::Upstream("request timed out".into()),
            ErpError::Transport(msg) | ErpError::Query(msg) | ErpError::Protocol(msg) => {
                ServiceError::Upstream(msg)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            ServiceError::MtoNotFound(mto) => (
                StatusCode::NOT_FOUND,
                "Not Found",
                format!("MTO {mto} not found"),
            ),
            ServiceError::Upstream(detail) => {
                error!(detail = %detail, "upstream ERP failure surfaced to caller");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service Unavailable",
                    "Data temporarily unavailable, please try again".to_string(),
                )
            }
            ServiceError::Internal(detail) => {
                error!(detail = %detail, "internal error surfaced to caller");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message,
            timestamp: Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}
