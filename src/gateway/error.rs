//! Gateway error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Client sent an unusable request.
    #[error("{message}")]
    BadRequest { message: String },

    /// The analysis task did not finish within the gateway deadline.
    #[error("analysis timed out")]
    AnalysisTimeout,
}

impl GatewayError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            GatewayError::AnalysisTimeout => StatusCode::GATEWAY_TIMEOUT,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
