//! Error types for the facilitator HTTP surface.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors the facilitator routes can return.
///
/// Payment rejections are never errors; they are `200` responses with
/// `isValid: false` or `success: false`.
#[derive(Debug, thiserror::Error)]
pub enum FacilitatorError {
    /// The request body is not a valid verify/settle request.
    #[error("invalid request body: {0}")]
    InvalidBody(#[from] JsonRejection),
}

impl IntoResponse for FacilitatorError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
