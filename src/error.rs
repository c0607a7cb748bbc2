//! Error types for the model port, the AI gateway, and the HTTP edge.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Failures talking to the external text-generation service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("model request failed: {0}")]
    RequestFailed(String),
    #[error("model returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
}

/// Errors surfaced by the AI content gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A required request field was absent or blank. Checked before any network call.
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// The model was unreachable, not configured, or answered with a non-success status.
    #[error("upstream model error: {0}")]
    Upstream(String),

    /// The model replied but no usable JSON could be extracted.
    #[error("could not parse model reply: {0}")]
    Parse(String),

    /// The reply parsed but nothing survived validation.
    #[error("model reply contained no valid {0}")]
    EmptyResult(&'static str),
}

impl From<LlmError> for GatewayError {
    fn from(e: LlmError) -> Self {
        Self::Upstream(e.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub details: String,
}

/// Errors returned by HTTP handlers, rendered as `{error, details}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status_and_body(&self) -> (StatusCode, ErrorBody) {
        match self {
            ApiError::Gateway(GatewayError::MissingParameter(name)) => (
                StatusCode::BAD_REQUEST,
                ErrorBody { error: "Missing required parameters".into(), details: format!("`{name}` is required") },
            ),
            ApiError::Gateway(e @ GatewayError::Upstream(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody { error: "AI service request failed".into(), details: e.to_string() },
            ),
            ApiError::Gateway(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody { error: "AI service returned unusable content".into(), details: e.to_string() },
            ),
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                ErrorBody { error: "Not found".into(), details: what.clone() },
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody { error: "Bad request".into(), details: msg.clone() },
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        if status.is_server_error() {
            tracing::error!(target: "codequest_backend", %status, error = %self, "Request failed");
        } else {
            tracing::warn!(target: "codequest_backend", %status, error = %self, "Request rejected");
        }
        (status, Json(body)).into_response()
    }
}
