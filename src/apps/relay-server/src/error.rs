use atelier_core::AtelierError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Error body returned by JSON routes: `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl From<AtelierError> for ApiError {
    fn from(err: AtelierError) -> Self {
        let status = match &err {
            AtelierError::Validation(_) => StatusCode::BAD_REQUEST,
            AtelierError::NotFound(_) => StatusCode::NOT_FOUND,
            AtelierError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AtelierError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
            AtelierError::Provider(_) | AtelierError::Http(_) => StatusCode::BAD_GATEWAY,
            AtelierError::Serialization(_) | AtelierError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: status={}, error={}", self.status, self.message);
        } else {
            tracing::debug!("Request rejected: status={}, error={}", self.status, self.message);
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
