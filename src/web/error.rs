// Error types for the raw upload API

use crate::error::EnhanceError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// API server error types
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotAcceptable(String),
    UnsupportedMediaType(String),
    InternalServerError(String),
    ServiceUnavailable(String),

    // Application-specific errors
    ImageProcessingError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotAcceptable(msg) => (StatusCode::NOT_ACCEPTABLE, msg),
            Self::UnsupportedMediaType(msg) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, msg),
            Self::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            Self::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),

            // Map application-specific errors to appropriate HTTP status codes
            Self::ImageProcessingError(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(json!({
            "error": {
                "status": status.as_u16(),
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<EnhanceError> for ApiError {
    fn from(error: EnhanceError) -> Self {
        let message = error.to_string();
        match error {
            // Only the weight download reaches here; its URL stays in the logs
            EnhanceError::Network { .. } | EnhanceError::HttpStatus { .. } => {
                tracing::error!("Model download failed: {}", message);
                Self::ServiceUnavailable("Super-resolution model is unavailable".to_string())
            }
            EnhanceError::Decode(_) => Self::ImageProcessingError(message),
            EnhanceError::InvalidScale(_) | EnhanceError::InvalidRequest(_) => {
                Self::BadRequest(message)
            }
            EnhanceError::ModelUnavailable => Self::ServiceUnavailable(message),
            EnhanceError::Model(_)
            | EnhanceError::Encode(_)
            | EnhanceError::Io { .. }
            | EnhanceError::Storage(_)
            | EnhanceError::InputDirMissing(_)
            | EnhanceError::NoInputImages(_)
            | EnhanceError::Internal(_) => Self::InternalServerError(message),
        }
    }
}
