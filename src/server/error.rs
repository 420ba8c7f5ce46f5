use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::Error;

/// Error returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Session(#[from] Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AppError::Session(err) => {
                let status = match &err {
                    Error::NotFound(_) => StatusCode::NOT_FOUND,
                    Error::SessionFull(_)
                    | Error::SessionCompleted(_)
                    | Error::DuplicateSwipe { .. } => StatusCode::CONFLICT,
                    Error::InvalidKeyFormat(_) | Error::InvalidEvent(_) => StatusCode::BAD_REQUEST,
                    Error::NotParticipant(_) => StatusCode::FORBIDDEN,
                    Error::KeyGenerationExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
                    Error::Config(_) | Error::Backend(_) | Error::Encode(_) | Error::Decode(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %err, "request failed");
                    "Internal server error".to_string()
                } else {
                    err.to_string()
                };
                (status, err.kind(), message)
            }
        };

        let body = Json(json!({
            "error": code,
            "message": message
        }));

        (status, body).into_response()
    }
}
