//! Mapping of service errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::JournalError;
use crate::validation::Violation;

#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ValidationBody {
    pub message: &'static str,
    pub details: Vec<Violation>,
}

#[derive(Debug)]
pub enum ApiError {
    Journal(JournalError),
    /// The request body could not be read at all.
    Rejected(StatusCode, String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Rejected(StatusCode::BAD_REQUEST, message.into())
    }
}

impl From<JournalError> for ApiError {
    fn from(err: JournalError) -> Self {
        ApiError::Journal(err)
    }
}

fn message(status: StatusCode, text: impl Into<String>) -> Response {
    (
        status,
        Json(MessageBody {
            message: text.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Journal(JournalError::Validation(errors)) => (
                StatusCode::BAD_REQUEST,
                Json(ValidationBody {
                    message: "Validation failed",
                    details: errors.details,
                }),
            )
                .into_response(),
            ApiError::Journal(JournalError::NotFound(_)) => {
                message(StatusCode::NOT_FOUND, "Not found")
            }
            ApiError::Journal(err) => {
                tracing::error!(error = %err, "request failed");
                message(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
            }
            ApiError::Rejected(status, text) => message(status, text),
        }
    }
}
