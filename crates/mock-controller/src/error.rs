//! Error responses of the mock controller.
//!
//! [`ApiError`] implements [`axum::response::IntoResponse`] and renders the
//! controller's error bodies: field errors as `{"<field>": ["<message>"]}`,
//! missing detail objects as `{"detail": "Not found."}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use credsource_sdk::SdkError;
use serde_json::json;

/// Fields whose dangling references are reported as invalid primary keys.
const REFERENCE_FIELDS: [&str; 4] = [
    "target_credential",
    "source_credential",
    "credential_type",
    "organization",
];

/// Errors returned by the mock controller's handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The addressed object does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A field of the request body was rejected.
    #[error("{field}: {message}")]
    Invalid {
        /// Offending field, or `__all__` for object-level errors.
        field: String,
        /// Human-readable message.
        message: String,
    },

    /// The backing store refused to serve.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SdkError> for ApiError {
    fn from(e: SdkError) -> Self {
        match e {
            SdkError::Conflict(message) => Self::Invalid {
                field: "__all__".into(),
                message,
            },
            SdkError::NotFound { what } => match what.split_once(' ') {
                Some((field, pk)) if REFERENCE_FIELDS.contains(&field) => Self::Invalid {
                    field: field.to_string(),
                    message: format!("Invalid pk \"{pk}\" - object does not exist."),
                },
                _ => Self::NotFound(what),
            },
            SdkError::Validation(message) => match message.split_once(": ") {
                Some((field, reason)) if !field.contains(' ') => Self::Invalid {
                    field: field.to_string(),
                    message: reason.to_string(),
                },
                _ => Self::Invalid {
                    field: "__all__".into(),
                    message,
                },
            },
            SdkError::Unavailable(message) => Self::Unavailable(message),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, json!({ "detail": "Not found." })),
            Self::Invalid { field, message } => {
                let mut errors = serde_json::Map::new();
                errors.insert(field.clone(), json!([message]));
                (StatusCode::BAD_REQUEST, errors.into())
            }
            Self::Unavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "detail": self.to_string() }),
            ),
            Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "detail": self.to_string() }),
            ),
        };

        if status.is_server_error() {
            tracing::error!(%status, error = %self, "request failed");
        } else {
            tracing::info!(%status, error = %self, "request rejected");
        }
        (status, Json(body)).into_response()
    }
}
