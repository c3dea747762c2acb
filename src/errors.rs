use crate::{handlers::xml::render_error, services::storage_service::StorageError};
use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::fmt;
use tracing::error;

/// A lightweight wrapper for request errors: one status, one message.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = render_error(self.status.as_u16(), &self.message);
        (
            self.status,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/xml"))],
            body,
        )
            .into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let status = match &err {
            StorageError::InvalidBucketName { .. }
            | StorageError::MissingBucketName
            | StorageError::InvalidObjectKey => StatusCode::BAD_REQUEST,
            StorageError::BucketAlreadyExists(_)
            | StorageError::BucketDirectoryExists(_)
            | StorageError::BucketNotEmpty(_) => StatusCode::CONFLICT,
            StorageError::BucketNotFound(_)
            | StorageError::BucketDirectoryMissing(_)
            | StorageError::ObjectNotFound { .. } => StatusCode::NOT_FOUND,
            StorageError::CorruptCatalog { .. }
            | StorageError::CatalogDrift(_)
            | StorageError::Csv(_)
            | StorageError::Io(_) => {
                error!("storage failure: {}", err);
                return AppError::internal(err.to_string());
            }
        };

        // Validation errors carry their reason alone, like the rest of the API.
        let message = match err {
            StorageError::InvalidBucketName { reason, .. } => reason,
            other => other.to_string(),
        };
        AppError::new(status, message)
    }
}
