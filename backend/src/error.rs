use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use std::fmt::Display;

use crate::storage::image_store::StorageError;
use crate::upload::service::UploadError;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Logs the underlying cause and hides it behind a client-facing message.
    pub fn internal(message: &str, cause: impl Display) -> Self {
        log::error!("{}: {}", message, cause);
        ApiError::Internal(message.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Storage(StorageError::FileTooLarge { size, max }) => {
                ApiError::PayloadTooLarge(format!(
                    "Upload of {} bytes exceeds the {} byte limit",
                    size, max
                ))
            }
            other => ApiError::internal("Failed to record upload", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::RepositoryError;

    #[test]
    fn oversized_uploads_map_to_413() {
        let err: ApiError = UploadError::Storage(StorageError::FileTooLarge { size: 9, max: 4 }).into();
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn storage_failures_hide_details() {
        let err: ApiError =
            UploadError::Repository(RepositoryError::DynamoDb("throttled".into())).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Failed to record upload");
    }
}
