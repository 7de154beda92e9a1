//! Application services.
//!
//! Logic shared by several handlers lives here: the single answer-recording
//! path, test generation and grading, and the side-effect event channel.

pub mod achievements;
pub mod events;
pub mod learning;
pub mod quiz;

use crate::db::DbLockError;
use crate::response::AppError;

/// Errors raised by domain services
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error(transparent)]
    Lock(#[from] DbLockError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::NotFound(what) => AppError::not_found(format!("{what} not found")),
            ServiceError::Forbidden(msg) => AppError::forbidden(msg),
            ServiceError::Invalid(msg) => AppError::validation(msg),
            ServiceError::Conflict(msg) => AppError::conflict(msg),
            ServiceError::Database(e) => AppError::from(e),
            ServiceError::Lock(e) => AppError::from(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_service_error_mapping() {
        let e: AppError = ServiceError::NotFound("Word").into();
        assert_eq!(e.status(), StatusCode::NOT_FOUND);
        assert_eq!(e.to_string(), "Word not found");

        let e: AppError = ServiceError::Invalid("bad".into()).into();
        assert_eq!(e.code(), "VALIDATION_ERROR");

        let e: AppError = ServiceError::Database(rusqlite::Error::QueryReturnedNoRows).into();
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
