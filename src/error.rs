use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::{catalog::CatalogError, storage::StorageError},
    state::{room::ActionError, state_machine::InvalidTransition},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Action issued by a player who is not in the room.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Concurrent writers or the catalog prevented the operation.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Operation exceeded its timeout limit.
    #[error("operation timed out")]
    Timeout,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { id } => ServiceError::NotFound(format!("room `{id}`")),
            StorageError::AlreadyExists { .. } | StorageError::VersionConflict { .. } => {
                ServiceError::Conflict(err.to_string())
            }
            StorageError::Unavailable { .. } => ServiceError::Unavailable(err),
        }
    }
}

impl From<CatalogError> for ServiceError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Insufficient { .. } => ServiceError::Conflict(err.to_string()),
            CatalogError::Storage(source) => source.into(),
        }
    }
}

impl From<ActionError> for ServiceError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::NotMember(_) => ServiceError::Forbidden(err.to_string()),
            ActionError::NotWaiting(_) | ActionError::NotPlaying(_) => {
                ServiceError::InvalidState(err.to_string())
            }
            ActionError::InvalidTransition(invalid) => invalid.into(),
        }
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::InvalidState(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Caller may not act on this resource.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Forbidden(message) => AppError::Forbidden(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidState(message) | ServiceError::Conflict(message) => {
                AppError::Conflict(message)
            }
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Timeout => AppError::ServiceUnavailable("operation timed out".into()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl AppError {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
