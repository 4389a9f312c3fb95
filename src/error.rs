use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::domain::error::{DomainError, OpError, RepoError};

/// Transport-facing error. Wraps `DomainError` for the business-rule cases
/// and carries its own variants for everything below the domain layer.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Override the HTTP status a `DomainError` would otherwise carry.
    /// Used by the refresh-token flow, where `UserNotFound`/`UserInactive`
    /// describe a dead session rather than a missing resource.
    pub fn with_status(self, status: StatusCode) -> StatusAppError {
        StatusAppError { inner: self, status }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => AppError::Domain(DomainError::UserNotFound),
            RepoError::Conflict(msg) => AppError::Validation(msg),
            RepoError::Backend(e) => AppError::Internal(e),
        }
    }
}

impl From<OpError> for AppError {
    fn from(e: OpError) -> Self {
        match e {
            OpError::Domain(d) => AppError::Domain(d),
            OpError::Repo(r) => AppError::from(r),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Domain(d) => (d.status(), d.code().to_string(), d.to_string()),
            AppError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR".to_string(),
                msg.clone(),
            ),
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR".to_string(),
                    "internal server error".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR".to_string(),
                    "internal server error".to_string(),
                )
            }
        };

        render(status, code, message)
    }
}

/// An `AppError` whose HTTP status has been overridden for a specific call site.
pub struct StatusAppError {
    inner: AppError,
    status: StatusCode,
}

impl IntoResponse for StatusAppError {
    fn into_response(self) -> Response {
        let code = match &self.inner {
            AppError::Domain(d) => d.code().to_string(),
            AppError::Validation(_) => "VALIDATION_ERROR".to_string(),
            _ => "INTERNAL_SERVER_ERROR".to_string(),
        };
        render(self.status, code, self.inner.to_string())
    }
}

fn render(status: StatusCode, code: String, message: String) -> Response {
    let body = json!({
        "error": {
            "code": code,
            "message": message,
        }
    });
    (status, Json(body)).into_response()
}

pub type AppResult<T> = Result<T, AppError>;
