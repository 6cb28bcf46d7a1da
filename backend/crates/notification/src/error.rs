//! Notification Error Types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

pub type NotificationResult<T> = Result<T, NotificationError>;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification not found")]
    NotificationNotFound,

    #[error("{0}")]
    App(AppError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl NotificationError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            NotificationError::NotificationNotFound => ErrorKind::NotFound,
            NotificationError::App(e) => e.kind(),
            NotificationError::Database(_) | NotificationError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    pub fn to_app_error(&self) -> AppError {
        match self {
            NotificationError::App(e) => e.public_copy(),
            NotificationError::Database(_) | NotificationError::Internal(_) => {
                AppError::internal("Internal server error")
            }
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    fn log(&self) {
        match self {
            NotificationError::Database(e) => {
                tracing::error!(error = %e, "Notification database error")
            }
            NotificationError::Internal(msg) => {
                tracing::error!(message = %msg, "Notification internal error")
            }
            _ => tracing::debug!(error = %self, "Notification error"),
        }
    }
}

impl IntoResponse for NotificationError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for NotificationError {
    fn from(err: AppError) -> Self {
        NotificationError::App(err)
    }
}
