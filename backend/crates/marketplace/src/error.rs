//! Marketplace Error Types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

use crate::domain::value_object::ApplicationStatus;

pub type MarketplaceResult<T> = Result<T, MarketplaceError>;

#[derive(Debug, Error)]
pub enum MarketplaceError {
    #[error("Organization not found")]
    OrganizationNotFound,

    #[error("Job not found")]
    JobNotFound,

    #[error("Application not found")]
    ApplicationNotFound,

    #[error("Message not found")]
    MessageNotFound,

    #[error("Job is closed")]
    JobClosed,

    #[error("You have already applied to this job")]
    DuplicateApplication,

    #[error("Application cannot move from {from} to {to}")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },

    #[error("Application was modified concurrently")]
    ConcurrentModification,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    App(AppError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MarketplaceError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MarketplaceError::OrganizationNotFound
            | MarketplaceError::JobNotFound
            | MarketplaceError::ApplicationNotFound
            | MarketplaceError::MessageNotFound => ErrorKind::NotFound,
            MarketplaceError::JobClosed
            | MarketplaceError::DuplicateApplication
            | MarketplaceError::InvalidTransition { .. }
            | MarketplaceError::ConcurrentModification => ErrorKind::Conflict,
            MarketplaceError::Validation(_) => ErrorKind::BadRequest,
            MarketplaceError::App(e) => e.kind(),
            MarketplaceError::Database(_) | MarketplaceError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    pub fn to_app_error(&self) -> AppError {
        match self {
            MarketplaceError::App(e) => e.public_copy(),
            MarketplaceError::Database(_) | MarketplaceError::Internal(_) => {
                AppError::internal("Internal server error")
            }
            MarketplaceError::DuplicateApplication => AppError::conflict(self.to_string())
                .with_action("Withdraw the existing application to change it"),
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    fn log(&self) {
        match self {
            MarketplaceError::Database(e) => {
                tracing::error!(error = %e, "Marketplace database error")
            }
            MarketplaceError::Internal(msg) => {
                tracing::error!(message = %msg, "Marketplace internal error")
            }
            MarketplaceError::App(e) if e.is_server_error() => {
                tracing::error!(error = %e, "Marketplace error")
            }
            _ => tracing::debug!(error = %self, "Marketplace error"),
        }
    }
}

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for MarketplaceError {
    fn from(err: AppError) -> Self {
        MarketplaceError::App(err)
    }
}
