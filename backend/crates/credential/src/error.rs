//! Credential Error Types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use ledger::LedgerError;
use thiserror::Error;

use crate::domain::value_object::status::{CredentialStatus, RequestStatus};

pub type CredentialResult<T> = Result<T, CredentialError>;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Credential not found")]
    CredentialNotFound,

    #[error("Verification request not found")]
    RequestNotFound,

    #[error("Institution not found")]
    InstitutionNotFound,

    #[error("User not found")]
    OwnerNotFound,

    #[error("Credentials can only be issued to students")]
    OwnerNotStudent,

    #[error("Credential cannot move from {from} to {to}")]
    InvalidTransition {
        from: CredentialStatus,
        to: CredentialStatus,
    },

    /// The request was already decided the other way
    #[error("Verification request is already {0}")]
    DecisionConflict(RequestStatus),

    #[error("A verification request is already pending for this credential")]
    DuplicatePendingRequest,

    #[error("Credential has expired")]
    CredentialExpired,

    /// Optimistic version check failed; the caller re-reads and retries
    #[error("Credential was modified concurrently")]
    ConcurrentModification,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("{0}")]
    App(AppError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CredentialError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CredentialError::CredentialNotFound
            | CredentialError::RequestNotFound
            | CredentialError::InstitutionNotFound
            | CredentialError::OwnerNotFound => ErrorKind::NotFound,
            CredentialError::InvalidTransition { .. }
            | CredentialError::DecisionConflict(_)
            | CredentialError::DuplicatePendingRequest
            | CredentialError::CredentialExpired
            | CredentialError::ConcurrentModification => ErrorKind::Conflict,
            CredentialError::Validation(_) | CredentialError::OwnerNotStudent => {
                ErrorKind::BadRequest
            }
            CredentialError::Ledger(e) => e.kind(),
            CredentialError::App(e) => e.kind(),
            CredentialError::Database(_) | CredentialError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    pub fn to_app_error(&self) -> AppError {
        match self {
            CredentialError::App(e) => e.public_copy(),
            CredentialError::Ledger(e) => e.to_app_error(),
            CredentialError::Database(_) | CredentialError::Internal(_) => {
                AppError::internal("Internal server error")
            }
            CredentialError::ConcurrentModification => AppError::conflict(self.to_string())
                .with_action("Reload the credential and try again"),
            CredentialError::CredentialExpired => AppError::conflict(self.to_string())
                .with_action("Upload a renewed credential"),
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    fn log(&self) {
        match self {
            CredentialError::Database(e) => {
                tracing::error!(error = %e, "Credential database error")
            }
            CredentialError::Internal(msg) => {
                tracing::error!(message = %msg, "Credential internal error")
            }
            CredentialError::Ledger(e) => tracing::warn!(error = %e, "Ledger error"),
            CredentialError::InvalidTransition { from, to } => {
                tracing::debug!(%from, %to, "Rejected credential transition")
            }
            _ => tracing::debug!(error = %self, "Credential error"),
        }
    }
}

impl IntoResponse for CredentialError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for CredentialError {
    fn from(err: AppError) -> Self {
        CredentialError::App(err)
    }
}
