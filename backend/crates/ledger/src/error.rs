//! Ledger Error Types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Endorsements did not satisfy the channel policy
    #[error("Endorsement policy not satisfied: {0}")]
    EndorsementPolicyFailure(String),

    /// Network or peers unreachable; safe to retry
    #[error("Ledger network unavailable: {0}")]
    Unavailable(String),

    #[error("Transaction not found")]
    TransactionNotFound,

    #[error("Invalid transaction id")]
    InvalidTransactionId,

    #[error("{0}")]
    App(AppError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Worth another attempt later
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Unavailable(_))
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::EndorsementPolicyFailure(_) => ErrorKind::BadGateway,
            LedgerError::Unavailable(_) => ErrorKind::ServiceUnavailable,
            LedgerError::TransactionNotFound => ErrorKind::NotFound,
            LedgerError::InvalidTransactionId => ErrorKind::BadRequest,
            LedgerError::App(e) => e.kind(),
            LedgerError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    pub fn to_app_error(&self) -> AppError {
        match self {
            LedgerError::App(e) => e.public_copy(),
            LedgerError::Internal(_) => AppError::internal("Internal server error"),
            LedgerError::InvalidTransactionId => AppError::bad_request(self.to_string())
                .with_action("Transaction ids are 64 lowercase hex characters"),
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    fn log(&self) {
        match self {
            LedgerError::Internal(msg) => tracing::error!(message = %msg, "Ledger internal error"),
            LedgerError::EndorsementPolicyFailure(reason) => {
                tracing::warn!(reason = %reason, "Endorsement policy failure")
            }
            LedgerError::Unavailable(reason) => {
                tracing::warn!(reason = %reason, "Ledger unavailable")
            }
            _ => tracing::debug!(error = %self, "Ledger error"),
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for LedgerError {
    fn from(err: AppError) -> Self {
        LedgerError::App(err)
    }
}
