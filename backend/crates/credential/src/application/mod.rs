//! Application Layer

pub mod analytics;
pub mod anchor_worker;
pub mod config;
pub mod context;
pub mod decide;
pub mod draft;
pub mod expiry;
pub mod issue;
pub mod query;
pub mod request_verification;
pub mod revoke;
pub mod upload;

#[cfg(test)]
pub(crate) mod fixtures;

pub use analytics::AnalyticsUseCase;
pub use anchor_worker::{AnchorRunSummary, LedgerAnchorWorker};
pub use config::CredentialConfig;
pub use context::{AnchorWakeup, WorkflowContext};
pub use decide::{DecideVerificationUseCase, DecisionOutput};
pub use draft::CredentialDraft;
pub use expiry::ExpirySweeper;
pub use issue::IssueCredentialUseCase;
pub use query::{CredentialQueryUseCase, VerificationView};
pub use request_verification::{RequestVerificationOutput, RequestVerificationUseCase};
pub use revoke::RevokeCredentialUseCase;
pub use upload::UploadCredentialUseCase;
