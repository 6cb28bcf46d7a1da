//! Domain Layer

pub mod entity;
pub mod repository;
pub mod service;
pub mod value_object;

pub use entity::{BackoffPolicy, Credential, LedgerAnchor, NewCredential, VerificationRequest};
pub use repository::{
    AccountDirectory, AnchorOutbox, ChangeSet, CredentialDirectory, CredentialFilter,
    CredentialRepository, CredentialStore, CredentialUnitOfWork, InstitutionDirectory,
    RequestFilter, Write,
};
pub use service::analytics::CredentialAnalytics;
pub use service::workflow::{Decision, DecisionOutcome, apply_decision};
pub use value_object::{
    AnchorStatus, CredentialStatus, CredentialType, DocumentHash, OutboxStatus, RequestStatus,
};
