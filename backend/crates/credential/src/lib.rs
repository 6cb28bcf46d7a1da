//! Credential Module
//!
//! The credential verification workflow: students upload credentials or
//! institutions issue them, owners request verification, institutions
//! approve or reject, and every state change that matters is anchored on the
//! ledger.
//!
//! ## Consistency
//!
//! A credential change, the verification request it settles, the ledger
//! outbox row and the owner's notification are one [`ChangeSet`], committed
//! atomically with optimistic version checks. Events go out on the bus only
//! after the commit.
//!
//! ## Anchoring
//!
//! [`LedgerAnchorWorker`] drains the outbox with leases, idempotency keys and
//! exponential backoff. Rows survive restarts; a row that keeps failing is
//! marked `failed` on both the outbox and the credential.

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;


pub use application::{
    AnchorWakeup, CredentialConfig, CredentialDraft, ExpirySweeper, LedgerAnchorWorker,
    WorkflowContext,
};
pub use domain::{
    AccountDirectory, ChangeSet, Credential, CredentialDirectory, CredentialStatus, CredentialStore,
    CredentialType, InstitutionDirectory, LedgerAnchor, RequestStatus, VerificationRequest,
};
pub use error::{CredentialError, CredentialResult};
pub use infra::{InMemoryCredentialStore, PgCredentialStore, StaticCredentialDirectory};
pub use presentation::router::credential_router_generic;
