pub mod credential;
pub mod ledger_anchor;
pub mod verification_request;

pub use credential::{Credential, NewCredential};
pub use ledger_anchor::{BackoffPolicy, LedgerAnchor};
pub use verification_request::VerificationRequest;
