pub mod credential_type;
pub mod document_hash;
pub mod status;

pub use credential_type::CredentialType;
pub use document_hash::DocumentHash;
pub use status::{AnchorStatus, CredentialStatus, OutboxStatus, RequestStatus};
