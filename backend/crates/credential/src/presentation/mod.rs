//! Presentation Layer

pub mod dto;
pub mod handlers;
pub mod router;

pub use handlers::CredentialAppState;
pub use router::credential_router_generic;
