//! Presentation Layer

pub mod dto;
pub mod handlers;
pub mod router;

pub use handlers::LedgerAppState;
pub use router::ledger_router_generic;
