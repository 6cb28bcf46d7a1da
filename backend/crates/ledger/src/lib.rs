//! Ledger Module
//!
//! A simulated permissioned ledger ("fabric network") that credentials are
//! anchored on. Issue, verify and revoke operations are endorsed against a
//! static k-of-n policy, ordered into numbered blocks and recorded as
//! receipts that can be queried per credential or per transaction id.
//!
//! There is no consensus and no cryptography beyond SHA-256 transaction ids.
//! Writes are idempotent on a caller-chosen key, so retries after a timeout
//! never create a second transaction.

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;


pub use application::config::LedgerConfig;
pub use domain::{
    EndorsementPolicy, LedgerGateway, LedgerOperation, LedgerStatus, LedgerSubmission,
    TransactionReceipt,
};
pub use error::{LedgerError, LedgerResult};
pub use infra::mock::MockFabricNetwork;
pub use presentation::router::ledger_router_generic;
