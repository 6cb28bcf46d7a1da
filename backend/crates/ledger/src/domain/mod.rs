//! Domain Layer
//!
//! Transactions, endorsement policy and the gateway trait the rest of the
//! system anchors credentials through.

pub mod gateway;
pub mod policy;
pub mod transaction;

pub use gateway::{LedgerGateway, LedgerStatus, PeerStatus};
pub use policy::EndorsementPolicy;
pub use transaction::{LedgerOperation, LedgerSubmission, TransactionReceipt};
