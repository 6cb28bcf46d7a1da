//! Application Layer

pub mod config;
pub mod query;

pub use config::LedgerConfig;
pub use query::LedgerQueryUseCase;
