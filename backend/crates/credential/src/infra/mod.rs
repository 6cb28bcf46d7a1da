//! Infrastructure Layer

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryCredentialStore, StaticCredentialDirectory};
pub use postgres::PgCredentialStore;
