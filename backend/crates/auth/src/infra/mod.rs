//! Infrastructure Layer
//!
//! Database implementations.

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryAuthRepository, StaticOrganizationDirectory};
pub use postgres::PgAuthRepository;
