//! Infrastructure Layer

pub mod memory;
pub mod postgres;

pub use memory::InMemoryNotificationRepository;
pub use postgres::PgNotificationRepository;
