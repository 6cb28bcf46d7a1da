pub mod directory;
pub mod memory;
pub mod postgres;

pub use directory::{CredentialParties, OrganizationRegistry};
pub use memory::InMemoryMarketplaceStore;
pub use postgres::PgMarketplaceStore;
