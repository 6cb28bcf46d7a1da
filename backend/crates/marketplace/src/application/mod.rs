//! Application Layer

pub mod applications;
pub mod jobs;
pub mod messages;
pub mod organizations;

#[cfg(test)]
pub(crate) mod fixtures;

pub use applications::ApplicationUseCase;
pub use jobs::JobUseCase;
pub use messages::MessageUseCase;
pub use organizations::OrganizationUseCase;
