//! Marketplace Module
//!
//! Organizations, job postings, applications and direct messages.
//!
//! Universities and companies are both organizations; the auth module binds
//! users to them and the credential workflow checks universities through
//! [`OrganizationRegistry`]. Companies post jobs, students apply with
//! references to their credentials, and the hiring organization moves each
//! application through `submitted → reviewing → shortlisted → hired`.
//!
//! State changes are pushed on the notification event bus:
//! `application.submitted` to the hiring organization,
//! `application.status_changed` to both parties and `message.received` to
//! the recipient.

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;


pub use application::{ApplicationUseCase, JobUseCase, MessageUseCase, OrganizationUseCase};
pub use domain::{
    Application, ApplicationStatus, EmploymentType, Job, JobStatus, MarketplaceStore, Message,
    Organization, OrganizationKind,
};
pub use error::{MarketplaceError, MarketplaceResult};
pub use infra::{
    CredentialParties, InMemoryMarketplaceStore, OrganizationRegistry, PgMarketplaceStore,
};
pub use presentation::router::marketplace_router_generic;
