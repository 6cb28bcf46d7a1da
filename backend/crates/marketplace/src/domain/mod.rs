//! Domain Layer

pub mod entity;
pub mod repository;
pub mod value_object;

pub use entity::{Application, Job, JobDraft, JobPatch, Message, NewApplication, NewOrganization, Organization};
pub use repository::{
    ApplicationRepository, JobFilter, JobRepository, MarketplaceStore, MessageRepository,
    OrganizationRepository,
};
pub use value_object::{ApplicationStatus, EmploymentType, JobStatus, OrganizationKind};
