pub mod application_status;
pub mod job;
pub mod organization_kind;

pub use application_status::ApplicationStatus;
pub use job::{EmploymentType, JobStatus};
pub use organization_kind::OrganizationKind;
