pub mod application;
pub mod job;
pub mod message;
pub mod organization;

pub use application::{Application, NewApplication};
pub use job::{Job, JobDraft, JobPatch};
pub use message::Message;
pub use organization::{NewOrganization, Organization};
