//! Repository Traits

use chrono::{DateTime, Utc};
use kernel::id::{ApplicationId, JobId, MessageId, OrganizationId, UserId};
use kernel::pagination::{Page, PageQuery};

use crate::domain::entity::{Application, Job, Message, Organization};
use crate::domain::value_object::{ApplicationStatus, EmploymentType, JobStatus, OrganizationKind};
use crate::error::MarketplaceResult;

#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub employment_type: Option<EmploymentType>,
    pub organization_id: Option<OrganizationId>,
    /// Case-insensitive substring of title, description or location
    pub query: Option<String>,
}

#[trait_variant::make(OrganizationRepository: Send)]
pub trait LocalOrganizationRepository {
    async fn create_organization(&self, organization: &Organization) -> MarketplaceResult<()>;

    async fn find_organization(
        &self,
        organization_id: OrganizationId,
    ) -> MarketplaceResult<Option<Organization>>;

    /// Name order
    async fn list_organizations(
        &self,
        kind: Option<OrganizationKind>,
        page: PageQuery,
    ) -> MarketplaceResult<Page<Organization>>;

    async fn update_organization(&self, organization: &Organization) -> MarketplaceResult<()>;
}

#[trait_variant::make(JobRepository: Send)]
pub trait LocalJobRepository {
    async fn create_job(&self, job: &Job) -> MarketplaceResult<()>;

    async fn find_job(&self, job_id: JobId) -> MarketplaceResult<Option<Job>>;

    /// Newest first
    async fn list_jobs(&self, filter: &JobFilter, page: PageQuery) -> MarketplaceResult<Page<Job>>;

    async fn update_job(&self, job: &Job) -> MarketplaceResult<()>;
}

#[trait_variant::make(ApplicationRepository: Send)]
pub trait LocalApplicationRepository {
    /// `DuplicateApplication` when the applicant already applied to the job
    async fn create_application(&self, application: &Application) -> MarketplaceResult<()>;

    async fn find_application(
        &self,
        application_id: ApplicationId,
    ) -> MarketplaceResult<Option<Application>>;

    /// Oldest first
    async fn list_for_job(&self, job_id: JobId, page: PageQuery) -> MarketplaceResult<Page<Application>>;

    /// Newest first
    async fn list_for_applicant(
        &self,
        applicant_id: UserId,
        page: PageQuery,
    ) -> MarketplaceResult<Page<Application>>;

    /// Compare-and-set on the status: `ConcurrentModification` when the
    /// stored status is no longer `expected`.
    async fn update_application(
        &self,
        application: &Application,
        expected: ApplicationStatus,
    ) -> MarketplaceResult<()>;
}

#[trait_variant::make(MessageRepository: Send)]
pub trait LocalMessageRepository {
    async fn create_message(&self, message: &Message) -> MarketplaceResult<()>;

    async fn find_message(&self, message_id: MessageId) -> MarketplaceResult<Option<Message>>;

    /// Messages received by `user_id`, newest first
    async fn inbox(
        &self,
        user_id: UserId,
        unread_only: bool,
        page: PageQuery,
    ) -> MarketplaceResult<Page<Message>>;

    /// Both directions between two users, oldest first
    async fn conversation(
        &self,
        user_id: UserId,
        other_id: UserId,
        page: PageQuery,
    ) -> MarketplaceResult<Page<Message>>;

    async fn mark_message_read(&self, message_id: MessageId, at: DateTime<Utc>) -> MarketplaceResult<()>;
}

/// One backing store for all marketplace tables
pub trait MarketplaceStore:
    OrganizationRepository
    + JobRepository
    + ApplicationRepository
    + MessageRepository
    + Send
    + Sync
    + 'static
{
}

impl<T> MarketplaceStore for T where
    T: OrganizationRepository
        + JobRepository
        + ApplicationRepository
        + MessageRepository
        + Send
        + Sync
        + 'static
{
}
