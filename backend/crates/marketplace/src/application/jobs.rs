//! Job posting use cases

use std::sync::Arc;

use chrono::Utc;
use kernel::actor::{CurrentUser, UserRole};
use kernel::error::app_error::AppError;
use kernel::id::JobId;
use kernel::pagination::{Page, PageQuery};
use notification::{Audience, EventActor, EventBus, EventEnvelope};

use crate::domain::entity::{Job, JobDraft, JobPatch};
use crate::domain::repository::{JobFilter, JobRepository, OrganizationRepository};
use crate::domain::value_object::OrganizationKind;
use crate::error::{MarketplaceError, MarketplaceResult};

pub struct JobUseCase<R>
where
    R: OrganizationRepository + JobRepository + Send + Sync + 'static,
{
    repo: Arc<R>,
    bus: EventBus,
}

impl<R> JobUseCase<R>
where
    R: OrganizationRepository + JobRepository + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, bus: EventBus) -> Self {
        Self { repo, bus }
    }

    /// Posted on behalf of the actor's company
    pub async fn post(&self, actor: &CurrentUser, draft: JobDraft) -> MarketplaceResult<Job> {
        actor.require_role(&[UserRole::Employer])?;
        let organization_id = actor.require_organization()?;
        let organization = self
            .repo
            .find_organization(organization_id)
            .await?
            .ok_or(MarketplaceError::OrganizationNotFound)?;
        if organization.kind != OrganizationKind::Company {
            return Err(AppError::forbidden("Only companies can post jobs").into());
        }

        let job = Job::post(organization_id, actor.user_id, draft, Utc::now())?;
        self.repo.create_job(&job).await?;

        tracing::info!(job_id = %job.job_id, %organization_id, "Job posted");
        self.bus.publish(
            job_event("job.posted", &job).with_actor(EventActor::user(actor.user_id)),
            Audience::All,
        );
        Ok(job)
    }

    pub async fn get(&self, job_id: JobId) -> MarketplaceResult<Job> {
        self.repo
            .find_job(job_id)
            .await?
            .ok_or(MarketplaceError::JobNotFound)
    }

    pub async fn list(&self, filter: JobFilter, page: PageQuery) -> MarketplaceResult<Page<Job>> {
        let filter = JobFilter {
            query: filter
                .query
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty()),
            ..filter
        };
        self.repo.list_jobs(&filter, page).await
    }

    pub async fn update(
        &self,
        actor: &CurrentUser,
        job_id: JobId,
        patch: JobPatch,
    ) -> MarketplaceResult<Job> {
        let mut job = self.owned(actor, job_id).await?;
        if !job.is_open() {
            return Err(MarketplaceError::JobClosed);
        }
        job.apply(patch, Utc::now())?;
        self.repo.update_job(&job).await?;

        tracing::info!(%job_id, updated_by = %actor.user_id, "Job updated");
        Ok(job)
    }

    /// Closing twice is a no-op
    pub async fn close(&self, actor: &CurrentUser, job_id: JobId) -> MarketplaceResult<Job> {
        let mut job = self.owned(actor, job_id).await?;
        if job.close(Utc::now()) {
            self.repo.update_job(&job).await?;
            tracing::info!(%job_id, closed_by = %actor.user_id, "Job closed");
            self.bus.publish(
                job_event("job.closed", &job).with_actor(EventActor::user(actor.user_id)),
                Audience::All,
            );
        }
        Ok(job)
    }

    /// A member of the posting company, or an admin
    async fn owned(&self, actor: &CurrentUser, job_id: JobId) -> MarketplaceResult<Job> {
        actor.require_role(&[UserRole::Employer])?;
        let job = self.get(job_id).await?;
        if !actor.is_admin() && !actor.belongs_to(job.organization_id) {
            return Err(AppError::forbidden("Job belongs to another organization").into());
        }
        Ok(job)
    }
}

fn job_event(event_type: &str, job: &Job) -> EventEnvelope {
    EventEnvelope::new(
        event_type,
        serde_json::json!({
            "jobId": job.job_id,
            "organizationId": job.organization_id,
            "title": job.title,
            "status": job.status,
        }),
    )
    .with_entity("job", job.job_id.to_string())
}
