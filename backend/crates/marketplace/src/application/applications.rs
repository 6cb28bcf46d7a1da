//! Job application use cases
//!
//! The application row is the source of truth; the applicant's notification
//! is written after it and a failure there is logged, not returned.

use std::sync::Arc;

use chrono::Utc;
use kernel::actor::{CurrentUser, UserRole};
use kernel::error::app_error::AppError;
use kernel::id::{ApplicationId, JobId};
use kernel::pagination::{Page, PageQuery};
use notification::{
    Audience, EventActor, EventEnvelope, Notification, NotificationKind, NotificationRepository,
    Notifier,
};

use crate::domain::entity::{Application, Job, NewApplication};
use crate::domain::repository::{ApplicationRepository, JobRepository};
use crate::domain::value_object::ApplicationStatus;
use crate::error::{MarketplaceError, MarketplaceResult};

pub struct ApplicationUseCase<R, N>
where
    R: JobRepository + ApplicationRepository + Send + Sync + 'static,
    N: NotificationRepository + Send + Sync + 'static,
{
    repo: Arc<R>,
    notifier: Notifier<N>,
}

impl<R, N> ApplicationUseCase<R, N>
where
    R: JobRepository + ApplicationRepository + Send + Sync + 'static,
    N: NotificationRepository + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, notifier: Notifier<N>) -> Self {
        Self { repo, notifier }
    }

    pub async fn apply(
        &self,
        actor: &CurrentUser,
        job_id: JobId,
        input: NewApplication,
    ) -> MarketplaceResult<Application> {
        actor.require_role(&[UserRole::Student])?;
        let job = self.job(job_id).await?;
        if !job.is_open() {
            return Err(MarketplaceError::JobClosed);
        }

        let application = Application::submit(job_id, actor.user_id, input, Utc::now())?;
        self.repo.create_application(&application).await?;

        tracing::info!(
            application_id = %application.application_id,
            %job_id,
            applicant_id = %actor.user_id,
            "Application submitted"
        );
        self.notifier.bus().publish(
            application_event("application.submitted", &application, &job)
                .with_actor(EventActor::user(actor.user_id)),
            Audience::Organization(job.organization_id),
        );
        Ok(application)
    }

    /// Applications to one job, for members of the hiring organization
    pub async fn list_for_job(
        &self,
        actor: &CurrentUser,
        job_id: JobId,
        page: PageQuery,
    ) -> MarketplaceResult<Page<Application>> {
        let job = self.job(job_id).await?;
        ensure_hiring_member(actor, &job)?;
        self.repo.list_for_job(job_id, page).await
    }

    pub async fn list_mine(
        &self,
        actor: &CurrentUser,
        page: PageQuery,
    ) -> MarketplaceResult<Page<Application>> {
        self.repo.list_for_applicant(actor.user_id, page).await
    }

    /// Visible to the applicant and the hiring organization; 404 otherwise
    pub async fn get(
        &self,
        actor: &CurrentUser,
        application_id: ApplicationId,
    ) -> MarketplaceResult<Application> {
        let (application, job) = self.load(application_id).await?;
        let visible = actor.is_admin()
            || application.applicant_id == actor.user_id
            || actor.belongs_to(job.organization_id);
        if !visible {
            return Err(MarketplaceError::ApplicationNotFound);
        }
        Ok(application)
    }

    /// Hiring organization moves the application along the pipeline
    pub async fn update_status(
        &self,
        actor: &CurrentUser,
        application_id: ApplicationId,
        next: ApplicationStatus,
    ) -> MarketplaceResult<Application> {
        if next == ApplicationStatus::Withdrawn {
            return Err(MarketplaceError::Validation(
                "only the applicant can withdraw an application".to_string(),
            ));
        }
        let (mut application, job) = self.load(application_id).await?;
        ensure_hiring_member(actor, &job)?;

        let Some(previous) = application.transition(next, Utc::now())? else {
            return Ok(application);
        };
        self.repo.update_application(&application, previous).await?;

        tracing::info!(
            %application_id,
            from = %previous,
            to = %next,
            changed_by = %actor.user_id,
            "Application status changed"
        );
        self.announce_change(actor, &application, &job, previous).await;
        Ok(application)
    }

    /// Applicant only; others see 404
    pub async fn withdraw(
        &self,
        actor: &CurrentUser,
        application_id: ApplicationId,
    ) -> MarketplaceResult<Application> {
        let (mut application, job) = self.load(application_id).await?;
        if application.applicant_id != actor.user_id {
            return Err(MarketplaceError::ApplicationNotFound);
        }

        let Some(previous) = application.transition(ApplicationStatus::Withdrawn, Utc::now())?
        else {
            return Ok(application);
        };
        self.repo.update_application(&application, previous).await?;

        tracing::info!(%application_id, "Application withdrawn");
        self.notifier.bus().publish(
            status_event(&application, &job, previous).with_actor(EventActor::user(actor.user_id)),
            Audience::Parties(application.applicant_id, job.organization_id),
        );
        Ok(application)
    }

    async fn announce_change(
        &self,
        actor: &CurrentUser,
        application: &Application,
        job: &Job,
        previous: ApplicationStatus,
    ) {
        self.notifier.bus().publish(
            status_event(application, job, previous).with_actor(EventActor::user(actor.user_id)),
            Audience::Parties(application.applicant_id, job.organization_id),
        );

        let notice = Notification::new(
            application.applicant_id,
            NotificationKind::ApplicationStatusChanged,
            "Application updated",
            format!(
                "Your application for \"{}\" is now {}",
                job.title, application.status
            ),
        )
        .with_link(format!("/applications/{}", application.application_id));
        if let Err(e) = self.notifier.notify(notice).await {
            tracing::warn!(
                application_id = %application.application_id,
                error = %e,
                "Failed to notify applicant"
            );
        }
    }

    async fn job(&self, job_id: JobId) -> MarketplaceResult<Job> {
        self.repo
            .find_job(job_id)
            .await?
            .ok_or(MarketplaceError::JobNotFound)
    }

    async fn load(&self, application_id: ApplicationId) -> MarketplaceResult<(Application, Job)> {
        let application = self
            .repo
            .find_application(application_id)
            .await?
            .ok_or(MarketplaceError::ApplicationNotFound)?;
        let job = self
            .repo
            .find_job(application.job_id)
            .await?
            .ok_or_else(|| MarketplaceError::Internal(format!("Application {application_id} has no job")))?;
        Ok((application, job))
    }
}

fn ensure_hiring_member(actor: &CurrentUser, job: &Job) -> MarketplaceResult<()> {
    actor.require_role(&[UserRole::Employer])?;
    if !actor.is_admin() && !actor.belongs_to(job.organization_id) {
        return Err(AppError::forbidden("Job belongs to another organization").into());
    }
    Ok(())
}

fn application_event(event_type: &str, application: &Application, job: &Job) -> EventEnvelope {
    EventEnvelope::new(
        event_type,
        serde_json::json!({
            "applicationId": application.application_id,
            "jobId": job.job_id,
            "jobTitle": job.title,
            "organizationId": job.organization_id,
            "applicantId": application.applicant_id,
            "status": application.status,
        }),
    )
    .with_entity("application", application.application_id.to_string())
}

fn status_event(application: &Application, job: &Job, previous: ApplicationStatus) -> EventEnvelope {
    let mut event = application_event("application.status_changed", application, job);
    event.payload["previousStatus"] = serde_json::json!(previous);
    event
}
