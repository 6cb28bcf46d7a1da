//! In-memory marketplace store

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::{ApplicationId, JobId, MessageId, OrganizationId, UserId};
use kernel::pagination::{Page, PageQuery};
use tokio::sync::RwLock;

use crate::domain::entity::{Application, Job, Message, Organization};
use crate::domain::repository::{
    ApplicationRepository, JobFilter, JobRepository, MessageRepository, OrganizationRepository,
};
use crate::domain::value_object::{ApplicationStatus, OrganizationKind};
use crate::error::{MarketplaceError, MarketplaceResult};

#[derive(Default)]
struct State {
    organizations: HashMap<OrganizationId, Organization>,
    jobs: HashMap<JobId, Job>,
    applications: HashMap<ApplicationId, Application>,
    // Insertion order is send order
    messages: Vec<Message>,
}

#[derive(Clone, Default)]
pub struct InMemoryMarketplaceStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryMarketplaceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrganizationRepository for InMemoryMarketplaceStore {
    async fn create_organization(&self, organization: &Organization) -> MarketplaceResult<()> {
        self.state
            .write()
            .await
            .organizations
            .insert(organization.organization_id, organization.clone());
        Ok(())
    }

    async fn find_organization(
        &self,
        organization_id: OrganizationId,
    ) -> MarketplaceResult<Option<Organization>> {
        Ok(self.state.read().await.organizations.get(&organization_id).cloned())
    }

    async fn list_organizations(
        &self,
        kind: Option<OrganizationKind>,
        page: PageQuery,
    ) -> MarketplaceResult<Page<Organization>> {
        let state = self.state.read().await;
        let mut matching: Vec<Organization> = state
            .organizations
            .values()
            .filter(|o| kind.is_none_or(|k| o.kind == k))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then(a.organization_id.cmp(&b.organization_id))
        });
        Ok(page.slice(&matching))
    }

    async fn update_organization(&self, organization: &Organization) -> MarketplaceResult<()> {
        let mut state = self.state.write().await;
        let stored = state
            .organizations
            .get_mut(&organization.organization_id)
            .ok_or(MarketplaceError::OrganizationNotFound)?;
        *stored = organization.clone();
        Ok(())
    }
}

impl JobRepository for InMemoryMarketplaceStore {
    async fn create_job(&self, job: &Job) -> MarketplaceResult<()> {
        self.state.write().await.jobs.insert(job.job_id, job.clone());
        Ok(())
    }

    async fn find_job(&self, job_id: JobId) -> MarketplaceResult<Option<Job>> {
        Ok(self.state.read().await.jobs.get(&job_id).cloned())
    }

    async fn list_jobs(&self, filter: &JobFilter, page: PageQuery) -> MarketplaceResult<Page<Job>> {
        let state = self.state.read().await;
        let mut matching: Vec<Job> = state
            .jobs
            .values()
            .filter(|j| filter.status.is_none_or(|s| j.status == s))
            .filter(|j| filter.employment_type.is_none_or(|t| j.employment_type == t))
            .filter(|j| filter.organization_id.is_none_or(|o| j.organization_id == o))
            .filter(|j| filter.query.as_deref().is_none_or(|q| j.matches_text(q)))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.job_id.cmp(&a.job_id)));
        Ok(page.slice(&matching))
    }

    async fn update_job(&self, job: &Job) -> MarketplaceResult<()> {
        let mut state = self.state.write().await;
        let stored = state
            .jobs
            .get_mut(&job.job_id)
            .ok_or(MarketplaceError::JobNotFound)?;
        *stored = job.clone();
        Ok(())
    }
}

impl ApplicationRepository for InMemoryMarketplaceStore {
    async fn create_application(&self, application: &Application) -> MarketplaceResult<()> {
        let mut state = self.state.write().await;
        let duplicate = state
            .applications
            .values()
            .any(|a| a.job_id == application.job_id && a.applicant_id == application.applicant_id);
        if duplicate {
            return Err(MarketplaceError::DuplicateApplication);
        }
        state
            .applications
            .insert(application.application_id, application.clone());
        Ok(())
    }

    async fn find_application(
        &self,
        application_id: ApplicationId,
    ) -> MarketplaceResult<Option<Application>> {
        Ok(self.state.read().await.applications.get(&application_id).cloned())
    }

    async fn list_for_job(&self, job_id: JobId, page: PageQuery) -> MarketplaceResult<Page<Application>> {
        let state = self.state.read().await;
        let mut matching: Vec<Application> = state
            .applications
            .values()
            .filter(|a| a.job_id == job_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.application_id.cmp(&b.application_id))
        });
        Ok(page.slice(&matching))
    }

    async fn list_for_applicant(
        &self,
        applicant_id: UserId,
        page: PageQuery,
    ) -> MarketplaceResult<Page<Application>> {
        let state = self.state.read().await;
        let mut matching: Vec<Application> = state
            .applications
            .values()
            .filter(|a| a.applicant_id == applicant_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.application_id.cmp(&a.application_id))
        });
        Ok(page.slice(&matching))
    }

    async fn update_application(
        &self,
        application: &Application,
        expected: ApplicationStatus,
    ) -> MarketplaceResult<()> {
        let mut state = self.state.write().await;
        let stored = state
            .applications
            .get_mut(&application.application_id)
            .ok_or(MarketplaceError::ApplicationNotFound)?;
        if stored.status != expected {
            return Err(MarketplaceError::ConcurrentModification);
        }
        *stored = application.clone();
        Ok(())
    }
}

impl MessageRepository for InMemoryMarketplaceStore {
    async fn create_message(&self, message: &Message) -> MarketplaceResult<()> {
        self.state.write().await.messages.push(message.clone());
        Ok(())
    }

    async fn find_message(&self, message_id: MessageId) -> MarketplaceResult<Option<Message>> {
        Ok(self
            .state
            .read()
            .await
            .messages
            .iter()
            .find(|m| m.message_id == message_id)
            .cloned())
    }

    async fn inbox(
        &self,
        user_id: UserId,
        unread_only: bool,
        page: PageQuery,
    ) -> MarketplaceResult<Page<Message>> {
        let state = self.state.read().await;
        let matching: Vec<Message> = state
            .messages
            .iter()
            .rev()
            .filter(|m| m.recipient_id == user_id)
            .filter(|m| !unread_only || m.read_at.is_none())
            .cloned()
            .collect();
        Ok(page.slice(&matching))
    }

    async fn conversation(
        &self,
        user_id: UserId,
        other_id: UserId,
        page: PageQuery,
    ) -> MarketplaceResult<Page<Message>> {
        let state = self.state.read().await;
        let matching: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| {
                (m.sender_id == user_id && m.recipient_id == other_id)
                    || (m.sender_id == other_id && m.recipient_id == user_id)
            })
            .cloned()
            .collect();
        Ok(page.slice(&matching))
    }

    async fn mark_message_read(&self, message_id: MessageId, at: DateTime<Utc>) -> MarketplaceResult<()> {
        let mut state = self.state.write().await;
        if let Some(message) = state.messages.iter_mut().find(|m| m.message_id == message_id) {
            message.mark_read(at);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::NewApplication;

    #[tokio::test]
    async fn test_one_application_per_job_and_applicant() {
        let store = InMemoryMarketplaceStore::new();
        let (job_id, applicant) = (JobId::new(), UserId::new());
        let first = Application::submit(job_id, applicant, NewApplication::default(), Utc::now()).unwrap();
        let second = Application::submit(job_id, applicant, NewApplication::default(), Utc::now()).unwrap();

        store.create_application(&first).await.unwrap();
        assert!(matches!(
            store.create_application(&second).await,
            Err(MarketplaceError::DuplicateApplication)
        ));

        let other_job = Application::submit(JobId::new(), applicant, NewApplication::default(), Utc::now()).unwrap();
        assert!(store.create_application(&other_job).await.is_ok());
    }

    #[tokio::test]
    async fn test_stale_status_update_is_rejected() {
        let store = InMemoryMarketplaceStore::new();
        let mut application =
            Application::submit(JobId::new(), UserId::new(), NewApplication::default(), Utc::now()).unwrap();
        store.create_application(&application).await.unwrap();

        application.transition(ApplicationStatus::Reviewing, Utc::now()).unwrap();
        store
            .update_application(&application, ApplicationStatus::Submitted)
            .await
            .unwrap();

        // A second writer still believes the application is submitted
        assert!(matches!(
            store
                .update_application(&application, ApplicationStatus::Submitted)
                .await,
            Err(MarketplaceError::ConcurrentModification)
        ));
    }
}
