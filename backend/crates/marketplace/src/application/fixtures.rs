//! Shared setup for use case tests

use std::sync::Arc;

use credential::CredentialType;
use kernel::actor::{CurrentUser, UserRole};
use kernel::id::{OrganizationId, UserId};
use notification::{EventBus, InMemoryNotificationRepository, Notifier};

pub(crate) use crate::infra::memory::InMemoryMarketplaceStore;

use crate::application::jobs::JobUseCase;
use crate::domain::entity::{Job, JobDraft, NewOrganization, Organization};
use crate::domain::repository::OrganizationRepository;
use crate::domain::value_object::{EmploymentType, OrganizationKind};

pub(crate) struct MarketEnv {
    pub store: Arc<InMemoryMarketplaceStore>,
    pub notifications: InMemoryNotificationRepository,
    pub bus: EventBus,
    pub company: OrganizationId,
    pub other_company: OrganizationId,
    pub university: OrganizationId,
}

impl MarketEnv {
    pub async fn new() -> Self {
        let store = Arc::new(InMemoryMarketplaceStore::new());
        let company = register(&store, "Kestrel Analytics", OrganizationKind::Company).await;
        let other_company = register(&store, "Moss & Pine", OrganizationKind::Company).await;
        let university = register(&store, "Lakeside University", OrganizationKind::University).await;

        Self {
            store,
            notifications: InMemoryNotificationRepository::new(),
            bus: EventBus::default(),
            company,
            other_company,
            university,
        }
    }

    pub fn notifier(&self) -> Notifier<InMemoryNotificationRepository> {
        Notifier::new(Arc::new(self.notifications.clone()), self.bus.clone())
    }

    pub fn student(&self) -> CurrentUser {
        CurrentUser::new(UserId::new(), UserRole::Student, None)
    }

    pub fn employer(&self) -> CurrentUser {
        CurrentUser::new(UserId::new(), UserRole::Employer, Some(self.company))
    }

    pub fn other_employer(&self) -> CurrentUser {
        CurrentUser::new(UserId::new(), UserRole::Employer, Some(self.other_company))
    }

    pub fn admin(&self) -> CurrentUser {
        CurrentUser::new(UserId::new(), UserRole::Admin, None)
    }

    pub fn unbound(&self, role: UserRole) -> CurrentUser {
        CurrentUser::new(UserId::new(), role, None)
    }

    pub async fn open_job(&self) -> Job {
        JobUseCase::new(self.store.clone(), self.bus.clone())
            .post(&self.employer(), job_draft())
            .await
            .unwrap()
    }

    pub async fn close_job(&self, job: &Job) {
        JobUseCase::new(self.store.clone(), self.bus.clone())
            .close(&self.employer(), job.job_id)
            .await
            .unwrap();
    }
}

async fn register(store: &InMemoryMarketplaceStore, name: &str, kind: OrganizationKind) -> OrganizationId {
    let organization = Organization::new(
        NewOrganization {
            name: name.to_string(),
            kind,
            website: None,
            description: None,
        },
        UserId::new(),
        chrono::Utc::now(),
    )
    .unwrap();
    store.create_organization(&organization).await.unwrap();
    organization.organization_id
}

pub(crate) fn job_draft() -> JobDraft {
    JobDraft {
        title: "Junior Backend Engineer".to_string(),
        description: "Build services for our logistics platform".to_string(),
        location: Some("Fukuoka".to_string()),
        employment_type: EmploymentType::FullTime,
        salary_min: Some(3_800_000),
        salary_max: None,
        required_credentials: vec![CredentialType::Degree],
    }
}
