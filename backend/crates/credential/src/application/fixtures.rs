//! Shared setup for use case tests

use std::sync::Arc;

use chrono::{Duration, Utc};
use kernel::actor::{CurrentUser, UserRole};
use kernel::id::{CredentialId, OrganizationId, UserId};
use notification::{EventBus, EventBusConfig, InMemoryNotificationRepository};

pub(crate) use crate::infra::memory::{InMemoryCredentialStore, StaticCredentialDirectory};

use crate::application::config::CredentialConfig;
use crate::application::context::{AnchorWakeup, WorkflowContext};
use crate::application::decide::DecideVerificationUseCase;
use crate::application::draft::CredentialDraft;
use crate::application::issue::IssueCredentialUseCase;
use crate::application::request_verification::RequestVerificationUseCase;
use crate::application::revoke::RevokeCredentialUseCase;
use crate::application::upload::UploadCredentialUseCase;
use crate::domain::entity::{Credential, VerificationRequest};
use crate::domain::repository::CredentialRepository;
use crate::domain::service::workflow::Decision;
use crate::domain::value_object::CredentialType;

pub(crate) struct TestEnv {
    pub store: Arc<InMemoryCredentialStore>,
    pub directory: Arc<StaticCredentialDirectory>,
    pub notifications: InMemoryNotificationRepository,
    pub ctx: WorkflowContext,
    pub university: OrganizationId,
    pub other_university: OrganizationId,
}

impl TestEnv {
    pub async fn new() -> Self {
        let notifications = InMemoryNotificationRepository::new();
        let store = Arc::new(InMemoryCredentialStore::new(notifications.clone()));
        let university = OrganizationId::new();
        let other_university = OrganizationId::new();
        let directory = Arc::new(StaticCredentialDirectory::new());
        directory.insert(university).await;
        directory.insert(other_university).await;

        let ctx = WorkflowContext::new(
            EventBus::new(&EventBusConfig::default()),
            AnchorWakeup::new(),
            Arc::new(CredentialConfig::default()),
        );

        Self {
            store,
            directory,
            notifications,
            ctx,
            university,
            other_university,
        }
    }

    pub fn student(&self) -> CurrentUser {
        CurrentUser::new(UserId::new(), UserRole::Student, None)
    }

    /// A student with an account, so credentials can be issued to them
    pub async fn registered_student(&self) -> CurrentUser {
        let student = self.student();
        self.directory
            .insert_account(student.user_id, UserRole::Student)
            .await;
        student
    }

    pub fn issue_use_case(
        &self,
    ) -> IssueCredentialUseCase<InMemoryCredentialStore, StaticCredentialDirectory> {
        IssueCredentialUseCase::new(self.store.clone(), self.directory.clone(), self.ctx.clone())
    }

    pub fn employer(&self) -> CurrentUser {
        CurrentUser::new(UserId::new(), UserRole::Employer, Some(OrganizationId::new()))
    }

    pub fn admin(&self) -> CurrentUser {
        CurrentUser::new(UserId::new(), UserRole::Admin, None)
    }

    /// Institution member of `university`
    pub fn registrar(&self) -> CurrentUser {
        CurrentUser::new(UserId::new(), UserRole::Institution, Some(self.university))
    }

    pub fn other_registrar(&self) -> CurrentUser {
        CurrentUser::new(UserId::new(), UserRole::Institution, Some(self.other_university))
    }

    pub async fn uploaded(&self, student: &CurrentUser) -> Credential {
        UploadCredentialUseCase::new(self.store.clone(), self.directory.clone(), self.ctx.clone())
            .execute(student, self.university, draft())
            .await
            .unwrap()
    }

    pub async fn issued(&self, student: &CurrentUser) -> Credential {
        self.directory
            .insert_account(student.user_id, UserRole::Student)
            .await;
        self.issue_use_case()
            .execute(&self.registrar(), student.user_id, draft())
            .await
            .unwrap()
    }

    pub async fn requested(&self, student: &CurrentUser) -> VerificationRequest {
        let credential = self.uploaded(student).await;
        RequestVerificationUseCase::new(self.store.clone(), self.ctx.clone())
            .execute(student, credential.credential_id, None)
            .await
            .unwrap()
            .request
    }

    pub async fn verified(&self, student: &CurrentUser) -> Credential {
        let request = self.requested(student).await;
        DecideVerificationUseCase::new(self.store.clone(), self.ctx.clone())
            .execute(&self.registrar(), request.request_id, Decision::Approve, None)
            .await
            .unwrap()
            .credential
    }

    pub async fn revoke(&self, credential: &Credential) {
        RevokeCredentialUseCase::new(self.store.clone(), self.ctx.clone())
            .execute(&self.registrar(), credential.credential_id, "Withdrawn".to_string())
            .await
            .unwrap();
    }

    pub async fn stored_credential(&self, id: CredentialId) -> Credential {
        self.store.find_credential(id).await.unwrap().unwrap()
    }
}

/// Issued a month ago, valid for ten years
pub(crate) fn draft() -> CredentialDraft {
    let issue_date = (Utc::now() - Duration::days(30)).date_naive();
    CredentialDraft {
        title: "BSc Physics".to_string(),
        credential_type: CredentialType::Degree,
        description: Some("First class honours".to_string()),
        issue_date,
        expiry_date: Some(issue_date + Duration::days(3650)),
        document_hash: Some("ab".repeat(32)),
    }
}
