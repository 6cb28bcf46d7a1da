//! Request Verification Use Case

use std::sync::Arc;

use chrono::Utc;
use kernel::actor::CurrentUser;
use kernel::id::CredentialId;
use notification::{Audience, EventActor};

use crate::application::context::{WorkflowContext, credential_event};
use crate::domain::entity::VerificationRequest;
use crate::domain::repository::{ChangeSet, CredentialRepository, CredentialUnitOfWork};
use crate::domain::value_object::CredentialStatus;
use crate::error::{CredentialError, CredentialResult};

#[derive(Debug, Clone)]
pub struct RequestVerificationOutput {
    pub request: VerificationRequest,
    /// `false` when an open request already existed and was returned as is
    pub created: bool,
}

pub struct RequestVerificationUseCase<R>
where
    R: CredentialRepository + CredentialUnitOfWork + Send + Sync + 'static,
{
    repo: Arc<R>,
    ctx: WorkflowContext,
}

impl<R> RequestVerificationUseCase<R>
where
    R: CredentialRepository + CredentialUnitOfWork + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, ctx: WorkflowContext) -> Self {
        Self { repo, ctx }
    }

    pub async fn execute(
        &self,
        actor: &CurrentUser,
        credential_id: CredentialId,
        message: Option<String>,
    ) -> CredentialResult<RequestVerificationOutput> {
        let credential = self
            .repo
            .find_credential(credential_id)
            .await?
            .filter(|c| c.owner_id == actor.user_id)
            .ok_or(CredentialError::CredentialNotFound)?;

        if let Some(existing) = self.repo.find_pending_request(credential_id).await? {
            return Ok(RequestVerificationOutput {
                request: existing,
                created: false,
            });
        }

        let now = Utc::now();
        if !credential.status.accepts_verification() {
            return Err(CredentialError::InvalidTransition {
                from: credential.status,
                to: CredentialStatus::Verified,
            });
        }
        if credential.is_past_expiry(now.date_naive()) {
            return Err(CredentialError::CredentialExpired);
        }

        let request = VerificationRequest::new(
            credential_id,
            actor.user_id,
            credential.institution_id,
            message,
            now,
        )?;

        // Version-checked write, so a revoke or expiry committed since the
        // read fails this commit
        let mut touched = credential.clone();
        touched.updated_at = now;
        let changes = ChangeSet::new()
            .update_credential(touched)
            .insert_request(request.clone());

        match self.repo.commit(changes).await {
            Ok(()) => {}
            Err(CredentialError::DuplicatePendingRequest | CredentialError::ConcurrentModification) => {
                return self.after_lost_race(credential_id).await;
            }
            Err(e) => return Err(e),
        }

        tracing::info!(
            request_id = %request.request_id,
            credential_id = %credential_id,
            institution_id = %request.institution_id,
            "Verification requested"
        );
        // The institution's queue, not the owner's view
        self.ctx.bus.publish(
            credential_event("verification.requested", &credential, Some(&request))
                .with_actor(EventActor::user(actor.user_id)),
            Audience::Organization(credential.institution_id),
        );

        Ok(RequestVerificationOutput {
            request,
            created: true,
        })
    }

    /// Someone else changed the credential between our read and commit: a
    /// concurrent request is returned as is, a state change is reported
    async fn after_lost_race(
        &self,
        credential_id: CredentialId,
    ) -> CredentialResult<RequestVerificationOutput> {
        if let Some(existing) = self.repo.find_pending_request(credential_id).await? {
            return Ok(RequestVerificationOutput {
                request: existing,
                created: false,
            });
        }

        let credential = self
            .repo
            .find_credential(credential_id)
            .await?
            .ok_or(CredentialError::CredentialNotFound)?;
        if !credential.status.accepts_verification() {
            return Err(CredentialError::InvalidTransition {
                from: credential.status,
                to: CredentialStatus::Verified,
            });
        }
        Err(CredentialError::ConcurrentModification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fixtures::*;
    use crate::domain::value_object::RequestStatus;

    #[tokio::test]
    async fn test_request_is_idempotent_while_pending() {
        let env = TestEnv::new().await;
        let student = env.student();
        let credential = env.uploaded(&student).await;
        let use_case = RequestVerificationUseCase::new(env.store.clone(), env.ctx.clone());

        let first = use_case
            .execute(&student, credential.credential_id, Some("Please verify".into()))
            .await
            .unwrap();
        assert!(first.created);
        assert_eq!(first.request.status, RequestStatus::Pending);
        assert_eq!(first.request.institution_id, env.university);

        let second = use_case
            .execute(&student, credential.credential_id, None)
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.request.request_id, first.request.request_id);
        assert_eq!(env.store.requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_only_owner_may_request() {
        let env = TestEnv::new().await;
        let credential = env.uploaded(&env.student()).await;

        let result = RequestVerificationUseCase::new(env.store.clone(), env.ctx.clone())
            .execute(&env.student(), credential.credential_id, None)
            .await;
        assert!(matches!(result, Err(CredentialError::CredentialNotFound)));
    }

    #[tokio::test]
    async fn test_request_on_revoked_credential_conflicts() {
        let env = TestEnv::new().await;
        let student = env.student();
        let credential = env.uploaded(&student).await;
        env.revoke(&credential).await;

        let result = RequestVerificationUseCase::new(env.store.clone(), env.ctx.clone())
            .execute(&student, credential.credential_id, None)
            .await;
        assert!(matches!(
            result,
            Err(CredentialError::InvalidTransition {
                from: CredentialStatus::Revoked,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_request_keeps_credential_version_in_step() {
        let env = TestEnv::new().await;
        let student = env.student();
        let credential = env.uploaded(&student).await;

        RequestVerificationUseCase::new(env.store.clone(), env.ctx.clone())
            .execute(&student, credential.credential_id, None)
            .await
            .unwrap();

        // The request commit wrote the credential too, so a writer holding
        // the earlier read loses
        let stored = env.stored_credential(credential.credential_id).await;
        assert_eq!(stored.version, credential.version + 1);
        let mut stale = credential.clone();
        stale.revoke("Withdrawn", Utc::now()).unwrap();
        assert!(matches!(
            env.store.commit(ChangeSet::new().update_credential(stale)).await,
            Err(CredentialError::ConcurrentModification)
        ));
        assert_eq!(env.store.requests().await[0].status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn test_lost_race_against_revoke_reports_revoked() {
        let env = TestEnv::new().await;
        let student = env.student();
        let credential = env.uploaded(&student).await;
        env.revoke(&credential).await;

        let result = RequestVerificationUseCase::new(env.store.clone(), env.ctx.clone())
            .after_lost_race(credential.credential_id)
            .await;
        assert!(matches!(
            result,
            Err(CredentialError::InvalidTransition {
                from: CredentialStatus::Revoked,
                ..
            })
        ));
        assert!(env.store.requests().await.is_empty());
    }
}
