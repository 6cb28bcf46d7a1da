//! Expiry sweeper

use std::sync::Arc;

use chrono::{DateTime, Utc};
use notification::{EventActor, Notification, NotificationKind};

use crate::application::context::WorkflowContext;
use crate::domain::entity::Credential;
use crate::domain::repository::{ChangeSet, CredentialRepository, CredentialUnitOfWork};
use crate::domain::service::workflow::EXPIRED_REJECTION_REASON;
use crate::error::{CredentialError, CredentialResult};

pub struct ExpirySweeper<R>
where
    R: CredentialRepository + CredentialUnitOfWork + Send + Sync + 'static,
{
    repo: Arc<R>,
    ctx: WorkflowContext,
}

impl<R> ExpirySweeper<R>
where
    R: CredentialRepository + CredentialUnitOfWork + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, ctx: WorkflowContext) -> Self {
        Self { repo, ctx }
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.ctx.config.expiry_sweep_interval);
        loop {
            ticker.tick().await;
            match self.sweep_at(Utc::now()).await {
                Ok(0) => {}
                Ok(expired) => tracing::info!(expired, "Expiry sweep completed"),
                Err(e) => tracing::error!(error = %e, "Expiry sweep failed"),
            }
        }
    }

    /// Expire every non-terminal credential whose expiry date is before
    /// `now`. Returns how many were expired.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> CredentialResult<usize> {
        let today = now.date_naive();
        let batch = self.ctx.config.expiry_batch_size;
        let mut expired = 0;

        loop {
            let due = self.repo.find_past_expiry(today, batch).await?;
            if due.is_empty() {
                break;
            }
            let mut progressed = false;
            for credential in due {
                match self.expire(credential, now).await {
                    Ok(()) => {
                        expired += 1;
                        progressed = true;
                    }
                    // Changed underneath us; the next sweep sees the new state
                    Err(CredentialError::ConcurrentModification) => {}
                    Err(e) => return Err(e),
                }
            }
            if !progressed {
                break;
            }
        }
        Ok(expired)
    }

    async fn expire(&self, mut credential: Credential, now: DateTime<Utc>) -> CredentialResult<()> {
        credential.expire(now)?;
        let pending = self.repo.find_pending_request(credential.credential_id).await?;

        let notice = Notification::new(
            credential.owner_id,
            NotificationKind::CredentialExpired,
            "Credential expired",
            format!("\"{}\" has passed its expiry date", credential.title),
        )
        .with_link(format!("/credentials/{}", credential.credential_id));

        let mut changes = ChangeSet::new()
            .update_credential(credential.clone())
            .notify(notice.clone());
        let closed = match pending {
            Some(mut request) => {
                request.reject(None, EXPIRED_REJECTION_REASON, now)?;
                changes = changes.update_request(request.clone());
                Some(request)
            }
            None => None,
        };
        self.repo.commit(changes).await?;

        tracing::info!(
            credential_id = %credential.credential_id,
            closed_request = closed.is_some(),
            "Credential expired"
        );
        self.ctx.publish_credential(
            "credential.expired",
            &credential,
            closed.as_ref(),
            EventActor::system(),
        );
        self.ctx.announce(&[notice]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fixtures::*;
    use crate::domain::value_object::{CredentialStatus, RequestStatus};
    use chrono::Duration;

    #[tokio::test]
    async fn test_sweep_expires_and_closes_requests() {
        let env = TestEnv::new().await;
        let student = env.student();
        let request = env.requested(&student).await;
        let verified = env.verified(&student).await;
        let revoked = env.uploaded(&student).await;
        env.revoke(&revoked).await;

        // Every fixture credential expires ten years after issue
        let later = Utc::now() + Duration::days(365 * 20);
        let expired = ExpirySweeper::new(env.store.clone(), env.ctx.clone())
            .sweep_at(later)
            .await
            .unwrap();
        assert_eq!(expired, 2);

        assert_eq!(
            env.stored_credential(request.credential_id).await.status,
            CredentialStatus::Expired
        );
        assert_eq!(
            env.stored_credential(verified.credential_id).await.status,
            CredentialStatus::Expired
        );
        assert_eq!(
            env.stored_credential(revoked.credential_id).await.status,
            CredentialStatus::Revoked
        );

        let closed = env
            .store
            .find_request(request.request_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(closed.status, RequestStatus::Rejected);
        assert_eq!(closed.decided_by, None);

        let notices = env.notifications.all_for(student.user_id).await;
        assert_eq!(
            notices
                .iter()
                .filter(|n| n.kind == NotificationKind::CredentialExpired)
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_sweep_ignores_unexpired() {
        let env = TestEnv::new().await;
        env.uploaded(&env.student()).await;

        let expired = ExpirySweeper::new(env.store.clone(), env.ctx.clone())
            .sweep_at(Utc::now())
            .await
            .unwrap();
        assert_eq!(expired, 0);
    }
}
