//! Revoke Credential Use Case

use std::sync::Arc;

use chrono::Utc;
use kernel::actor::{CurrentUser, UserRole};
use kernel::error::app_error::AppError;
use kernel::id::CredentialId;
use ledger::LedgerOperation;
use notification::{EventActor, Notification, NotificationKind};

use crate::application::context::WorkflowContext;
use crate::domain::entity::{Credential, LedgerAnchor};
use crate::domain::repository::{ChangeSet, CredentialRepository, CredentialUnitOfWork};
use crate::domain::service::workflow::REVOKED_REJECTION_REASON;
use crate::error::{CredentialError, CredentialResult};

const MAX_ATTEMPTS: usize = 3;
const REASON_MAX_LENGTH: usize = 500;

pub struct RevokeCredentialUseCase<R>
where
    R: CredentialRepository + CredentialUnitOfWork + Send + Sync + 'static,
{
    repo: Arc<R>,
    ctx: WorkflowContext,
}

impl<R> RevokeCredentialUseCase<R>
where
    R: CredentialRepository + CredentialUnitOfWork + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, ctx: WorkflowContext) -> Self {
        Self { repo, ctx }
    }

    /// Revoke a credential on behalf of its institution. An open
    /// verification request is closed as rejected in the same commit.
    pub async fn execute(
        &self,
        actor: &CurrentUser,
        credential_id: CredentialId,
        reason: String,
    ) -> CredentialResult<Credential> {
        actor.require_role(&[UserRole::Institution])?;

        let reason = reason.trim().to_string();
        if reason.is_empty() || reason.chars().count() > REASON_MAX_LENGTH {
            return Err(CredentialError::Validation(format!(
                "reason must be 1-{REASON_MAX_LENGTH} characters"
            )));
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_revoke(actor, credential_id, &reason).await {
                Err(CredentialError::ConcurrentModification) if attempt < MAX_ATTEMPTS => {
                    tracing::debug!(%credential_id, attempt, "Revocation raced, retrying");
                }
                other => return other,
            }
        }
    }

    async fn try_revoke(
        &self,
        actor: &CurrentUser,
        credential_id: CredentialId,
        reason: &str,
    ) -> CredentialResult<Credential> {
        let mut credential = self
            .repo
            .find_credential(credential_id)
            .await?
            .ok_or(CredentialError::CredentialNotFound)?;

        if !actor.is_admin() && !actor.belongs_to(credential.institution_id) {
            return Err(AppError::forbidden(
                "Only the issuing institution can revoke this credential",
            )
            .into());
        }

        let now = Utc::now();
        credential.revoke(reason, now)?;

        let pending = self.repo.find_pending_request(credential_id).await?;
        let notice = Notification::new(
            credential.owner_id,
            NotificationKind::CredentialRevoked,
            "Credential revoked",
            format!("\"{}\" was revoked: {}", credential.title, reason),
        )
        .with_link(format!("/credentials/{}", credential_id));

        let mut changes = ChangeSet::new()
            .update_credential(credential.clone())
            .enqueue_anchor(LedgerAnchor::new(
                credential_id,
                LedgerOperation::RevokeCredential,
                credential.payload_hash(LedgerOperation::RevokeCredential),
                actor.user_id.to_string(),
                self.ctx.config.anchor_max_retries,
                now,
            ))
            .notify(notice.clone());
        let closed = match pending {
            Some(mut request) => {
                request.reject(Some(actor.user_id), REVOKED_REJECTION_REASON, now)?;
                changes = changes.update_request(request.clone());
                Some(request)
            }
            None => None,
        };

        self.repo.commit(changes).await?;

        tracing::info!(
            credential_id = %credential_id,
            revoked_by = %actor.user_id,
            closed_request = closed.is_some(),
            "Credential revoked"
        );
        self.ctx.wakeup.wake();
        self.ctx.publish_credential(
            "credential.revoked",
            &credential,
            closed.as_ref(),
            EventActor::user(actor.user_id),
        );
        self.ctx.announce(&[notice]);

        Ok(credential)
    }
}
