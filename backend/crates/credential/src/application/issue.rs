//! Issue Credential Use Case

use std::sync::Arc;

use chrono::Utc;
use kernel::actor::{CurrentUser, UserRole};
use kernel::id::UserId;
use ledger::LedgerOperation;
use notification::{EventActor, Notification, NotificationKind};

use crate::application::context::WorkflowContext;
use crate::application::draft::CredentialDraft;
use crate::domain::entity::{Credential, LedgerAnchor};
use crate::domain::repository::{AccountDirectory, ChangeSet, CredentialUnitOfWork};
use crate::error::{CredentialError, CredentialResult};

pub struct IssueCredentialUseCase<R, A>
where
    R: CredentialUnitOfWork + Send + Sync + 'static,
    A: AccountDirectory + Send + Sync + 'static,
{
    repo: Arc<R>,
    accounts: Arc<A>,
    ctx: WorkflowContext,
}

impl<R, A> IssueCredentialUseCase<R, A>
where
    R: CredentialUnitOfWork + Send + Sync + 'static,
    A: AccountDirectory + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, accounts: Arc<A>, ctx: WorkflowContext) -> Self {
        Self {
            repo,
            accounts,
            ctx,
        }
    }

    /// An institution member issues a credential to a student. The issue
    /// anchor is enqueued in the same commit.
    pub async fn execute(
        &self,
        actor: &CurrentUser,
        owner_id: UserId,
        draft: CredentialDraft,
    ) -> CredentialResult<Credential> {
        actor.require_role(&[UserRole::Institution])?;
        let institution_id = actor.require_organization()?;

        match self.accounts.account_role(owner_id).await? {
            Some(UserRole::Student) => {}
            Some(_) => return Err(CredentialError::OwnerNotStudent),
            None => return Err(CredentialError::OwnerNotFound),
        }

        let now = Utc::now();
        let credential = Credential::issue(owner_id, institution_id, draft.into_new_credential()?, now);
        let anchor = LedgerAnchor::new(
            credential.credential_id,
            LedgerOperation::IssueCredential,
            credential.payload_hash(LedgerOperation::IssueCredential),
            actor.user_id.to_string(),
            self.ctx.config.anchor_max_retries,
            now,
        );
        let notice = Notification::new(
            owner_id,
            NotificationKind::CredentialIssued,
            "Credential issued",
            format!("\"{}\" was issued to you", credential.title),
        )
        .with_link(format!("/credentials/{}", credential.credential_id));

        self.repo
            .commit(
                ChangeSet::new()
                    .insert_credential(credential.clone())
                    .enqueue_anchor(anchor)
                    .notify(notice.clone()),
            )
            .await?;

        tracing::info!(
            credential_id = %credential.credential_id,
            owner_id = %owner_id,
            institution_id = %institution_id,
            "Credential issued"
        );
        self.ctx.wakeup.wake();
        self.ctx.publish_credential(
            "credential.issued",
            &credential,
            None,
            EventActor::user(actor.user_id),
        );
        self.ctx.announce(&[notice]);

        Ok(credential)
    }
}
