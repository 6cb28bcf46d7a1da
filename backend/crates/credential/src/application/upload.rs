//! Upload Credential Use Case

use std::sync::Arc;

use chrono::Utc;
use kernel::actor::{CurrentUser, UserRole};
use kernel::id::OrganizationId;
use notification::EventActor;

use crate::application::context::WorkflowContext;
use crate::application::draft::CredentialDraft;
use crate::domain::entity::Credential;
use crate::domain::repository::{ChangeSet, CredentialUnitOfWork, InstitutionDirectory};
use crate::error::{CredentialError, CredentialResult};

pub struct UploadCredentialUseCase<R, D>
where
    R: CredentialUnitOfWork + Send + Sync + 'static,
    D: InstitutionDirectory + Send + Sync + 'static,
{
    repo: Arc<R>,
    directory: Arc<D>,
    ctx: WorkflowContext,
}

impl<R, D> UploadCredentialUseCase<R, D>
where
    R: CredentialUnitOfWork + Send + Sync + 'static,
    D: InstitutionDirectory + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, directory: Arc<D>, ctx: WorkflowContext) -> Self {
        Self {
            repo,
            directory,
            ctx,
        }
    }

    /// Store a student's own credential as `pending`. Nothing is anchored
    /// until the institution verifies it.
    pub async fn execute(
        &self,
        actor: &CurrentUser,
        institution_id: OrganizationId,
        draft: CredentialDraft,
    ) -> CredentialResult<Credential> {
        actor.require_role(&[UserRole::Student])?;

        if !self.directory.is_institution(institution_id).await? {
            return Err(CredentialError::InstitutionNotFound);
        }

        let credential = Credential::upload(
            actor.user_id,
            institution_id,
            draft.into_new_credential()?,
            Utc::now(),
        );

        self.repo
            .commit(ChangeSet::new().insert_credential(credential.clone()))
            .await?;

        tracing::info!(
            credential_id = %credential.credential_id,
            owner_id = %credential.owner_id,
            institution_id = %institution_id,
            "Credential uploaded"
        );
        self.ctx.publish_credential(
            "credential.uploaded",
            &credential,
            None,
            EventActor::user(actor.user_id),
        );

        Ok(credential)
    }
}
