//! Credential and verification-request queries

use std::sync::Arc;

use kernel::actor::{CurrentUser, UserRole};
use kernel::error::app_error::AppError;
use kernel::id::{CredentialId, VerificationRequestId};
use kernel::pagination::{Page, PageQuery};
use ledger::{LedgerGateway, TransactionReceipt};

use crate::domain::entity::{Credential, LedgerAnchor, VerificationRequest};
use crate::domain::repository::{
    AnchorOutbox, CredentialFilter, CredentialRepository, RequestFilter,
};
use crate::error::{CredentialError, CredentialResult};

/// What a third party sees when checking a credential
#[derive(Debug, Clone)]
pub struct VerificationView {
    pub credential: Credential,
    pub anchors: Vec<LedgerAnchor>,
    pub history: Vec<TransactionReceipt>,
    /// `false` when the ledger could not be queried; `history` is then empty
    pub ledger_available: bool,
}

pub struct CredentialQueryUseCase<R, G>
where
    R: CredentialRepository + AnchorOutbox + Send + Sync + 'static,
    G: LedgerGateway + Send + Sync + 'static,
{
    repo: Arc<R>,
    gateway: Arc<G>,
}

impl<R, G> CredentialQueryUseCase<R, G>
where
    R: CredentialRepository + AnchorOutbox + Send + Sync + 'static,
    G: LedgerGateway + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, gateway: Arc<G>) -> Self {
        Self { repo, gateway }
    }

    fn can_see(actor: &CurrentUser, credential: &Credential) -> bool {
        actor.is_admin()
            || credential.owner_id == actor.user_id
            || (actor.role == UserRole::Institution && actor.belongs_to(credential.institution_id))
    }

    /// Owner, issuing institution or admin. Anyone else gets 404.
    pub async fn get(
        &self,
        actor: &CurrentUser,
        credential_id: CredentialId,
    ) -> CredentialResult<Credential> {
        self.repo
            .find_credential(credential_id)
            .await?
            .filter(|c| Self::can_see(actor, c))
            .ok_or(CredentialError::CredentialNotFound)
    }

    /// Students list their own credentials and institution members their
    /// institution's. Admins may filter freely.
    pub async fn list(
        &self,
        actor: &CurrentUser,
        mut filter: CredentialFilter,
        page: PageQuery,
    ) -> CredentialResult<Page<Credential>> {
        match actor.role {
            UserRole::Admin => {}
            UserRole::Student => filter.owner_id = Some(actor.user_id),
            UserRole::Institution => filter.institution_id = Some(actor.require_organization()?),
            UserRole::Employer => {
                return Err(AppError::forbidden(
                    "Employers look up individual credentials through the verification view",
                )
                .into());
            }
        }
        self.repo.list_credentials(&filter, page).await
    }

    /// Any authenticated user may check a credential. A ledger outage
    /// degrades the view instead of failing it.
    pub async fn verification_view(
        &self,
        credential_id: CredentialId,
    ) -> CredentialResult<VerificationView> {
        let credential = self
            .repo
            .find_credential(credential_id)
            .await?
            .ok_or(CredentialError::CredentialNotFound)?;
        let anchors = self.repo.anchors_for(credential_id).await?;

        let (history, ledger_available) = match self.gateway.credential_history(credential_id).await
        {
            Ok(history) => (history, true),
            Err(e) => {
                tracing::warn!(%credential_id, error = %e, "Ledger history unavailable");
                (Vec::new(), false)
            }
        };

        Ok(VerificationView {
            credential,
            anchors,
            history,
            ledger_available,
        })
    }

    pub async fn get_request(
        &self,
        actor: &CurrentUser,
        request_id: VerificationRequestId,
    ) -> CredentialResult<VerificationRequest> {
        self.repo
            .find_request(request_id)
            .await?
            .filter(|r| {
                actor.is_admin()
                    || r.requested_by == actor.user_id
                    || (actor.role == UserRole::Institution && actor.belongs_to(r.institution_id))
            })
            .ok_or(CredentialError::RequestNotFound)
    }

    /// Institution members see their queue, students their own requests
    pub async fn list_requests(
        &self,
        actor: &CurrentUser,
        mut filter: RequestFilter,
        page: PageQuery,
    ) -> CredentialResult<Page<VerificationRequest>> {
        match actor.role {
            UserRole::Admin => {}
            UserRole::Student => filter.requested_by = Some(actor.user_id),
            UserRole::Institution => filter.institution_id = Some(actor.require_organization()?),
            UserRole::Employer => {
                return Err(AppError::forbidden("Employers have no verification queue").into());
            }
        }
        self.repo.list_requests(&filter, page).await
    }
}
