//! Organization use cases

use std::sync::Arc;

use chrono::Utc;
use kernel::actor::{CurrentUser, UserRole};
use kernel::error::app_error::AppError;
use kernel::id::OrganizationId;
use kernel::pagination::{Page, PageQuery};

use crate::domain::entity::{NewOrganization, Organization};
use crate::domain::repository::OrganizationRepository;
use crate::domain::value_object::OrganizationKind;
use crate::error::{MarketplaceError, MarketplaceResult};

pub struct OrganizationUseCase<R>
where
    R: OrganizationRepository + Send + Sync + 'static,
{
    repo: Arc<R>,
}

impl<R> OrganizationUseCase<R>
where
    R: OrganizationRepository + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Institutions register universities, employers register companies.
    /// The creator still has to bind to it through the auth module.
    pub async fn create(
        &self,
        actor: &CurrentUser,
        input: NewOrganization,
    ) -> MarketplaceResult<Organization> {
        actor.require_role(&[UserRole::Institution, UserRole::Employer])?;
        if !input.kind.registrable_by(actor.role) {
            return Err(AppError::forbidden(format!(
                "Role '{}' cannot register a {}",
                actor.role.code(),
                input.kind
            ))
            .into());
        }

        let organization = Organization::new(input, actor.user_id, Utc::now())?;
        self.repo.create_organization(&organization).await?;

        tracing::info!(
            organization_id = %organization.organization_id,
            kind = %organization.kind,
            created_by = %actor.user_id,
            "Organization created"
        );
        Ok(organization)
    }

    pub async fn get(&self, organization_id: OrganizationId) -> MarketplaceResult<Organization> {
        self.repo
            .find_organization(organization_id)
            .await?
            .ok_or(MarketplaceError::OrganizationNotFound)
    }

    pub async fn list(
        &self,
        kind: Option<OrganizationKind>,
        page: PageQuery,
    ) -> MarketplaceResult<Page<Organization>> {
        self.repo.list_organizations(kind, page).await
    }

    /// Admin only; verifying twice is a no-op
    pub async fn verify(
        &self,
        actor: &CurrentUser,
        organization_id: OrganizationId,
    ) -> MarketplaceResult<Organization> {
        actor.require_role(&[])?;
        let mut organization = self.get(organization_id).await?;
        if organization.verify(Utc::now()) {
            self.repo.update_organization(&organization).await?;
            tracing::info!(%organization_id, verified_by = %actor.user_id, "Organization verified");
        }
        Ok(organization)
    }
}
