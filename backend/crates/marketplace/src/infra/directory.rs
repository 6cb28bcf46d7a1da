//! Organization and account lookups for other modules
//!
//! Auth asks which kind of organization a user binds to; the credential
//! workflow asks whether an id names a university and who a credential may
//! be issued to.

use std::sync::Arc;

use auth::domain::UserRepository;
use auth::{AuthError, AuthResult, OrganizationAffiliation, OrganizationDirectory};
use credential::domain::{AccountDirectory, InstitutionDirectory};
use credential::{CredentialError, CredentialResult};
use kernel::actor::UserRole;
use kernel::id::{OrganizationId, UserId};

use crate::domain::repository::OrganizationRepository;
use crate::domain::value_object::OrganizationKind;

pub struct OrganizationRegistry<R>
where
    R: OrganizationRepository + Send + Sync + 'static,
{
    repo: Arc<R>,
}

impl<R> Clone for OrganizationRegistry<R>
where
    R: OrganizationRepository + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
        }
    }
}

impl<R> OrganizationRegistry<R>
where
    R: OrganizationRepository + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

impl<R> OrganizationDirectory for OrganizationRegistry<R>
where
    R: OrganizationRepository + Send + Sync + 'static,
{
    async fn affiliation(
        &self,
        organization_id: OrganizationId,
    ) -> AuthResult<Option<OrganizationAffiliation>> {
        let organization = self
            .repo
            .find_organization(organization_id)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        Ok(organization.map(|o| o.kind.affiliation()))
    }
}

impl<R> InstitutionDirectory for OrganizationRegistry<R>
where
    R: OrganizationRepository + Send + Sync + 'static,
{
    async fn is_institution(&self, organization_id: OrganizationId) -> CredentialResult<bool> {
        let organization = self
            .repo
            .find_organization(organization_id)
            .await
            .map_err(|e| CredentialError::Internal(e.to_string()))?;
        Ok(organization.is_some_and(|o| o.kind == OrganizationKind::University))
    }
}

/// Organizations plus user accounts, everything the credential routes look up
pub struct CredentialParties<R, U>
where
    R: OrganizationRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    organizations: OrganizationRegistry<R>,
    users: Arc<U>,
}

impl<R, U> CredentialParties<R, U>
where
    R: OrganizationRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(organizations: OrganizationRegistry<R>, users: Arc<U>) -> Self {
        Self {
            organizations,
            users,
        }
    }
}

impl<R, U> InstitutionDirectory for CredentialParties<R, U>
where
    R: OrganizationRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    async fn is_institution(&self, organization_id: OrganizationId) -> CredentialResult<bool> {
        self.organizations.is_institution(organization_id).await
    }
}

impl<R, U> AccountDirectory for CredentialParties<R, U>
where
    R: OrganizationRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    async fn account_role(&self, user_id: UserId) -> CredentialResult<Option<UserRole>> {
        let user = self
            .users
            .find_by_id(&user_id)
            .await
            .map_err(|e| CredentialError::Internal(e.to_string()))?;
        Ok(user.map(|u| u.user_role))
    }
}
