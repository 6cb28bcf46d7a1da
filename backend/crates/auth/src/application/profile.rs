//! Profile Use Cases
//!
//! Reading the current user and binding them to an organization.

use std::sync::Arc;

use kernel::error::app_error::AppError;
use kernel::id::{OrganizationId, UserId};

use crate::domain::entity::user::User;
use crate::domain::repository::{OrganizationDirectory, UserRepository};
use crate::error::{AuthError, AuthResult};

pub struct GetProfileUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
}

impl<U> GetProfileUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>) -> Self {
        Self { user_repo }
    }

    pub async fn execute(&self, user_id: &UserId) -> AuthResult<User> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

pub struct BindOrganizationUseCase<U, D>
where
    U: UserRepository,
    D: OrganizationDirectory,
{
    user_repo: Arc<U>,
    directory: Arc<D>,
}

impl<U, D> BindOrganizationUseCase<U, D>
where
    U: UserRepository,
    D: OrganizationDirectory,
{
    pub fn new(user_repo: Arc<U>, directory: Arc<D>) -> Self {
        Self {
            user_repo,
            directory,
        }
    }

    pub async fn execute(
        &self,
        user_id: &UserId,
        organization_id: OrganizationId,
    ) -> AuthResult<User> {
        let mut user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !user.can_join_organization() {
            return Err(AppError::forbidden("Students do not belong to an organization").into());
        }

        let affiliation = self
            .directory
            .affiliation(organization_id)
            .await?
            .ok_or(AuthError::OrganizationNotFound)?;

        if !affiliation.admits(user.user_role) {
            return Err(AuthError::OrganizationRoleMismatch(
                affiliation.code().to_string(),
            ));
        }

        if user.organization_id == Some(organization_id) {
            return Ok(user);
        }

        user.set_organization(organization_id);
        self.user_repo.update(&user).await?;

        tracing::info!(
            user_id = %user.user_id,
            organization_id = %organization_id,
            role = %user.user_role,
            "User bound to organization"
        );

        Ok(user)
    }
}
