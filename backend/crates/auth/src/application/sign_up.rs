//! Sign Up Use Case
//!
//! Creates a new user account.

use std::sync::Arc;

use kernel::actor::UserRole;
use kernel::error::app_error::AppError;
use kernel::id::UserId;

use crate::application::config::AuthConfig;
use crate::domain::entity::{auth::Auth, user::User};
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{
    display_name::DisplayName,
    email::Email,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{AuthError, AuthResult};

pub struct SignUpInput {
    pub email: String,
    pub password: String,
    pub display_name: String,
    /// `student`, `institution` or `employer`
    pub role: String,
}

#[cfg_attr(test, derive(Debug))]
pub struct SignUpOutput {
    pub user_id: UserId,
    pub email: String,
    pub role: UserRole,
}

pub struct SignUpUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    config: Arc<AuthConfig>,
}

impl<U> SignUpUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>, config: Arc<AuthConfig>) -> Self {
        Self { user_repo, config }
    }

    pub async fn execute(&self, input: SignUpInput) -> AuthResult<SignUpOutput> {
        let role = UserRole::from_code(input.role.trim()).ok_or_else(|| {
            AppError::bad_request(format!("Unknown role '{}'", input.role))
                .with_action("Choose one of: student, institution, employer")
        })?;
        if !role.is_self_assignable() {
            return Err(AuthError::RoleNotSelfAssignable(role.code().to_string()));
        }

        let email = Email::new(&input.email)?;
        let display_name = DisplayName::new(&input.display_name)?;

        if self.user_repo.exists_by_email(&email).await? {
            return Err(AuthError::EmailTaken);
        }

        let raw_password =
            RawPassword::new_for_user(input.password, email.local_part(), display_name.as_str())?;
        let password_hash = UserPassword::from_raw(&raw_password, self.config.pepper())?;

        let user = User::new(email, display_name, role);
        let auth = Auth::new(user.user_id, password_hash);

        self.user_repo.register(&user, &auth).await?;

        tracing::info!(
            user_id = %user.user_id,
            role = %user.user_role,
            "User signed up"
        );

        Ok(SignUpOutput {
            user_id: user.user_id,
            email: user.email.to_string(),
            role,
        })
    }
}
