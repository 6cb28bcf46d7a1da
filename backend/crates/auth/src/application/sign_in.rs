//! Sign In Use Case
//!
//! Authenticates a user and creates a session.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::domain::entity::{auth_session::AuthSession, user::User};
use crate::domain::repository::{AuthRepository, AuthSessionRepository, UserRepository};
use crate::domain::value_object::{
    email::Email,
    user_password::{RawPassword, UserPassword},
};
use crate::error::{AuthError, AuthResult};

pub use platform::client::ClientFingerprint;

pub struct SignInInput {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
}

#[cfg_attr(test, derive(Debug))]
pub struct SignInOutput {
    /// Value for the session cookie
    pub session_token: String,
    pub user: User,
    pub expires_at_ms: i64,
}

pub struct SignInUseCase<U, A, S>
where
    U: UserRepository,
    A: AuthRepository,
    S: AuthSessionRepository,
{
    user_repo: Arc<U>,
    auth_repo: Arc<A>,
    session_repo: Arc<S>,
    config: Arc<AuthConfig>,
}

impl<U, A, S> SignInUseCase<U, A, S>
where
    U: UserRepository,
    A: AuthRepository,
    S: AuthSessionRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        auth_repo: Arc<A>,
        session_repo: Arc<S>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            user_repo,
            auth_repo,
            session_repo,
            config,
        }
    }

    pub async fn execute(
        &self,
        input: SignInInput,
        fingerprint: ClientFingerprint,
    ) -> AuthResult<SignInOutput> {
        let raw_password = RawPassword::for_verification(input.password)?;
        let email = Email::new(&input.email).map_err(|_| AuthError::InvalidCredentials)?;

        let Some(mut user) = self.user_repo.find_by_email(&email).await? else {
            // Unknown emails cost as much as wrong passwords
            UserPassword::burn_verification(&raw_password, self.config.pepper());
            return Err(AuthError::InvalidCredentials);
        };

        if !user.can_login() {
            return Err(AuthError::AccountDisabled);
        }

        let mut auth = self
            .auth_repo
            .find_by_user_id(&user.user_id)
            .await?
            .ok_or_else(|| AuthError::Internal("Auth record missing for user".to_string()))?;

        if auth.is_locked() {
            return Err(AuthError::AccountLocked);
        }

        if !auth
            .password_hash
            .verify(&raw_password, self.config.pepper())
        {
            auth.record_failure();
            self.auth_repo.update(&auth).await?;
            tracing::warn!(
                user_id = %user.user_id,
                failed_count = auth.login_failed_count,
                locked = auth.is_locked(),
                "Sign-in failed"
            );
            return Err(AuthError::InvalidCredentials);
        }

        if auth.login_failed_count > 0 || auth.locked_until.is_some() {
            auth.reset_failures();
            self.auth_repo.update(&auth).await?;
        }

        user.record_login();
        self.user_repo.update(&user).await?;

        let ttl = chrono::Duration::from_std(self.config.session_ttl(input.remember_me))
            .map_err(|e| AuthError::Internal(format!("Invalid session TTL: {e}")))?;
        let session = AuthSession::new(
            user.user_id,
            input.remember_me,
            fingerprint.hash_vec(),
            fingerprint.ip_string(),
            fingerprint.user_agent.clone(),
            ttl,
        );
        self.session_repo.create(&session).await?;

        let session_token = self.config.sign_session_id(session.session_id);

        tracing::info!(
            user_id = %user.user_id,
            session_id = %session.session_id,
            remember_me = input.remember_me,
            "User signed in"
        );

        Ok(SignInOutput {
            session_token,
            user,
            expires_at_ms: session.expires_at_ms,
        })
    }
}
