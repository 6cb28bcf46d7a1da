//! Check Session Use Case
//!
//! Verifies a session token and resolves the user behind it.

use std::sync::Arc;

use kernel::actor::UserRole;
use kernel::id::{OrganizationId, UserId};

use crate::application::config::AuthConfig;
use crate::domain::entity::{auth_session::AuthSession, user::User};
use crate::domain::repository::{AuthSessionRepository, UserRepository};
use crate::error::{AuthError, AuthResult};

pub struct SessionInfoOutput {
    pub user_id: UserId,
    pub role: UserRole,
    pub organization_id: Option<OrganizationId>,
    pub expires_at_ms: i64,
}

pub struct CheckSessionUseCase<S, U>
where
    S: AuthSessionRepository + Send + Sync + 'static,
    U: UserRepository,
{
    session_repo: Arc<S>,
    user_repo: Arc<U>,
    config: Arc<AuthConfig>,
}

impl<S, U> CheckSessionUseCase<S, U>
where
    S: AuthSessionRepository + Send + Sync + 'static,
    U: UserRepository,
{
    pub fn new(session_repo: Arc<S>, user_repo: Arc<U>, config: Arc<AuthConfig>) -> Self {
        Self {
            session_repo,
            user_repo,
            config,
        }
    }

    pub async fn execute(
        &self,
        session_token: &str,
        fingerprint_hash: &[u8],
    ) -> AuthResult<SessionInfoOutput> {
        let (session, user) = self.resolve(session_token, fingerprint_hash).await?;

        Ok(SessionInfoOutput {
            user_id: user.user_id,
            role: user.user_role,
            organization_id: user.organization_id,
            expires_at_ms: session.expires_at_ms,
        })
    }

    /// Session plus the current state of its user. Role and organization are
    /// read fresh on every request so binding changes apply immediately.
    pub async fn resolve(
        &self,
        session_token: &str,
        fingerprint_hash: &[u8],
    ) -> AuthResult<(AuthSession, User)> {
        let session = self.get_session(session_token, fingerprint_hash).await?;

        let user = self
            .user_repo
            .find_by_id(&session.user_id)
            .await?
            .ok_or(AuthError::SessionInvalid)?;

        if !user.can_login() {
            return Err(AuthError::AccountDisabled);
        }

        Ok((session, user))
    }

    /// Get the session and record activity
    pub async fn get_session(
        &self,
        session_token: &str,
        fingerprint_hash: &[u8],
    ) -> AuthResult<AuthSession> {
        let session_id = self
            .config
            .verify_session_token(session_token)
            .ok_or(AuthError::SessionInvalid)?;

        let mut session = self
            .session_repo
            .find_by_id(session_id, fingerprint_hash)
            .await?
            .ok_or(AuthError::SessionInvalid)?;

        if session.is_expired() {
            self.session_repo.delete(session_id).await?;
            return Err(AuthError::SessionInvalid);
        }

        session.touch();

        let ttl_long = chrono::Duration::from_std(self.config.session_ttl_long)
            .map_err(|e| AuthError::Internal(format!("Invalid session TTL: {e}")))?;
        session.extend_if_needed(ttl_long);

        // Activity bookkeeping is not on the request path
        let snapshot = session.clone();
        let repo = self.session_repo.clone();
        tokio::spawn(async move {
            if let Err(e) = repo.update(&snapshot).await {
                tracing::warn!(error = %e, "Failed to update session activity");
            }
        });

        Ok(session)
    }
}
