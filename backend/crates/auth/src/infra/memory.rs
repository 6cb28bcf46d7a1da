//! In-memory repository implementations
//!
//! Used by tests and by the `memory` storage backend.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use kernel::id::{OrganizationId, UserId};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entity::{auth::Auth, auth_session::AuthSession, user::User};
use crate::domain::repository::{
    AuthRepository, AuthSessionRepository, OrganizationAffiliation, OrganizationDirectory,
    UserRepository,
};
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    auths: HashMap<UserId, Auth>,
    sessions: HashMap<Uuid, AuthSession>,
}

#[derive(Clone, Default)]
pub struct InMemoryAuthRepository {
    state: Arc<RwLock<State>>,
}

impl InMemoryAuthRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserRepository for InMemoryAuthRepository {
    async fn register(&self, user: &User, auth: &Auth) -> AuthResult<()> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(AuthError::EmailTaken);
        }
        state.users.insert(user.user_id, user.clone());
        state.auths.insert(auth.user_id, auth.clone());
        Ok(())
    }

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        Ok(self.state.read().await.users.get(user_id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }

    async fn exists_by_email(&self, email: &Email) -> AuthResult<bool> {
        Ok(self.state.read().await.users.values().any(|u| &u.email == email))
    }

    async fn update(&self, user: &User) -> AuthResult<()> {
        let mut state = self.state.write().await;
        match state.users.get_mut(&user.user_id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(AuthError::UserNotFound),
        }
    }
}

impl AuthRepository for InMemoryAuthRepository {
    async fn find_by_user_id(&self, user_id: &UserId) -> AuthResult<Option<Auth>> {
        Ok(self.state.read().await.auths.get(user_id).cloned())
    }

    async fn update(&self, auth: &Auth) -> AuthResult<()> {
        self.state
            .write()
            .await
            .auths
            .insert(auth.user_id, auth.clone());
        Ok(())
    }
}

impl AuthSessionRepository for InMemoryAuthRepository {
    async fn create(&self, session: &AuthSession) -> AuthResult<()> {
        self.state
            .write()
            .await
            .sessions
            .insert(session.session_id, session.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        session_id: Uuid,
        fingerprint_hash: &[u8],
    ) -> AuthResult<Option<AuthSession>> {
        let now_ms = Utc::now().timestamp_millis();
        let state = self.state.read().await;
        match state.sessions.get(&session_id) {
            Some(s) if s.expires_at_ms > now_ms => {
                if s.client_fingerprint_hash != fingerprint_hash {
                    tracing::warn!(session_id = %session_id, "Auth session fingerprint mismatch");
                    return Err(AuthError::SessionFingerprintMismatch);
                }
                Ok(Some(s.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn update(&self, session: &AuthSession) -> AuthResult<()> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.sessions.get_mut(&session.session_id) {
            existing.expires_at_ms = session.expires_at_ms;
            existing.last_activity_at = session.last_activity_at;
        }
        Ok(())
    }

    async fn delete(&self, session_id: Uuid) -> AuthResult<()> {
        self.state.write().await.sessions.remove(&session_id);
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: &UserId, except: Option<Uuid>) -> AuthResult<u64> {
        let mut state = self.state.write().await;
        let before = state.sessions.len();
        state
            .sessions
            .retain(|id, s| &s.user_id != user_id || Some(*id) == except);
        Ok((before - state.sessions.len()) as u64)
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let now_ms = Utc::now().timestamp_millis();
        let mut state = self.state.write().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, s| s.expires_at_ms >= now_ms);
        let deleted = (before - state.sessions.len()) as u64;
        tracing::info!(sessions_deleted = deleted, "Cleaned up expired auth sessions");
        Ok(deleted)
    }
}

/// Fixed organization table, for tests and for running auth on its own
#[derive(Clone, Default)]
pub struct StaticOrganizationDirectory {
    entries: Arc<RwLock<HashMap<OrganizationId, OrganizationAffiliation>>>,
}

impl StaticOrganizationDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, id: OrganizationId, affiliation: OrganizationAffiliation) {
        self.entries.write().await.insert(id, affiliation);
    }
}

impl OrganizationDirectory for StaticOrganizationDirectory {
    async fn affiliation(
        &self,
        organization_id: OrganizationId,
    ) -> AuthResult<Option<OrganizationAffiliation>> {
        Ok(self.entries.read().await.get(&organization_id).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(user_id: UserId, ttl: Duration) -> AuthSession {
        AuthSession::new(user_id, false, vec![7; 32], None, None, ttl)
    }

    #[tokio::test]
    async fn test_session_fingerprint_mismatch() {
        let repo = InMemoryAuthRepository::new();
        let s = session(UserId::new(), Duration::hours(1));
        repo.create(&s).await.unwrap();

        let found = AuthSessionRepository::find_by_id(&repo, s.session_id, &[7; 32])
            .await
            .unwrap();
        assert!(found.is_some());

        let err = AuthSessionRepository::find_by_id(&repo, s.session_id, &[8; 32])
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::SessionFingerprintMismatch));
    }

    #[tokio::test]
    async fn test_delete_all_and_cleanup() {
        let repo = InMemoryAuthRepository::new();
        let user = UserId::new();
        let keep = session(user, Duration::hours(1));
        repo.create(&keep).await.unwrap();
        repo.create(&session(user, Duration::hours(1))).await.unwrap();
        repo.create(&session(UserId::new(), Duration::milliseconds(-5)))
            .await
            .unwrap();

        assert_eq!(
            repo.delete_all_for_user(&user, Some(keep.session_id))
                .await
                .unwrap(),
            1
        );
        assert_eq!(repo.cleanup_expired().await.unwrap(), 1);
    }
}
