//! Auth Session Entity
//!
//! Server-side session referenced by the signed cookie token.

use chrono::{DateTime, Duration, Utc};
use kernel::id::UserId;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub session_id: Uuid,
    pub user_id: UserId,
    /// Unix ms
    pub expires_at_ms: i64,
    pub remember_me: bool,
    /// SHA-256 of the User-Agent the session was created with
    pub client_fingerprint_hash: Vec<u8>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn new(
        user_id: UserId,
        remember_me: bool,
        fingerprint_hash: Vec<u8>,
        client_ip: Option<String>,
        user_agent: Option<String>,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            user_id,
            expires_at_ms: (now + ttl).timestamp_millis(),
            remember_me,
            client_fingerprint_hash: fingerprint_hash,
            client_ip,
            user_agent,
            created_at: now,
            last_activity_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp_millis() > self.expires_at_ms
    }

    pub fn touch(&mut self) {
        self.last_activity_at = Utc::now();
    }

    /// Sliding expiry for remember-me sessions: once less than half of
    /// `ttl_long` remains, push expiry to `now + ttl_long`.
    pub fn extend_if_needed(&mut self, ttl_long: Duration) {
        if !self.remember_me {
            return;
        }
        let now = Utc::now();
        if self.expires_at_ms < (now + ttl_long / 2).timestamp_millis() {
            self.expires_at_ms = (now + ttl_long).timestamp_millis();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(remember_me: bool, ttl: Duration) -> AuthSession {
        AuthSession::new(UserId::new(), remember_me, vec![1; 32], None, None, ttl)
    }

    #[test]
    fn test_expiry() {
        assert!(!session(false, Duration::hours(1)).is_expired());
        assert!(session(false, Duration::milliseconds(-10)).is_expired());
    }

    #[test]
    fn test_remember_me_extension() {
        let long = Duration::days(7);
        let mut s = session(true, Duration::days(1));
        let before = s.expires_at_ms;
        s.extend_if_needed(long);
        assert!(s.expires_at_ms > before);

        let mut short = session(false, Duration::days(1));
        let before = short.expires_at_ms;
        short.extend_if_needed(long);
        assert_eq!(short.expires_at_ms, before);
    }
}
