//! Application Configuration
//!
//! Configuration for the Auth application layer.

use std::time::Duration;

use platform::cookie::CookieConfig;
use platform::crypto::{random_secret, sign_token, verify_token};
use uuid::Uuid;

pub use platform::cookie::SameSite;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub session_cookie_name: String,
    /// HMAC key for session tokens (32 bytes)
    pub session_secret: [u8; 32],
    /// Session TTL without "Remember Me" (12 hours)
    pub session_ttl_short: Duration,
    /// Session TTL with "Remember Me" (1 week)
    pub session_ttl_long: Duration,
    pub cookie_secure: bool,
    pub cookie_same_site: SameSite,
    /// Application-wide secret appended before hashing
    pub password_pepper: Option<Vec<u8>>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: "cm_session".to_string(),
            session_secret: [0u8; 32],
            session_ttl_short: Duration::from_secs(12 * 3600),
            session_ttl_long: Duration::from_secs(7 * 24 * 3600),
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            password_pepper: None,
        }
    }
}

impl AuthConfig {
    pub fn with_random_secret() -> Self {
        Self {
            session_secret: random_secret(),
            ..Default::default()
        }
    }

    /// Random secret, cookies without `Secure` (plain http on localhost)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Self::with_random_secret()
        }
    }

    pub fn session_ttl(&self, remember_me: bool) -> Duration {
        if remember_me {
            self.session_ttl_long
        } else {
            self.session_ttl_short
        }
    }

    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }

    /// `Max-Age` follows the session TTL
    pub fn session_cookie(&self, remember_me: bool) -> CookieConfig {
        CookieConfig::session(
            self.session_cookie_name.clone(),
            self.cookie_secure,
            self.cookie_same_site,
        )
        .with_max_age(self.session_ttl(remember_me).as_secs() as i64)
    }

    pub fn clear_cookie(&self) -> CookieConfig {
        CookieConfig::session(
            self.session_cookie_name.clone(),
            self.cookie_secure,
            self.cookie_same_site,
        )
    }

    /// `<session_id>.<signature>`
    pub fn sign_session_id(&self, session_id: Uuid) -> String {
        sign_token(&self.session_secret, &session_id.to_string())
    }

    /// `None` for a bad signature or a payload that is not a UUID
    pub fn verify_session_token(&self, token: &str) -> Option<Uuid> {
        verify_token(&self.session_secret, token)?.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_roundtrip() {
        let config = AuthConfig::with_random_secret();
        let id = Uuid::new_v4();
        let token = config.sign_session_id(id);
        assert_eq!(config.verify_session_token(&token), Some(id));

        let other = AuthConfig::with_random_secret();
        assert_eq!(other.verify_session_token(&token), None);
        assert_eq!(config.verify_session_token("garbage"), None);
    }

    #[test]
    fn test_session_cookie_max_age() {
        let config = AuthConfig::development();
        let short = config.session_cookie(false).build_set_cookie("t");
        let long = config.session_cookie(true).build_set_cookie("t");
        assert!(short.contains("Max-Age=43200"));
        assert!(long.contains("Max-Age=604800"));
        assert!(!short.contains("Secure"));
    }
}
