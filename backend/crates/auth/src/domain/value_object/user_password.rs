//! User Password Value Object
//!
//! Domain wrapper over `platform::password` that turns policy violations into
//! user-facing [`AuthError`]s.

use std::fmt;

use platform::password::{ClearTextPassword, HashedPassword, PasswordPolicyError};

use crate::error::{AuthError, AuthResult};

/// Password as typed by the user. Zeroized on drop.
pub struct RawPassword(ClearTextPassword);

impl RawPassword {
    /// Validate a new password (sign-up), rejecting ones built from the
    /// user's own email or name.
    pub fn new_for_user(raw: String, email_local: &str, display_name: &str) -> AuthResult<Self> {
        let mut context: Vec<&str> = display_name.split_whitespace().collect();
        context.push(email_local);
        ClearTextPassword::new_with_context(raw, &context)
            .map(Self)
            .map_err(policy_error)
    }

    /// Accept whatever the user typed at sign-in. Policy is only enforced when
    /// a password is chosen; old passwords may predate policy changes.
    pub fn for_verification(raw: String) -> AuthResult<Self> {
        ClearTextPassword::new(raw)
            .map(Self)
            .map_err(|_| AuthError::InvalidCredentials)
    }

    pub(crate) fn inner(&self) -> &ClearTextPassword {
        &self.0
    }
}

fn policy_error(err: PasswordPolicyError) -> AuthError {
    AuthError::PasswordValidation(err.to_string())
}

impl fmt::Debug for RawPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawPassword([REDACTED])")
    }
}

/// Argon2id hash as stored in `user_auth.password_hash`
#[derive(Clone, PartialEq, Eq)]
pub struct UserPassword(HashedPassword);

impl UserPassword {
    pub fn from_raw(raw: &RawPassword, pepper: Option<&[u8]>) -> AuthResult<Self> {
        raw.inner()
            .hash(pepper)
            .map(Self)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    pub fn from_phc_string(phc: impl Into<String>) -> AuthResult<Self> {
        HashedPassword::from_phc_string(phc)
            .map(Self)
            .map_err(|_| AuthError::Internal("Invalid password hash in database".to_string()))
    }

    pub fn as_phc_string(&self) -> &str {
        self.0.as_phc_string()
    }

    pub fn verify(&self, raw: &RawPassword, pepper: Option<&[u8]>) -> bool {
        self.0.verify(raw.inner(), pepper)
    }

    /// Spend the same Argon2 work as a real check against a throwaway hash
    pub fn burn_verification(raw: &RawPassword, pepper: Option<&[u8]>) {
        if let Ok(dummy) = HashedPassword::dummy() {
            let _ = dummy.verify(raw.inner(), pepper);
        }
    }
}

impl fmt::Debug for UserPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UserPassword([HASH])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_for_user_rejects_personal_info() {
        let err = RawPassword::new_for_user("sato-keiko-1999".into(), "k.sato", "Keiko Sato")
            .unwrap_err();
        assert!(matches!(err, AuthError::PasswordValidation(_)));

        assert!(RawPassword::new_for_user("Amber-Lantern-42".into(), "k.sato", "Keiko Sato").is_ok());
    }

    #[test]
    fn test_hash_and_verify() {
        let raw = RawPassword::new_for_user("Amber-Lantern-42".into(), "x", "Y").unwrap();
        let hashed = UserPassword::from_raw(&raw, None).unwrap();
        assert!(hashed.verify(&raw, None));

        let wrong = RawPassword::for_verification("Amber-Lantern-43".into()).unwrap();
        assert!(!hashed.verify(&wrong, None));
    }

    #[test]
    fn test_verification_input_too_short_is_invalid_credentials() {
        let err = RawPassword::for_verification("short".into()).unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[test]
    fn test_phc_roundtrip_and_redaction() {
        let raw = RawPassword::new_for_user("Amber-Lantern-42".into(), "x", "Y").unwrap();
        let hashed = UserPassword::from_raw(&raw, Some(b"pepper")).unwrap();
        let restored = UserPassword::from_phc_string(hashed.as_phc_string()).unwrap();
        assert!(restored.verify(&raw, Some(b"pepper")));

        assert!(format!("{:?}", raw).contains("REDACTED"));
        assert!(format!("{:?}", hashed).contains("HASH"));
    }
}
