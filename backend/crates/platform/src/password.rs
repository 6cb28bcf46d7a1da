//! Password Hashing and Verification
//!
//! NIST SP 800-63B style handling:
//! - NFKC normalisation, length counted in code points
//! - Argon2id hashing with optional pepper
//! - Zeroization of the clear text on drop
//! - A small deny list of predictable passwords
//!
//! The password may additionally be checked against user-specific context
//! (e.g. the email local part) with [`ClearTextPassword::new_with_context`].

use std::fmt;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::rngs::OsRng;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// NIST: SHALL be at least 8
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// NIST: SHOULD permit at least 64
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Context fragments shorter than this are not checked
const MIN_CONTEXT_LEN: usize = 4;

const DENY_LIST: &[&str] = &[
    "password",
    "password1",
    "password123",
    "passw0rd",
    "12345678",
    "123456789",
    "1234567890",
    "abcdefgh",
    "letmein1",
    "welcome1",
    "iloveyou",
    "trustno1",
    "qwertyuiop",
    "student1",
    "university",
    "graduate",
    "credential",
];

const KEYBOARD_RUNS: &[&str] = &["qwerty", "asdfgh", "zxcvbn", "1qaz2wsx", "qazwsx"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("Password must be at most {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("Password cannot be empty or contain only whitespace")]
    EmptyOrWhitespace,

    #[error("Password contains invalid control characters")]
    InvalidCharacter,

    #[error("Password is too common or follows a predictable pattern")]
    CommonPattern,

    #[error("Password must not contain your email or name")]
    ContainsPersonalInfo,
}

#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

/// Clear text password, wiped from memory on drop.
///
/// Not `Clone`; `Debug` is redacted.
///
/// ```rust
/// use platform::password::ClearTextPassword;
///
/// let password = ClearTextPassword::new("Tr4nscript-Vault".to_string()).unwrap();
/// let hashed = password.hash(None).unwrap();
/// assert!(hashed.verify(&password, None));
/// ```
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    pub fn new(raw: String) -> Result<Self, PasswordPolicyError> {
        Self::new_with_context(raw, &[])
    }

    /// Validate, additionally rejecting passwords that contain any of
    /// `context` (case-insensitive).
    pub fn new_with_context(raw: String, context: &[&str]) -> Result<Self, PasswordPolicyError> {
        let raw = Zeroizing::new(raw);
        let normalized: String = raw.nfkc().collect();
        let candidate = Self(normalized);

        check_policy(&candidate.0)?;

        let lower = Zeroizing::new(candidate.0.to_lowercase());
        let leaks_context = context
            .iter()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| c.chars().count() >= MIN_CONTEXT_LEN)
            .any(|c| lower.contains(&c));
        if leaks_context {
            return Err(PasswordPolicyError::ContainsPersonalInfo);
        }

        Ok(candidate)
    }

    #[cfg(test)]
    pub fn new_unchecked(raw: String) -> Self {
        Self(raw)
    }

    fn peppered(&self, pepper: Option<&[u8]>) -> Zeroizing<Vec<u8>> {
        let mut bytes = self.0.as_bytes().to_vec();
        if let Some(p) = pepper {
            bytes.extend_from_slice(p);
        }
        Zeroizing::new(bytes)
    }

    /// Argon2id (default OWASP parameters: m=19 MiB, t=2, p=1)
    pub fn hash(&self, pepper: Option<&[u8]>) -> Result<HashedPassword, PasswordHashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(&self.peppered(pepper), &salt)
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()))?;

        Ok(HashedPassword {
            phc: hash.to_string(),
        })
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClearTextPassword([REDACTED])")
    }
}

/// Argon2id hash in PHC string format, safe to persist.
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    phc: String,
}

impl HashedPassword {
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let phc = s.into();
        PasswordHash::new(&phc).map_err(|_| PasswordHashError::InvalidHashFormat)?;
        Ok(Self { phc })
    }

    pub fn as_phc_string(&self) -> &str {
        &self.phc
    }

    /// Constant-time verification. The pepper must match the one used to hash.
    pub fn verify(&self, password: &ClearTextPassword, pepper: Option<&[u8]>) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.phc) else {
            return false;
        };
        Argon2::default()
            .verify_password(&password.peppered(pepper), &parsed)
            .is_ok()
    }

    /// `true` when the stored hash is not Argon2id
    pub fn needs_rehash(&self) -> bool {
        PasswordHash::new(&self.phc)
            .map(|parsed| parsed.algorithm != argon2::Algorithm::Argon2id.ident())
            .unwrap_or(true)
    }

    /// A valid hash of a random secret. Verifying against it costs the same as
    /// a real account, so unknown emails do not answer faster.
    pub fn dummy() -> Result<Self, PasswordHashError> {
        let secret = crate::crypto::to_base64(&crate::crypto::random_bytes(24));
        ClearTextPassword(secret).hash(None)
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashedPassword([HASH])")
    }
}

fn check_policy(password: &str) -> Result<(), PasswordPolicyError> {
    if password.trim().is_empty() {
        return Err(PasswordPolicyError::EmptyOrWhitespace);
    }

    let actual = password.chars().count();
    if actual < MIN_PASSWORD_LENGTH {
        return Err(PasswordPolicyError::TooShort {
            min: MIN_PASSWORD_LENGTH,
            actual,
        });
    }
    if actual > MAX_PASSWORD_LENGTH {
        return Err(PasswordPolicyError::TooLong {
            max: MAX_PASSWORD_LENGTH,
            actual,
        });
    }

    if password
        .chars()
        .any(|c| c.is_control() && c != '\t' && c != '\n')
    {
        return Err(PasswordPolicyError::InvalidCharacter);
    }

    if is_predictable(password) {
        return Err(PasswordPolicyError::CommonPattern);
    }

    Ok(())
}

fn is_predictable(password: &str) -> bool {
    let lower = password.to_lowercase();

    if DENY_LIST.contains(&lower.as_str()) {
        return true;
    }
    if KEYBOARD_RUNS.iter().any(|run| lower.contains(run)) {
        return true;
    }

    let mut chars = lower.chars();
    if let Some(first) = chars.next() {
        if chars.all(|c| c == first) {
            return true;
        }
    }

    is_digit_run(&lower)
}

/// Only digits, each one step from the previous (wrapping 9/0)
fn is_digit_run(s: &str) -> bool {
    let digits: Option<Vec<u32>> = s.chars().map(|c| c.to_digit(10)).collect();
    let Some(digits) = digits else {
        return false;
    };
    if digits.len() < 4 {
        return false;
    }
    let step = |a: u32, b: u32| (b + 10 - a) % 10;
    let first = step(digits[0], digits[1]);
    (first == 1 || first == 9) && digits.windows(2).all(|w| step(w[0], w[1]) == first)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_limits() {
        assert!(matches!(
            ClearTextPassword::new("short".to_string()),
            Err(PasswordPolicyError::TooShort { min: 8, actual: 5 })
        ));
        assert!(matches!(
            ClearTextPassword::new("x7".repeat(MAX_PASSWORD_LENGTH)),
            Err(PasswordPolicyError::TooLong { .. })
        ));
    }

    #[test]
    fn test_whitespace_only() {
        assert!(matches!(
            ClearTextPassword::new("          ".to_string()),
            Err(PasswordPolicyError::EmptyOrWhitespace)
        ));
    }

    #[test]
    fn test_control_characters_rejected() {
        assert!(matches!(
            ClearTextPassword::new("abc\u{0007}defghij".to_string()),
            Err(PasswordPolicyError::InvalidCharacter)
        ));
    }

    #[test]
    fn test_predictable_passwords() {
        for weak in ["Password123", "myqwertykey", "87654321", "zzzzzzzzzz", "university"] {
            assert!(
                matches!(
                    ClearTextPassword::new(weak.to_string()),
                    Err(PasswordPolicyError::CommonPattern)
                ),
                "{weak} should be rejected"
            );
        }
    }

    #[test]
    fn test_context_is_rejected() {
        let result = ClearTextPassword::new_with_context(
            "Hanako-Yamada-2024".to_string(),
            &["hanako", "yamada.h@uni.example"],
        );
        assert!(matches!(result, Err(PasswordPolicyError::ContainsPersonalInfo)));

        // Fragments shorter than 4 characters are ignored
        assert!(ClearTextPassword::new_with_context("Blue-Harbor-77".to_string(), &["blu"]).is_ok());
    }

    #[test]
    fn test_unicode_password() {
        assert!(ClearTextPassword::new("卒業証明書を守る鍵です".to_string()).is_ok());
    }

    #[test]
    fn test_hash_and_verify_with_pepper() {
        let password = ClearTextPassword::new_unchecked("Registrar#Ledger9".to_string());
        let pepper = b"server-side-pepper";
        let hashed = password.hash(Some(pepper)).unwrap();

        assert!(hashed.verify(&password, Some(pepper)));
        assert!(!hashed.verify(&password, None));
        assert!(!hashed.verify(&ClearTextPassword::new_unchecked("other".into()), Some(pepper)));
        assert!(!hashed.needs_rehash());
    }

    #[test]
    fn test_phc_string_roundtrip() {
        let password = ClearTextPassword::new_unchecked("Registrar#Ledger9".to_string());
        let stored = password.hash(None).unwrap().as_phc_string().to_string();
        let restored = HashedPassword::from_phc_string(stored).unwrap();
        assert!(restored.verify(&password, None));

        assert!(HashedPassword::from_phc_string("not_a_valid_hash").is_err());
    }

    #[test]
    fn test_dummy_hash_verifies_nothing() {
        let dummy = HashedPassword::dummy().unwrap();
        let guess = ClearTextPassword::new_unchecked("anything-at-all".to_string());
        assert!(!dummy.verify(&guess, None));
    }

    #[test]
    fn test_debug_redaction() {
        let password = ClearTextPassword::new_unchecked("secret-value".to_string());
        let rendered = format!("{:?}", password);
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("secret-value"));
    }
}
