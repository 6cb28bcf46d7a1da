//! Document Hash Value Object
//!
//! Documents are not stored; only their SHA-256 is kept so a holder can later
//! prove a file is the one that was verified.

use platform::crypto::is_sha256_hex;
use serde::Serialize;

use crate::error::{CredentialError, CredentialResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DocumentHash(String);

impl DocumentHash {
    /// Accepts hex in either case; stored lowercase
    pub fn new(hash: impl AsRef<str>) -> CredentialResult<Self> {
        let hash = hash.as_ref().trim().to_ascii_lowercase();
        if !is_sha256_hex(&hash) {
            return Err(CredentialError::Validation(
                "documentHash must be a SHA-256 hex digest".to_string(),
            ));
        }
        Ok(Self(hash))
    }

    pub fn from_db(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_hash() {
        let hex = platform::crypto::sha256_hex(b"diploma.pdf");
        assert_eq!(DocumentHash::new(hex.to_uppercase()).unwrap().as_str(), hex);
        assert!(DocumentHash::new("abc123").is_err());
        assert!(DocumentHash::new("z".repeat(64)).is_err());
    }
}
