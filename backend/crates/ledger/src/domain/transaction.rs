//! Ledger transactions

use chrono::{DateTime, Utc};
use kernel::id::CredentialId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerOperation {
    IssueCredential,
    VerifyCredential,
    RevokeCredential,
}

impl LedgerOperation {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::IssueCredential => "issue_credential",
            Self::VerifyCredential => "verify_credential",
            Self::RevokeCredential => "revoke_credential",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "issue_credential" => Some(Self::IssueCredential),
            "verify_credential" => Some(Self::VerifyCredential),
            "revoke_credential" => Some(Self::RevokeCredential),
            _ => None,
        }
    }

    /// Chaincode function invoked for this operation
    pub const fn chaincode_function(&self) -> &'static str {
        match self {
            Self::IssueCredential => "IssueCredential",
            Self::VerifyCredential => "VerifyCredential",
            Self::RevokeCredential => "RevokeCredential",
        }
    }
}

impl std::fmt::Display for LedgerOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A write request. Submitting the same `idempotency_key` twice yields the
/// first receipt.
#[derive(Debug, Clone)]
pub struct LedgerSubmission {
    pub idempotency_key: String,
    pub operation: LedgerOperation,
    pub credential_id: CredentialId,
    /// SHA-256 hex of the anchored credential state
    pub payload_hash: String,
    /// User or service that caused the write
    pub submitted_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    /// 64 lowercase hex characters
    pub tx_id: String,
    pub block_number: u64,
    pub operation: LedgerOperation,
    pub credential_id: CredentialId,
    pub payload_hash: String,
    /// MSP ids of the peers that endorsed
    pub endorsements: Vec<String>,
    pub channel: String,
    pub chaincode: String,
    pub submitted_by: String,
    pub timestamp: DateTime<Utc>,
}

/// Shape check for user-supplied transaction ids
pub fn is_valid_tx_id(tx_id: &str) -> bool {
    tx_id.len() == 64
        && tx_id
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_codes() {
        for op in [
            LedgerOperation::IssueCredential,
            LedgerOperation::VerifyCredential,
            LedgerOperation::RevokeCredential,
        ] {
            assert_eq!(LedgerOperation::from_code(op.code()), Some(op));
        }
        assert_eq!(LedgerOperation::from_code("burn"), None);
        assert_eq!(
            serde_json::to_string(&LedgerOperation::VerifyCredential).unwrap(),
            r#""verify_credential""#
        );
    }

    #[test]
    fn test_tx_id_shape() {
        assert!(is_valid_tx_id(&"a1".repeat(32)));
        assert!(!is_valid_tx_id(&"A1".repeat(32)));
        assert!(!is_valid_tx_id("abc"));
        assert!(!is_valid_tx_id(&"g".repeat(64)));
    }
}
