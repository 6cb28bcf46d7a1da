//! API DTOs

use chrono::{DateTime, Utc};
use kernel::id::CredentialId;
use serde::Serialize;

use crate::domain::gateway::{LedgerStatus, PeerStatus};
use crate::domain::transaction::TransactionReceipt;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub tx_id: String,
    pub block_number: u64,
    pub operation: String,
    pub chaincode_function: String,
    pub credential_id: CredentialId,
    pub payload_hash: String,
    pub endorsements: Vec<String>,
    pub channel: String,
    pub chaincode: String,
    pub submitted_by: String,
    pub timestamp: DateTime<Utc>,
}

impl From<TransactionReceipt> for TransactionResponse {
    fn from(r: TransactionReceipt) -> Self {
        Self {
            tx_id: r.tx_id,
            block_number: r.block_number,
            operation: r.operation.code().to_string(),
            chaincode_function: r.operation.chaincode_function().to_string(),
            credential_id: r.credential_id,
            payload_hash: r.payload_hash,
            endorsements: r.endorsements,
            channel: r.channel,
            chaincode: r.chaincode,
            submitted_by: r.submitted_by,
            timestamp: r.timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialHistoryResponse {
    pub credential_id: CredentialId,
    pub transactions: Vec<TransactionResponse>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStatusResponse {
    pub network: String,
    pub channel: String,
    pub chaincode: String,
    pub peers: Vec<PeerStatus>,
    /// e.g. `2-of-3 {A, B, C}`
    pub endorsement_policy: String,
    pub block_height: u64,
    pub transaction_count: usize,
}

impl From<LedgerStatus> for LedgerStatusResponse {
    fn from(s: LedgerStatus) -> Self {
        Self {
            endorsement_policy: s.policy.describe(),
            network: s.network,
            channel: s.channel,
            chaincode: s.chaincode,
            peers: s.peers,
            block_height: s.block_height,
            transaction_count: s.transaction_count,
        }
    }
}
