//! Ledger gateway trait

use kernel::id::CredentialId;
use serde::Serialize;

use crate::domain::policy::EndorsementPolicy;
use crate::domain::transaction::{LedgerSubmission, TransactionReceipt};
use crate::error::LedgerResult;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerStatus {
    pub msp_id: String,
    pub online: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStatus {
    pub network: String,
    pub channel: String,
    pub chaincode: String,
    pub peers: Vec<PeerStatus>,
    pub policy: EndorsementPolicy,
    pub block_height: u64,
    pub transaction_count: usize,
}

#[trait_variant::make(LedgerGateway: Send)]
pub trait LocalLedgerGateway {
    /// Endorse, order and commit a write. Idempotent on
    /// `submission.idempotency_key`.
    async fn submit(&self, submission: LedgerSubmission) -> LedgerResult<TransactionReceipt>;

    /// Every committed transaction for the credential, oldest first
    async fn credential_history(
        &self,
        credential_id: CredentialId,
    ) -> LedgerResult<Vec<TransactionReceipt>>;

    async fn transaction(&self, tx_id: &str) -> LedgerResult<Option<TransactionReceipt>>;

    async fn status(&self) -> LedgerResult<LedgerStatus>;
}
