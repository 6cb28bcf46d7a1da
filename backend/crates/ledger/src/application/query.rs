//! Ledger query use case

use std::sync::Arc;

use kernel::id::CredentialId;

use crate::domain::gateway::{LedgerGateway, LedgerStatus};
use crate::domain::transaction::{TransactionReceipt, is_valid_tx_id};
use crate::error::{LedgerError, LedgerResult};

pub struct LedgerQueryUseCase<G>
where
    G: LedgerGateway,
{
    gateway: Arc<G>,
}

impl<G> LedgerQueryUseCase<G>
where
    G: LedgerGateway,
{
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }

    pub async fn status(&self) -> LedgerResult<LedgerStatus> {
        self.gateway.status().await
    }

    pub async fn credential_history(
        &self,
        credential_id: CredentialId,
    ) -> LedgerResult<Vec<TransactionReceipt>> {
        self.gateway.credential_history(credential_id).await
    }

    pub async fn transaction(&self, tx_id: &str) -> LedgerResult<TransactionReceipt> {
        let tx_id = tx_id.trim();
        if !is_valid_tx_id(tx_id) {
            return Err(LedgerError::InvalidTransactionId);
        }
        self.gateway
            .transaction(tx_id)
            .await?
            .ok_or(LedgerError::TransactionNotFound)
    }
}
