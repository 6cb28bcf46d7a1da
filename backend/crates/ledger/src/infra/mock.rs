//! In-process simulation of a permissioned ledger network
//!
//! Endorsement is a policy check over the peers currently marked online,
//! ordering is a block counter, and transaction ids are SHA-256 digests.
//! Nothing leaves the process.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use chrono::Utc;
use kernel::id::CredentialId;
use platform::crypto::sha256_hex;
use tokio::sync::Mutex;

use crate::application::config::LedgerConfig;
use crate::domain::gateway::{LedgerGateway, LedgerStatus, PeerStatus};
use crate::domain::policy::EndorsementPolicy;
use crate::domain::transaction::{LedgerSubmission, TransactionReceipt};
use crate::error::{LedgerError, LedgerResult};

#[derive(Default)]
struct State {
    receipts: HashMap<String, TransactionReceipt>,
    /// idempotency key -> tx id
    by_key: HashMap<String, String>,
    /// credential -> tx ids in commit order
    history: HashMap<CredentialId, Vec<String>>,
    offline: BTreeSet<String>,
}

struct Inner {
    config: LedgerConfig,
    policy: EndorsementPolicy,
    state: Mutex<State>,
    block_height: AtomicU64,
    fail_next: AtomicU32,
}

#[derive(Clone)]
pub struct MockFabricNetwork {
    inner: Arc<Inner>,
}

impl MockFabricNetwork {
    pub fn new(config: LedgerConfig) -> Self {
        let policy = config.policy();
        tracing::info!(
            network = %config.network_name,
            channel = %config.channel,
            policy = %policy.describe(),
            "Mock ledger network started"
        );
        Self {
            inner: Arc::new(Inner {
                config,
                policy,
                state: Mutex::new(State::default()),
                block_height: AtomicU64::new(0),
                fail_next: AtomicU32::new(0),
            }),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.inner.config
    }

    /// The next `n` submissions fail with [`LedgerError::Unavailable`]
    pub fn fail_next(&self, n: u32) {
        self.inner.fail_next.store(n, Ordering::SeqCst);
    }

    /// Offline peers do not endorse
    pub async fn set_peer_online(&self, msp_id: &str, online: bool) {
        let mut state = self.inner.state.lock().await;
        if online {
            state.offline.remove(msp_id);
        } else {
            state.offline.insert(msp_id.to_string());
        }
    }

    pub fn block_height(&self) -> u64 {
        self.inner.block_height.load(Ordering::SeqCst)
    }

    fn take_injected_failure(&self) -> bool {
        self.inner
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl LedgerGateway for MockFabricNetwork {
    async fn submit(&self, submission: LedgerSubmission) -> LedgerResult<TransactionReceipt> {
        if let Some(existing) = self.replayed(&submission.idempotency_key).await {
            tracing::debug!(
                idempotency_key = %submission.idempotency_key,
                tx_id = %existing.tx_id,
                "Ledger submission replayed"
            );
            return Ok(existing);
        }

        if self.take_injected_failure() {
            return Err(LedgerError::Unavailable(
                "ordering service did not respond".to_string(),
            ));
        }

        let latency = self.inner.config.latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.inner.state.lock().await;

        // A concurrent submit with the same key may have committed meanwhile
        let committed = state
            .by_key
            .get(&submission.idempotency_key)
            .and_then(|tx_id| state.receipts.get(tx_id));
        if let Some(existing) = committed {
            return Ok(existing.clone());
        }

        let endorsers: Vec<String> = self
            .inner
            .config
            .peers
            .iter()
            .filter(|p| !state.offline.contains(*p))
            .cloned()
            .collect();
        self.inner.policy.check(&endorsers)?;

        let block_number = self.inner.block_height.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        let tx_id = sha256_hex(
            format!(
                "{}:{}:{}:{}",
                self.inner.config.channel,
                submission.idempotency_key,
                block_number,
                now.timestamp_nanos_opt().unwrap_or_default()
            )
            .as_bytes(),
        );

        let receipt = TransactionReceipt {
            tx_id: tx_id.clone(),
            block_number,
            operation: submission.operation,
            credential_id: submission.credential_id,
            payload_hash: submission.payload_hash,
            endorsements: endorsers,
            channel: self.inner.config.channel.clone(),
            chaincode: self.inner.config.chaincode.clone(),
            submitted_by: submission.submitted_by,
            timestamp: now,
        };

        state
            .by_key
            .insert(submission.idempotency_key, tx_id.clone());
        state
            .history
            .entry(receipt.credential_id)
            .or_default()
            .push(tx_id.clone());
        state.receipts.insert(tx_id, receipt.clone());

        tracing::info!(
            tx_id = %receipt.tx_id,
            block_number,
            operation = %receipt.operation,
            credential_id = %receipt.credential_id,
            "Ledger transaction committed"
        );

        Ok(receipt)
    }

    async fn credential_history(
        &self,
        credential_id: CredentialId,
    ) -> LedgerResult<Vec<TransactionReceipt>> {
        let state = self.inner.state.lock().await;
        Ok(state
            .history
            .get(&credential_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.receipts.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn transaction(&self, tx_id: &str) -> LedgerResult<Option<TransactionReceipt>> {
        Ok(self.inner.state.lock().await.receipts.get(tx_id).cloned())
    }

    async fn status(&self) -> LedgerResult<LedgerStatus> {
        let state = self.inner.state.lock().await;
        let config = &self.inner.config;
        Ok(LedgerStatus {
            network: config.network_name.clone(),
            channel: config.channel.clone(),
            chaincode: config.chaincode.clone(),
            peers: config
                .peers
                .iter()
                .map(|msp_id| PeerStatus {
                    msp_id: msp_id.clone(),
                    online: !state.offline.contains(msp_id),
                })
                .collect(),
            policy: self.inner.policy.clone(),
            block_height: self.block_height(),
            transaction_count: state.receipts.len(),
        })
    }
}

impl MockFabricNetwork {
    async fn replayed(&self, idempotency_key: &str) -> Option<TransactionReceipt> {
        let state = self.inner.state.lock().await;
        let tx_id = state.by_key.get(idempotency_key)?;
        state.receipts.get(tx_id).cloned()
    }
}
