//! Credential workflow configuration

use std::time::Duration;

use crate::domain::entity::BackoffPolicy;

#[derive(Debug, Clone)]
pub struct CredentialConfig {
    /// Retries after the first failed ledger submission
    pub anchor_max_retries: u32,
    pub anchor_backoff: BackoffPolicy,
    /// Fallback poll when no enqueue wakes the worker
    pub anchor_poll_interval: Duration,
    /// How long a claimed outbox row stays invisible to other workers
    pub anchor_lease: Duration,
    pub anchor_batch_size: u32,
    pub expiry_sweep_interval: Duration,
    pub expiry_batch_size: u32,
    pub analytics_months: u32,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            anchor_max_retries: 5,
            anchor_backoff: BackoffPolicy::default(),
            anchor_poll_interval: Duration::from_secs(5),
            anchor_lease: Duration::from_secs(30),
            anchor_batch_size: 16,
            expiry_sweep_interval: Duration::from_secs(3600),
            expiry_batch_size: 100,
            analytics_months: 12,
        }
    }
}

impl CredentialConfig {
    pub fn development() -> Self {
        Self {
            anchor_poll_interval: Duration::from_secs(1),
            expiry_sweep_interval: Duration::from_secs(60),
            ..Default::default()
        }
    }
}
