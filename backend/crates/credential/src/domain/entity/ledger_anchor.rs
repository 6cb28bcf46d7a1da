//! Ledger anchor outbox row
//!
//! Written in the same transaction as the credential change it anchors, then
//! drained by the anchoring worker. The anchor id doubles as the ledger
//! idempotency key, so a submission that timed out can be retried without
//! creating a second transaction.

use std::time::Duration;

use chrono::{DateTime, Utc};
use kernel::id::{CredentialId, LedgerAnchorId};
use ledger::{LedgerOperation, LedgerSubmission};

use crate::domain::value_object::OutboxStatus;

const LAST_ERROR_MAX_LENGTH: usize = 500;

/// Exponential retry schedule: `base * factor^(n-1)`, capped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub factor: u32,
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            factor: 2,
            cap: Duration::from_secs(300),
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let multiplier = self.factor.max(1).saturating_pow(exponent);
        self.base.saturating_mul(multiplier).min(self.cap)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAnchor {
    pub anchor_id: LedgerAnchorId,
    pub credential_id: CredentialId,
    pub operation: LedgerOperation,
    pub status: OutboxStatus,
    /// Failed attempts so far
    pub retry_count: u32,
    pub max_retries: u32,
    pub next_attempt_at: DateTime<Utc>,
    /// Lease held by a worker
    pub locked_until: Option<DateTime<Utc>>,
    pub payload_hash: String,
    pub submitted_by: String,
    pub tx_id: Option<String>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LedgerAnchor {
    pub fn new(
        credential_id: CredentialId,
        operation: LedgerOperation,
        payload_hash: String,
        submitted_by: impl Into<String>,
        max_retries: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            anchor_id: LedgerAnchorId::new(),
            credential_id,
            operation,
            status: OutboxStatus::Pending,
            retry_count: 0,
            max_retries,
            next_attempt_at: now,
            locked_until: None,
            payload_hash,
            submitted_by: submitted_by.into(),
            tx_id: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn idempotency_key(&self) -> String {
        self.anchor_id.to_string()
    }

    pub fn to_submission(&self) -> LedgerSubmission {
        LedgerSubmission {
            idempotency_key: self.idempotency_key(),
            operation: self.operation,
            credential_id: self.credential_id,
            payload_hash: self.payload_hash.clone(),
            submitted_by: self.submitted_by.clone(),
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == OutboxStatus::Pending
            && self.next_attempt_at <= now
            && self.locked_until.is_none_or(|until| until <= now)
    }

    pub fn record_success(&mut self, tx_id: impl Into<String>, now: DateTime<Utc>) {
        self.status = OutboxStatus::Anchored;
        self.tx_id = Some(tx_id.into());
        self.last_error = None;
        self.locked_until = None;
        self.updated_at = now;
    }

    /// Reschedule, or give up once `max_retries` retries have failed.
    /// Returns `true` when the anchor is now permanently failed.
    pub fn record_failure(
        &mut self,
        error: &str,
        backoff: &BackoffPolicy,
        now: DateTime<Utc>,
    ) -> bool {
        self.retry_count += 1;
        self.last_error = Some(error.chars().take(LAST_ERROR_MAX_LENGTH).collect());
        self.locked_until = None;
        self.updated_at = now;

        if self.retry_count > self.max_retries {
            self.status = OutboxStatus::Failed;
            return true;
        }

        let delay = chrono::Duration::from_std(backoff.delay(self.retry_count))
            .unwrap_or_else(|_| chrono::Duration::seconds(300));
        self.next_attempt_at = now + delay;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(max_retries: u32) -> LedgerAnchor {
        LedgerAnchor::new(
            CredentialId::new(),
            LedgerOperation::IssueCredential,
            "00".repeat(32),
            "registrar",
            max_retries,
            Utc::now(),
        )
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = BackoffPolicy::default();
        let secs: Vec<u64> = (1..=10).map(|n| policy.delay(n).as_secs()).collect();
        assert_eq!(secs, vec![1, 2, 4, 8, 16, 32, 64, 128, 256, 300]);
        assert_eq!(policy.delay(100), Duration::from_secs(300));
    }

    #[test]
    fn test_failure_reschedules_then_gives_up() {
        let policy = BackoffPolicy::default();
        let mut anchor = anchor(2);
        let now = Utc::now();

        assert!(!anchor.record_failure("peer down", &policy, now));
        assert_eq!(anchor.next_attempt_at, now + chrono::Duration::seconds(1));
        assert!(!anchor.is_due(now));
        assert!(anchor.is_due(now + chrono::Duration::seconds(1)));

        assert!(!anchor.record_failure("peer down", &policy, now));
        assert_eq!(anchor.next_attempt_at, now + chrono::Duration::seconds(2));

        assert!(anchor.record_failure("peer down", &policy, now));
        assert_eq!(anchor.status, OutboxStatus::Failed);
        assert_eq!(anchor.retry_count, 3);
        assert!(!anchor.is_due(now + chrono::Duration::days(1)));
    }

    #[test]
    fn test_success_and_submission_key() {
        let mut anchor = anchor(5);
        let submission = anchor.to_submission();
        assert_eq!(submission.idempotency_key, anchor.anchor_id.to_string());

        anchor.record_success("ab".repeat(32), Utc::now());
        assert_eq!(anchor.status, OutboxStatus::Anchored);
        assert!(anchor.tx_id.is_some());
    }

    #[test]
    fn test_lease_blocks_due() {
        let now = Utc::now();
        let mut anchor = anchor(5);
        anchor.locked_until = Some(now + chrono::Duration::seconds(30));
        assert!(!anchor.is_due(now));
        assert!(anchor.is_due(now + chrono::Duration::seconds(30)));
    }
}
