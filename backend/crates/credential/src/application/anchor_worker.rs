//! Ledger anchoring worker
//!
//! Drains the `ledger_anchors` outbox. Rows are claimed under a lease, so
//! several workers can share one database, and submitted with the anchor id
//! as idempotency key, so a retry after a lost response cannot create a
//! second ledger transaction. The worker wakes as soon as a use case commits
//! a new row and otherwise polls; rows left over from a crash are picked up
//! when their lease expires.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ledger::LedgerGateway;
use notification::EventActor;

use crate::application::context::WorkflowContext;
use crate::domain::entity::LedgerAnchor;
use crate::domain::repository::AnchorOutbox;
use crate::error::CredentialResult;

/// Outcome counts of one pass over the outbox
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnchorRunSummary {
    pub anchored: usize,
    pub rescheduled: usize,
    pub failed: usize,
    /// Of the rescheduled and failed, those the network refused outright
    pub rejected: usize,
}

impl AnchorRunSummary {
    pub fn processed(&self) -> usize {
        self.anchored + self.rescheduled + self.failed
    }
}

pub struct LedgerAnchorWorker<O, G>
where
    O: AnchorOutbox + Send + Sync + 'static,
    G: LedgerGateway + Send + Sync + 'static,
{
    outbox: Arc<O>,
    gateway: Arc<G>,
    ctx: WorkflowContext,
}

impl<O, G> LedgerAnchorWorker<O, G>
where
    O: AnchorOutbox + Send + Sync + 'static,
    G: LedgerGateway + Send + Sync + 'static,
{
    pub fn new(outbox: Arc<O>, gateway: Arc<G>, ctx: WorkflowContext) -> Self {
        Self {
            outbox,
            gateway,
            ctx,
        }
    }

    /// Run until the task is aborted
    pub async fn run(self) {
        let poll = self.ctx.config.anchor_poll_interval;
        tracing::info!(poll_secs = poll.as_secs(), "Ledger anchor worker started");

        loop {
            // Drain everything that is due before sleeping again
            loop {
                match self.run_once_at(Utc::now()).await {
                    Ok(summary) if summary.processed() > 0 => continue,
                    Ok(_) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "Ledger anchor pass failed");
                        break;
                    }
                }
            }

            tokio::select! {
                _ = self.ctx.wakeup.notified() => {}
                _ = tokio::time::sleep(poll) => {}
            }
        }
    }

    /// Claim and submit every row due at `now`
    pub async fn run_once_at(&self, now: DateTime<Utc>) -> CredentialResult<AnchorRunSummary> {
        let config = &self.ctx.config;
        let claimed = self
            .outbox
            .claim_due(now, config.anchor_lease, config.anchor_batch_size)
            .await?;

        let mut summary = AnchorRunSummary::default();
        for anchor in claimed {
            match self.attempt(anchor, now).await {
                Ok(Attempt::Anchored) => summary.anchored += 1,
                Ok(Attempt::Rescheduled { rejected }) => {
                    summary.rescheduled += 1;
                    summary.rejected += usize::from(rejected);
                }
                Ok(Attempt::Failed { rejected }) => {
                    summary.failed += 1;
                    summary.rejected += usize::from(rejected);
                }
                // The lease expires and the row is retried by a later pass
                Err(e) => tracing::error!(error = %e, "Recording anchor attempt failed"),
            }
        }
        Ok(summary)
    }

    async fn attempt(&self, mut anchor: LedgerAnchor, now: DateTime<Utc>) -> CredentialResult<Attempt> {
        match self.gateway.submit(anchor.to_submission()).await {
            Ok(receipt) => {
                anchor.record_success(receipt.tx_id.clone(), now);
                let credential = self.outbox.record_attempt(&anchor).await?;
                tracing::info!(
                    anchor_id = %anchor.anchor_id,
                    credential_id = %anchor.credential_id,
                    operation = %anchor.operation,
                    tx_id = %receipt.tx_id,
                    block_number = receipt.block_number,
                    "Credential anchored"
                );
                if let Some(credential) = credential {
                    self.ctx.publish_credential(
                        "credential.anchored",
                        &credential,
                        None,
                        EventActor::system(),
                    );
                }
                Ok(Attempt::Anchored)
            }
            Err(e) => {
                let rejected = !e.is_transient();
                let error = e.to_string();
                let gave_up = anchor.record_failure(&error, &self.ctx.config.anchor_backoff, now);
                let credential = self.outbox.record_attempt(&anchor).await?;
                if !gave_up {
                    // An unavailable network is routine; a refusal usually
                    // means the peer set or policy is misconfigured
                    if rejected {
                        tracing::warn!(
                            anchor_id = %anchor.anchor_id,
                            credential_id = %anchor.credential_id,
                            retry_count = anchor.retry_count,
                            next_attempt_at = %anchor.next_attempt_at,
                            error = %error,
                            "Ledger rejected submission, rescheduled"
                        );
                    } else {
                        tracing::debug!(
                            anchor_id = %anchor.anchor_id,
                            retry_count = anchor.retry_count,
                            next_attempt_at = %anchor.next_attempt_at,
                            error = %error,
                            "Ledger submission failed, rescheduled"
                        );
                    }
                    return Ok(Attempt::Rescheduled { rejected });
                }

                tracing::warn!(
                    anchor_id = %anchor.anchor_id,
                    credential_id = %anchor.credential_id,
                    operation = %anchor.operation,
                    retry_count = anchor.retry_count,
                    error = %error,
                    "Ledger anchoring gave up"
                );
                if let Some(credential) = credential {
                    self.ctx.publish_credential(
                        "credential.anchor_failed",
                        &credential,
                        None,
                        EventActor::system(),
                    );
                }
                Ok(Attempt::Failed { rejected })
            }
        }
    }
}

enum Attempt {
    Anchored,
    Rescheduled { rejected: bool },
    Failed { rejected: bool },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::decide::DecideVerificationUseCase;
    use crate::application::fixtures::*;
    use crate::application::request_verification::RequestVerificationUseCase;
    use crate::domain::service::workflow::Decision;
    use crate::domain::value_object::{AnchorStatus, OutboxStatus};
    use chrono::Duration;
    use ledger::{LedgerConfig, LedgerOperation, MockFabricNetwork};

    fn worker(env: &TestEnv, network: &Arc<MockFabricNetwork>) -> LedgerAnchorWorker<InMemoryCredentialStore, MockFabricNetwork> {
        LedgerAnchorWorker::new(env.store.clone(), network.clone(), env.ctx.clone())
    }

    #[tokio::test]
    async fn test_anchors_issued_credential() {
        let env = TestEnv::new().await;
        let mut rx = env.ctx.bus.subscribe();
        let network = Arc::new(MockFabricNetwork::new(LedgerConfig::instant()));
        let credential = env.issued(&env.student()).await;

        let summary = worker(&env, &network).run_once_at(Utc::now()).await.unwrap();
        assert_eq!(summary.anchored, 1);

        let stored = env.stored_credential(credential.credential_id).await;
        assert_eq!(stored.anchor_status, AnchorStatus::Anchored);
        let tx_id = stored.ledger_tx_id.clone().unwrap();
        assert_eq!(tx_id.len(), 64);
        assert_eq!(env.store.anchors().await[0].tx_id.as_deref(), Some(tx_id.as_str()));
        assert_eq!(network.block_height(), 1);

        // Nothing left to do
        let again = worker(&env, &network).run_once_at(Utc::now()).await.unwrap();
        assert_eq!(again.processed(), 0);

        let mut types = Vec::new();
        while let Ok(event) = rx.try_recv() {
            types.push(event.envelope.event_type.clone());
        }
        assert!(types.contains(&"credential.anchored".to_string()));
    }

    #[tokio::test]
    async fn test_failure_backs_off_then_succeeds() {
        let env = TestEnv::new().await;
        let network = Arc::new(MockFabricNetwork::new(LedgerConfig::instant()));
        let credential = env.issued(&env.student()).await;
        network.fail_next(1);
        let now = Utc::now();

        let first = worker(&env, &network).run_once_at(now).await.unwrap();
        assert_eq!(first.rescheduled, 1);
        let anchor = env.store.anchors().await.remove(0);
        assert_eq!(anchor.retry_count, 1);
        assert_eq!(anchor.next_attempt_at, now + Duration::seconds(1));
        assert!(anchor.last_error.is_some());

        // Not due yet
        let early = worker(&env, &network).run_once_at(now).await.unwrap();
        assert_eq!(early.processed(), 0);

        let later = worker(&env, &network)
            .run_once_at(now + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(later.anchored, 1);
        assert_eq!(
            env.stored_credential(credential.credential_id).await.anchor_status,
            AnchorStatus::Anchored
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let env = TestEnv::new().await;
        let network = Arc::new(MockFabricNetwork::new(LedgerConfig::instant()));
        let credential = env.issued(&env.student()).await;
        let max_retries = env.ctx.config.anchor_max_retries;
        network.fail_next(max_retries + 1);

        let mut now = Utc::now();
        for _ in 0..=max_retries {
            worker(&env, &network).run_once_at(now).await.unwrap();
            now += Duration::minutes(10);
        }

        let anchor = env.store.anchors().await.remove(0);
        assert_eq!(anchor.status, OutboxStatus::Failed);
        assert_eq!(anchor.retry_count, max_retries + 1);
        assert_eq!(
            env.stored_credential(credential.credential_id).await.anchor_status,
            AnchorStatus::Failed
        );
        assert_eq!(network.block_height(), 0);
    }

    #[tokio::test]
    async fn test_lease_hides_claimed_rows() {
        let env = TestEnv::new().await;
        env.issued(&env.student()).await;
        let now = Utc::now();

        let claimed = env
            .store
            .claim_due(now, env.ctx.config.anchor_lease, 10)
            .await
            .unwrap();
        assert_eq!(claimed.len(), 1);
        let again = env
            .store
            .claim_due(now, env.ctx.config.anchor_lease, 10)
            .await
            .unwrap();
        assert!(again.is_empty());

        let after_lease = now + Duration::from_std(env.ctx.config.anchor_lease).unwrap();
        assert_eq!(
            env.store
                .claim_due(after_lease, env.ctx.config.anchor_lease, 10)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_resubmission_reuses_transaction() {
        let env = TestEnv::new().await;
        let network = Arc::new(MockFabricNetwork::new(LedgerConfig::instant()));
        env.issued(&env.student()).await;
        let anchor = env.store.anchors().await.remove(0);

        // A worker that crashed after submitting leaves the row pending
        let first = network.submit(anchor.to_submission()).await.unwrap();
        let summary = worker(&env, &network).run_once_at(Utc::now()).await.unwrap();

        assert_eq!(summary.anchored, 1);
        assert_eq!(network.block_height(), 1);
        assert_eq!(
            env.store.anchors().await[0].tx_id.as_deref(),
            Some(first.tx_id.as_str())
        );
    }

    #[tokio::test]
    async fn test_retried_issue_reaches_ledger_before_verify() {
        let env = TestEnv::new().await;
        let network = Arc::new(MockFabricNetwork::new(LedgerConfig::instant()));
        let student = env.student();
        let credential = env.issued(&student).await;
        network.fail_next(1);
        let now = Utc::now();

        let first = worker(&env, &network).run_once_at(now).await.unwrap();
        assert_eq!(first.rescheduled, 1);

        let request = RequestVerificationUseCase::new(env.store.clone(), env.ctx.clone())
            .execute(&student, credential.credential_id, None)
            .await
            .unwrap()
            .request;
        DecideVerificationUseCase::new(env.store.clone(), env.ctx.clone())
            .execute(&env.registrar(), request.request_id, Decision::Approve, None)
            .await
            .unwrap();

        // The verify row is due but waits behind the backing-off issue row
        let blocked = worker(&env, &network).run_once_at(now).await.unwrap();
        assert_eq!(blocked.processed(), 0);
        assert_eq!(network.block_height(), 0);

        let later = now + Duration::seconds(5);
        assert_eq!(worker(&env, &network).run_once_at(later).await.unwrap().anchored, 1);
        assert_eq!(worker(&env, &network).run_once_at(later).await.unwrap().anchored, 1);

        let history = network.credential_history(credential.credential_id).await.unwrap();
        let operations: Vec<LedgerOperation> = history.iter().map(|r| r.operation).collect();
        assert_eq!(
            operations,
            vec![LedgerOperation::IssueCredential, LedgerOperation::VerifyCredential]
        );

        let stored = env.stored_credential(credential.credential_id).await;
        assert_eq!(stored.anchor_status, AnchorStatus::Anchored);
        assert_eq!(stored.ledger_tx_id.as_deref(), Some(history[1].tx_id.as_str()));
    }

    #[tokio::test]
    async fn test_policy_refusal_is_counted_and_retried() {
        let env = TestEnv::new().await;
        let network = Arc::new(MockFabricNetwork::new(LedgerConfig::instant()));
        env.issued(&env.student()).await;
        network.set_peer_online("UniversityMSP", false).await;
        network.set_peer_online("EmployerMSP", false).await;
        let now = Utc::now();

        let summary = worker(&env, &network).run_once_at(now).await.unwrap();
        assert_eq!(summary.rescheduled, 1);
        assert_eq!(summary.rejected, 1);
        assert_eq!(env.store.anchors().await[0].status, OutboxStatus::Pending);

        network.set_peer_online("UniversityMSP", true).await;
        let retried = worker(&env, &network)
            .run_once_at(now + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(retried.anchored, 1);
        assert_eq!(retried.rejected, 0);
    }
}
