//! In-memory credential store
//!
//! A single `RwLock` over all three tables gives the same all-or-nothing
//! commit and version checks as the PostgreSQL store. Used by tests and by
//! the `memory` storage backend.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use kernel::actor::UserRole;
use kernel::id::{CredentialId, LedgerAnchorId, OrganizationId, UserId, VerificationRequestId};
use kernel::pagination::{Page, PageQuery};
use notification::{InMemoryNotificationRepository, NotificationRepository};
use tokio::sync::RwLock;

use crate::domain::entity::{Credential, LedgerAnchor, VerificationRequest};
use crate::domain::repository::{
    AccountDirectory, AnchorOutbox, ChangeSet, CredentialFilter, CredentialRepository,
    CredentialUnitOfWork, InstitutionDirectory, RequestFilter, Write,
};
use crate::domain::service::analytics::{CredentialAnalytics, aggregate};
use crate::domain::value_object::{AnchorStatus, OutboxStatus};
use crate::error::{CredentialError, CredentialResult};

#[derive(Default)]
struct State {
    credentials: HashMap<CredentialId, Credential>,
    // Insertion order is creation order
    requests: Vec<VerificationRequest>,
    anchors: Vec<LedgerAnchor>,
}

impl State {
    fn request_mut(&mut self, id: VerificationRequestId) -> Option<&mut VerificationRequest> {
        self.requests.iter_mut().find(|r| r.request_id == id)
    }

    fn anchor_mut(&mut self, id: LedgerAnchorId) -> Option<&mut LedgerAnchor> {
        self.anchors.iter_mut().find(|a| a.anchor_id == id)
    }

    /// Reject the change set without touching anything
    fn check(&self, changes: &ChangeSet) -> CredentialResult<()> {
        match &changes.credential {
            Some(Write::Insert(c)) if self.credentials.contains_key(&c.credential_id) => {
                return Err(CredentialError::Internal("Duplicate credential id".to_string()));
            }
            Some(Write::Update(c)) => {
                let stored = self
                    .credentials
                    .get(&c.credential_id)
                    .ok_or(CredentialError::CredentialNotFound)?;
                if stored.version != c.version {
                    return Err(CredentialError::ConcurrentModification);
                }
            }
            _ => {}
        }

        let mut pending: HashSet<CredentialId> = self
            .requests
            .iter()
            .filter(|r| r.is_pending())
            .map(|r| r.credential_id)
            .collect();
        for write in &changes.requests {
            match write {
                Write::Insert(r) => {
                    if r.is_pending() && !pending.insert(r.credential_id) {
                        return Err(CredentialError::DuplicatePendingRequest);
                    }
                }
                Write::Update(r) => {
                    let stored = self
                        .requests
                        .iter()
                        .find(|s| s.request_id == r.request_id)
                        .ok_or(CredentialError::RequestNotFound)?;
                    if stored.version != r.version {
                        return Err(CredentialError::ConcurrentModification);
                    }
                    if stored.is_pending() && !r.is_pending() {
                        pending.remove(&r.credential_id);
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct InMemoryCredentialStore {
    state: Arc<RwLock<State>>,
    notifications: InMemoryNotificationRepository,
}

impl InMemoryCredentialStore {
    /// Notifications in committed change sets are written to `notifications`
    pub fn new(notifications: InMemoryNotificationRepository) -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            notifications,
        }
    }

    /// Every outbox row, oldest first
    pub async fn anchors(&self) -> Vec<LedgerAnchor> {
        self.state.read().await.anchors.clone()
    }

    pub async fn requests(&self) -> Vec<VerificationRequest> {
        self.state.read().await.requests.clone()
    }
}

impl CredentialRepository for InMemoryCredentialStore {
    async fn find_credential(&self, id: CredentialId) -> CredentialResult<Option<Credential>> {
        Ok(self.state.read().await.credentials.get(&id).cloned())
    }

    async fn list_credentials(
        &self,
        filter: &CredentialFilter,
        page: PageQuery,
    ) -> CredentialResult<Page<Credential>> {
        let state = self.state.read().await;
        let mut matching: Vec<Credential> = state
            .credentials
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.credential_id.cmp(&a.credential_id))
        });
        Ok(page.slice(&matching))
    }

    async fn find_request(
        &self,
        id: VerificationRequestId,
    ) -> CredentialResult<Option<VerificationRequest>> {
        Ok(self
            .state
            .read()
            .await
            .requests
            .iter()
            .find(|r| r.request_id == id)
            .cloned())
    }

    async fn find_pending_request(
        &self,
        credential_id: CredentialId,
    ) -> CredentialResult<Option<VerificationRequest>> {
        Ok(self
            .state
            .read()
            .await
            .requests
            .iter()
            .find(|r| r.credential_id == credential_id && r.is_pending())
            .cloned())
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
        page: PageQuery,
    ) -> CredentialResult<Page<VerificationRequest>> {
        let state = self.state.read().await;
        let matching: Vec<VerificationRequest> = state
            .requests
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        Ok(page.slice(&matching))
    }

    async fn find_past_expiry(
        &self,
        today: NaiveDate,
        limit: u32,
    ) -> CredentialResult<Vec<Credential>> {
        let state = self.state.read().await;
        let mut due: Vec<Credential> = state
            .credentials
            .values()
            .filter(|c| !c.status.is_terminal() && c.is_past_expiry(today))
            .cloned()
            .collect();
        due.sort_by_key(|c| c.expiry_date);
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn analytics(
        &self,
        institution_id: Option<OrganizationId>,
        months: u32,
        today: NaiveDate,
    ) -> CredentialResult<CredentialAnalytics> {
        let state = self.state.read().await;
        let in_scope = |id: OrganizationId| institution_id.is_none_or(|scope| scope == id);
        let credentials: Vec<Credential> = state
            .credentials
            .values()
            .filter(|c| in_scope(c.institution_id))
            .cloned()
            .collect();
        let requests: Vec<VerificationRequest> = state
            .requests
            .iter()
            .filter(|r| in_scope(r.institution_id))
            .cloned()
            .collect();
        Ok(aggregate(&credentials, &requests, months, today))
    }
}

impl CredentialUnitOfWork for InMemoryCredentialStore {
    async fn commit(&self, changes: ChangeSet) -> CredentialResult<()> {
        let mut state = self.state.write().await;
        state.check(&changes)?;

        match changes.credential {
            Some(Write::Insert(credential)) => {
                state.credentials.insert(credential.credential_id, credential);
            }
            Some(Write::Update(mut credential)) => {
                credential.version += 1;
                state.credentials.insert(credential.credential_id, credential);
            }
            None => {}
        }

        for write in changes.requests {
            match write {
                Write::Insert(request) => state.requests.push(request),
                Write::Update(mut request) => {
                    request.version += 1;
                    if let Some(stored) = state.request_mut(request.request_id) {
                        *stored = request;
                    }
                }
            }
        }

        // One row per (credential, operation); a repeat enqueue is a no-op
        if let Some(anchor) = changes.anchor {
            let exists = state.anchors.iter().any(|a| {
                a.credential_id == anchor.credential_id && a.operation == anchor.operation
            });
            if !exists {
                state.anchors.push(anchor);
            }
        }

        for notification in &changes.notifications {
            self.notifications
                .create(notification)
                .await
                .map_err(|e| CredentialError::Internal(e.to_string()))?;
        }
        Ok(())
    }
}

impl AnchorOutbox for InMemoryCredentialStore {
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        lease: Duration,
        limit: u32,
    ) -> CredentialResult<Vec<LedgerAnchor>> {
        let lease = chrono::Duration::from_std(lease)
            .map_err(|e| CredentialError::Internal(e.to_string()))?;
        let mut state = self.state.write().await;

        // Rows are in creation order, so the first pending row per credential
        // is the only one that may go out
        let mut blocked: HashSet<CredentialId> = HashSet::new();
        let mut claimed = Vec::new();
        for anchor in state.anchors.iter_mut() {
            if claimed.len() >= limit as usize {
                break;
            }
            if anchor.status != OutboxStatus::Pending {
                continue;
            }
            if !blocked.insert(anchor.credential_id) || !anchor.is_due(now) {
                continue;
            }
            anchor.locked_until = Some(now + lease);
            claimed.push(anchor.clone());
        }
        Ok(claimed)
    }

    async fn record_attempt(&self, anchor: &LedgerAnchor) -> CredentialResult<Option<Credential>> {
        let mut state = self.state.write().await;
        let stored = state
            .anchor_mut(anchor.anchor_id)
            .ok_or_else(|| CredentialError::Internal("Unknown ledger anchor".to_string()))?;
        // Another worker already finished it after our lease ran out
        if stored.status != OutboxStatus::Pending {
            return Ok(None);
        }
        *stored = anchor.clone();

        let anchor_status = match anchor.status {
            OutboxStatus::Pending => return Ok(None),
            OutboxStatus::Anchored => {
                let more_pending = state.anchors.iter().any(|a| {
                    a.credential_id == anchor.credential_id && a.status == OutboxStatus::Pending
                });
                if more_pending {
                    AnchorStatus::Pending
                } else {
                    AnchorStatus::Anchored
                }
            }
            OutboxStatus::Failed => AnchorStatus::Failed,
        };

        let Some(credential) = state.credentials.get_mut(&anchor.credential_id) else {
            return Ok(None);
        };
        if anchor.tx_id.is_some() {
            credential.ledger_tx_id = anchor.tx_id.clone();
        }
        credential.anchor_status = anchor_status;
        credential.version += 1;
        credential.updated_at = anchor.updated_at;
        Ok(Some(credential.clone()))
    }

    async fn anchors_for(&self, credential_id: CredentialId) -> CredentialResult<Vec<LedgerAnchor>> {
        Ok(self
            .state
            .read()
            .await
            .anchors
            .iter()
            .filter(|a| a.credential_id == credential_id)
            .cloned()
            .collect())
    }
}

/// Fixed institutions and accounts, for tests and the `memory` backend
#[derive(Clone, Default)]
pub struct StaticCredentialDirectory {
    institutions: Arc<RwLock<HashSet<OrganizationId>>>,
    accounts: Arc<RwLock<HashMap<UserId, UserRole>>>,
}

impl StaticCredentialDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, organization_id: OrganizationId) {
        self.institutions.write().await.insert(organization_id);
    }

    pub async fn insert_account(&self, user_id: UserId, role: UserRole) {
        self.accounts.write().await.insert(user_id, role);
    }
}

impl InstitutionDirectory for StaticCredentialDirectory {
    async fn is_institution(&self, organization_id: OrganizationId) -> CredentialResult<bool> {
        Ok(self.institutions.read().await.contains(&organization_id))
    }
}

impl AccountDirectory for StaticCredentialDirectory {
    async fn account_role(&self, user_id: UserId) -> CredentialResult<Option<UserRole>> {
        Ok(self.accounts.read().await.get(&user_id).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::NewCredential;
    use crate::domain::value_object::{CredentialStatus, CredentialType};
    use ledger::LedgerOperation;

    fn credential() -> Credential {
        Credential::upload(
            UserId::new(),
            OrganizationId::new(),
            NewCredential {
                title: "Nursing License".to_string(),
                credential_type: CredentialType::License,
                description: None,
                issue_date: NaiveDate::from_ymd_opt(2023, 9, 1).unwrap(),
                expiry_date: Some(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()),
                document_hash: None,
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_stale_update_is_rejected_atomically() {
        let store = InMemoryCredentialStore::new(InMemoryNotificationRepository::new());
        let original = credential();
        store
            .commit(ChangeSet::new().insert_credential(original.clone()))
            .await
            .unwrap();

        let mut first = original.clone();
        first.status = CredentialStatus::Verified;
        store
            .commit(ChangeSet::new().update_credential(first))
            .await
            .unwrap();

        // Same read version, so it lost the race
        let mut second = original.clone();
        second.status = CredentialStatus::Revoked;
        let anchor = LedgerAnchor::new(
            second.credential_id,
            LedgerOperation::RevokeCredential,
            "00".repeat(32),
            "registrar",
            5,
            Utc::now(),
        );
        let result = store
            .commit(ChangeSet::new().update_credential(second).enqueue_anchor(anchor))
            .await;
        assert!(matches!(result, Err(CredentialError::ConcurrentModification)));

        let stored = store.find_credential(original.credential_id).await.unwrap().unwrap();
        assert_eq!(stored.status, CredentialStatus::Verified);
        assert_eq!(stored.version, 1);
        assert!(store.anchors().await.is_empty());
    }

    #[tokio::test]
    async fn test_one_pending_request_per_credential() {
        let store = InMemoryCredentialStore::new(InMemoryNotificationRepository::new());
        let c = credential();
        store.commit(ChangeSet::new().insert_credential(c.clone())).await.unwrap();

        let request = |now| {
            VerificationRequest::new(c.credential_id, c.owner_id, c.institution_id, None, now)
                .unwrap()
        };
        store
            .commit(ChangeSet::new().insert_request(request(Utc::now())))
            .await
            .unwrap();
        assert!(matches!(
            store
                .commit(ChangeSet::new().insert_request(request(Utc::now())))
                .await,
            Err(CredentialError::DuplicatePendingRequest)
        ));
    }

    #[tokio::test]
    async fn test_past_expiry_skips_terminal() {
        let store = InMemoryCredentialStore::new(InMemoryNotificationRepository::new());
        let live = credential();
        let mut revoked = credential();
        revoked.revoke("Withdrawn", Utc::now()).unwrap();
        store.commit(ChangeSet::new().insert_credential(live.clone())).await.unwrap();
        store.commit(ChangeSet::new().insert_credential(revoked)).await.unwrap();

        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let due = store.find_past_expiry(today, 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].credential_id, live.credential_id);
    }

    fn anchor(credential: &Credential, operation: LedgerOperation, at: DateTime<Utc>) -> LedgerAnchor {
        LedgerAnchor::new(
            credential.credential_id,
            operation,
            "00".repeat(32),
            "registrar",
            5,
            at,
        )
    }

    #[tokio::test]
    async fn test_request_insert_checks_credential_version() {
        let store = InMemoryCredentialStore::new(InMemoryNotificationRepository::new());
        let c = credential();
        store.commit(ChangeSet::new().insert_credential(c.clone())).await.unwrap();

        let mut revoked = c.clone();
        revoked.revoke("Withdrawn", Utc::now()).unwrap();
        store
            .commit(ChangeSet::new().update_credential(revoked))
            .await
            .unwrap();

        // Read before the revoke committed
        let request =
            VerificationRequest::new(c.credential_id, c.owner_id, c.institution_id, None, Utc::now())
                .unwrap();
        let result = store
            .commit(
                ChangeSet::new()
                    .update_credential(c.clone())
                    .insert_request(request),
            )
            .await;
        assert!(matches!(result, Err(CredentialError::ConcurrentModification)));
        assert!(store.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_claim_waits_for_older_anchor() {
        let store = InMemoryCredentialStore::new(InMemoryNotificationRepository::new());
        let c = credential();
        let now = Utc::now();
        store.commit(ChangeSet::new().insert_credential(c.clone())).await.unwrap();

        let mut issue = anchor(&c, LedgerOperation::IssueCredential, now);
        issue.next_attempt_at = now + chrono::Duration::seconds(10);
        let verify = anchor(&c, LedgerOperation::VerifyCredential, now);
        store.commit(ChangeSet::new().enqueue_anchor(issue.clone())).await.unwrap();
        store.commit(ChangeSet::new().enqueue_anchor(verify.clone())).await.unwrap();

        let lease = Duration::from_secs(30);
        // The older row is backing off, the newer one has to wait for it
        assert!(store.claim_due(now, lease, 10).await.unwrap().is_empty());

        let later = now + chrono::Duration::seconds(10);
        let claimed = store.claim_due(later, lease, 10).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].anchor_id, issue.anchor_id);

        let mut done = claimed[0].clone();
        done.record_success("aa".repeat(32), later);
        store.record_attempt(&done).await.unwrap();

        let claimed = store.claim_due(later, lease, 10).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].anchor_id, verify.anchor_id);
    }

    #[tokio::test]
    async fn test_record_attempt_leaves_finished_row() {
        let store = InMemoryCredentialStore::new(InMemoryNotificationRepository::new());
        let c = credential();
        let now = Utc::now();
        store.commit(ChangeSet::new().insert_credential(c.clone())).await.unwrap();
        store
            .commit(ChangeSet::new().enqueue_anchor(anchor(&c, LedgerOperation::IssueCredential, now)))
            .await
            .unwrap();

        let claimed = store.claim_due(now, Duration::from_secs(30), 10).await.unwrap();
        let mut winner = claimed[0].clone();
        winner.record_success("aa".repeat(32), now);
        assert!(store.record_attempt(&winner).await.unwrap().is_some());

        // A worker whose lease ran out reports a failure afterwards
        let mut stale = claimed[0].clone();
        stale.record_failure("timeout", &Default::default(), now);
        assert!(store.record_attempt(&stale).await.unwrap().is_none());

        let stored = store.anchors().await.remove(0);
        assert_eq!(stored.status, OutboxStatus::Anchored);
        assert_eq!(stored.tx_id.as_deref(), Some("aa".repeat(32).as_str()));
        let credential = store.find_credential(c.credential_id).await.unwrap().unwrap();
        assert_eq!(credential.anchor_status, AnchorStatus::Anchored);
    }
}
