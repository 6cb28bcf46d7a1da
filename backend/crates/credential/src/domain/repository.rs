//! Repository traits
//!
//! Reads go through [`CredentialRepository`]. Every write of the verification
//! workflow goes through [`CredentialUnitOfWork::commit`] as one
//! [`ChangeSet`], so a credential, its requests, the ledger outbox row and
//! the notifications describing the change are stored together or not at
//! all.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use kernel::actor::UserRole;
use kernel::id::{CredentialId, OrganizationId, UserId, VerificationRequestId};
use kernel::pagination::{Page, PageQuery};
use notification::Notification;

use crate::domain::entity::{Credential, LedgerAnchor, VerificationRequest};
use crate::domain::service::analytics::CredentialAnalytics;
use crate::domain::value_object::{CredentialStatus, CredentialType, RequestStatus};
use crate::error::CredentialResult;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialFilter {
    pub owner_id: Option<UserId>,
    pub institution_id: Option<OrganizationId>,
    pub status: Option<CredentialStatus>,
    pub credential_type: Option<CredentialType>,
}

impl CredentialFilter {
    pub fn matches(&self, credential: &Credential) -> bool {
        self.owner_id.is_none_or(|id| credential.owner_id == id)
            && self.institution_id.is_none_or(|id| credential.institution_id == id)
            && self.status.is_none_or(|s| credential.status == s)
            && self.credential_type.is_none_or(|t| credential.credential_type == t)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub institution_id: Option<OrganizationId>,
    pub requested_by: Option<UserId>,
    pub credential_id: Option<CredentialId>,
    pub status: Option<RequestStatus>,
}

impl RequestFilter {
    pub fn matches(&self, request: &VerificationRequest) -> bool {
        self.institution_id.is_none_or(|id| request.institution_id == id)
            && self.requested_by.is_none_or(|id| request.requested_by == id)
            && self.credential_id.is_none_or(|id| request.credential_id == id)
            && self.status.is_none_or(|s| request.status == s)
    }
}

/// Insert a new row, or update one read at `version`
#[derive(Debug, Clone)]
pub enum Write<T> {
    Insert(T),
    Update(T),
}

impl<T> Write<T> {
    pub fn entity(&self) -> &T {
        match self {
            Write::Insert(e) | Write::Update(e) => e,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub credential: Option<Write<Credential>>,
    pub requests: Vec<Write<VerificationRequest>>,
    pub anchor: Option<LedgerAnchor>,
    pub notifications: Vec<Notification>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(Write::Insert(credential));
        self
    }

    pub fn update_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(Write::Update(credential));
        self
    }

    pub fn insert_request(mut self, request: VerificationRequest) -> Self {
        self.requests.push(Write::Insert(request));
        self
    }

    pub fn update_request(mut self, request: VerificationRequest) -> Self {
        self.requests.push(Write::Update(request));
        self
    }

    pub fn enqueue_anchor(mut self, anchor: LedgerAnchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn notify(mut self, notification: Notification) -> Self {
        self.notifications.push(notification);
        self
    }
}

#[trait_variant::make(CredentialRepository: Send)]
pub trait LocalCredentialRepository {
    async fn find_credential(&self, id: CredentialId) -> CredentialResult<Option<Credential>>;

    /// Newest first
    async fn list_credentials(
        &self,
        filter: &CredentialFilter,
        page: PageQuery,
    ) -> CredentialResult<Page<Credential>>;

    async fn find_request(
        &self,
        id: VerificationRequestId,
    ) -> CredentialResult<Option<VerificationRequest>>;

    /// The open request for a credential, if any (at most one exists)
    async fn find_pending_request(
        &self,
        credential_id: CredentialId,
    ) -> CredentialResult<Option<VerificationRequest>>;

    /// Oldest first, the order an institution works its queue in
    async fn list_requests(
        &self,
        filter: &RequestFilter,
        page: PageQuery,
    ) -> CredentialResult<Page<VerificationRequest>>;

    /// Non-terminal credentials whose expiry date is before `today`
    async fn find_past_expiry(
        &self,
        today: NaiveDate,
        limit: u32,
    ) -> CredentialResult<Vec<Credential>>;

    async fn analytics(
        &self,
        institution_id: Option<OrganizationId>,
        months: u32,
        today: NaiveDate,
    ) -> CredentialResult<CredentialAnalytics>;
}

#[trait_variant::make(CredentialUnitOfWork: Send)]
pub trait LocalCredentialUnitOfWork {
    /// Apply all writes atomically.
    ///
    /// Fails with `ConcurrentModification` when an updated row no longer has
    /// the version it was read at, and with `DuplicatePendingRequest` when a
    /// second open request is inserted for the same credential.
    async fn commit(&self, changes: ChangeSet) -> CredentialResult<()>;
}

#[trait_variant::make(AnchorOutbox: Send)]
pub trait LocalAnchorOutbox {
    /// Lease up to `limit` due rows for `lease`. Leased rows are invisible to
    /// other workers until the lease expires. A row is only claimable while
    /// no older pending row exists for the same credential, so each
    /// credential's operations reach the ledger in the order they were
    /// committed.
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        lease: Duration,
        limit: u32,
    ) -> CredentialResult<Vec<LedgerAnchor>>;

    /// Persist the outcome of one attempt. For a final outcome (anchored or
    /// failed) the credential's anchor fields are updated in the same
    /// transaction and the updated credential is returned. A row that is no
    /// longer pending is left alone and `None` is returned.
    async fn record_attempt(&self, anchor: &LedgerAnchor) -> CredentialResult<Option<Credential>>;

    async fn anchors_for(&self, credential_id: CredentialId) -> CredentialResult<Vec<LedgerAnchor>>;
}

/// Organizations allowed to receive credentials
#[trait_variant::make(InstitutionDirectory: Send)]
pub trait LocalInstitutionDirectory {
    async fn is_institution(&self, organization_id: OrganizationId) -> CredentialResult<bool>;
}

/// Registered accounts, for checking who a credential is issued to
#[trait_variant::make(AccountDirectory: Send)]
pub trait LocalAccountDirectory {
    /// `None` when no account exists
    async fn account_role(&self, user_id: UserId) -> CredentialResult<Option<UserRole>>;
}

/// Every lookup the credential routes make outside their own tables
pub trait CredentialDirectory: InstitutionDirectory + AccountDirectory + Send + Sync + 'static {}

impl<T> CredentialDirectory for T where
    T: InstitutionDirectory + AccountDirectory + Send + Sync + 'static
{
}

/// One backing store for all credential tables
pub trait CredentialStore:
    CredentialRepository + CredentialUnitOfWork + AnchorOutbox + Send + Sync + 'static
{
}

impl<T> CredentialStore for T where
    T: CredentialRepository + CredentialUnitOfWork + AnchorOutbox + Send + Sync + 'static
{
}
