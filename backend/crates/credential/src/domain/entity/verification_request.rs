//! Verification request entity

use chrono::{DateTime, Utc};
use kernel::id::{CredentialId, OrganizationId, UserId, VerificationRequestId};

use crate::domain::value_object::RequestStatus;
use crate::error::{CredentialError, CredentialResult};

const MESSAGE_MAX_LENGTH: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    pub request_id: VerificationRequestId,
    pub credential_id: CredentialId,
    pub requested_by: UserId,
    /// Institution expected to decide
    pub institution_id: OrganizationId,
    pub status: RequestStatus,
    pub message: Option<String>,
    pub decision_reason: Option<String>,
    pub decided_by: Option<UserId>,
    pub decided_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VerificationRequest {
    pub fn new(
        credential_id: CredentialId,
        requested_by: UserId,
        institution_id: OrganizationId,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> CredentialResult<Self> {
        let message = message.map(|m| m.trim().to_string()).filter(|m| !m.is_empty());
        if message
            .as_ref()
            .is_some_and(|m| m.chars().count() > MESSAGE_MAX_LENGTH)
        {
            return Err(CredentialError::Validation(format!(
                "message must be at most {MESSAGE_MAX_LENGTH} characters"
            )));
        }

        Ok(Self {
            request_id: VerificationRequestId::new(),
            credential_id,
            requested_by,
            institution_id,
            status: RequestStatus::Pending,
            message,
            decision_reason: None,
            decided_by: None,
            decided_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    fn decide(
        &mut self,
        outcome: RequestStatus,
        decided_by: Option<UserId>,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> CredentialResult<()> {
        if !self.is_pending() {
            return Err(CredentialError::DecisionConflict(self.status));
        }
        self.status = outcome;
        self.decided_by = decided_by;
        self.decision_reason = reason;
        self.decided_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn approve(
        &mut self,
        decided_by: UserId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> CredentialResult<()> {
        self.decide(RequestStatus::Approved, Some(decided_by), reason, now)
    }

    /// `decided_by` is `None` when the system closes the request (expiry)
    pub fn reject(
        &mut self,
        decided_by: Option<UserId>,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> CredentialResult<()> {
        self.decide(RequestStatus::Rejected, decided_by, Some(reason.into()), now)
    }

    /// Seconds between opening and decision
    pub fn decision_secs(&self) -> Option<i64> {
        self.decided_at
            .map(|decided| (decided - self.created_at).num_seconds())
    }
}
