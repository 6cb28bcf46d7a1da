//! Credential entity

use chrono::{DateTime, NaiveDate, Utc};
use kernel::id::{CredentialId, OrganizationId, UserId};
use ledger::LedgerOperation;
use platform::crypto::sha256_hex;

use crate::domain::value_object::{AnchorStatus, CredentialStatus, CredentialType, DocumentHash};
use crate::error::{CredentialError, CredentialResult};

const TITLE_MAX_LENGTH: usize = 200;
const DESCRIPTION_MAX_LENGTH: usize = 2000;

/// Validated input shared by upload and issue
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub title: String,
    pub credential_type: CredentialType,
    pub description: Option<String>,
    pub issue_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub document_hash: Option<DocumentHash>,
}

impl NewCredential {
    pub fn validate(mut self) -> CredentialResult<Self> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() || self.title.chars().count() > TITLE_MAX_LENGTH {
            return Err(CredentialError::Validation(format!(
                "title must be 1-{TITLE_MAX_LENGTH} characters"
            )));
        }

        self.description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if self
            .description
            .as_ref()
            .is_some_and(|d| d.chars().count() > DESCRIPTION_MAX_LENGTH)
        {
            return Err(CredentialError::Validation(format!(
                "description must be at most {DESCRIPTION_MAX_LENGTH} characters"
            )));
        }

        if self.expiry_date.is_some_and(|expiry| expiry <= self.issue_date) {
            return Err(CredentialError::Validation(
                "expiryDate must be after issueDate".to_string(),
            ));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub credential_id: CredentialId,
    pub owner_id: UserId,
    pub institution_id: OrganizationId,
    pub title: String,
    pub credential_type: CredentialType,
    pub description: Option<String>,
    pub issue_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub document_hash: Option<DocumentHash>,
    pub status: CredentialStatus,
    pub anchor_status: AnchorStatus,
    /// Latest anchoring transaction
    pub ledger_tx_id: Option<String>,
    pub verified_by: Option<UserId>,
    pub verified_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<String>,
    /// Optimistic concurrency token, bumped by every committed write
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    fn from_input(
        owner_id: UserId,
        institution_id: OrganizationId,
        input: NewCredential,
        status: CredentialStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            credential_id: CredentialId::new(),
            owner_id,
            institution_id,
            title: input.title,
            credential_type: input.credential_type,
            description: input.description,
            issue_date: input.issue_date,
            expiry_date: input.expiry_date,
            document_hash: input.document_hash,
            status,
            anchor_status: AnchorStatus::None,
            ledger_tx_id: None,
            verified_by: None,
            verified_at: None,
            revoked_reason: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Student upload, waiting for the institution
    pub fn upload(
        owner_id: UserId,
        institution_id: OrganizationId,
        input: NewCredential,
        now: DateTime<Utc>,
    ) -> Self {
        Self::from_input(owner_id, institution_id, input, CredentialStatus::Pending, now)
    }

    /// Issued by the institution; anchoring starts immediately
    pub fn issue(
        owner_id: UserId,
        institution_id: OrganizationId,
        input: NewCredential,
        now: DateTime<Utc>,
    ) -> Self {
        let mut credential =
            Self::from_input(owner_id, institution_id, input, CredentialStatus::Issued, now);
        credential.anchor_status = AnchorStatus::Pending;
        credential
    }

    /// Expired by date, whatever the stored status says
    pub fn is_past_expiry(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < today)
    }

    fn transition(&mut self, next: CredentialStatus, now: DateTime<Utc>) -> CredentialResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(CredentialError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    pub fn verify(&mut self, verified_by: UserId, now: DateTime<Utc>) -> CredentialResult<()> {
        if self.is_past_expiry(now.date_naive()) {
            return Err(CredentialError::CredentialExpired);
        }
        self.transition(CredentialStatus::Verified, now)?;
        self.verified_by = Some(verified_by);
        self.verified_at = Some(now);
        self.anchor_status = AnchorStatus::Pending;
        Ok(())
    }

    pub fn revoke(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> CredentialResult<()> {
        self.transition(CredentialStatus::Revoked, now)?;
        self.revoked_reason = Some(reason.into());
        self.anchor_status = AnchorStatus::Pending;
        Ok(())
    }

    /// Expiry is not anchored; the ledger keeps the original dates.
    pub fn expire(&mut self, now: DateTime<Utc>) -> CredentialResult<()> {
        self.transition(CredentialStatus::Expired, now)
    }

    /// Digest written to the ledger for `operation`
    pub fn payload_hash(&self, operation: LedgerOperation) -> String {
        let canonical = format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            self.credential_id,
            operation.code(),
            self.owner_id,
            self.institution_id,
            self.credential_type,
            self.issue_date,
            self.expiry_date.map(|d| d.to_string()).unwrap_or_default(),
            self.document_hash
                .as_ref()
                .map(DocumentHash::as_str)
                .unwrap_or_default(),
        );
        sha256_hex(canonical.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn input() -> NewCredential {
        NewCredential {
            title: "  BSc Computer Science ".to_string(),
            credential_type: CredentialType::Degree,
            description: Some("   ".to_string()),
            issue_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            expiry_date: None,
            document_hash: None,
        }
    }

    #[test]
    fn test_validate_trims_and_checks_dates() {
        let valid = input().validate().unwrap();
        assert_eq!(valid.title, "BSc Computer Science");
        assert_eq!(valid.description, None);

        let mut bad = input();
        bad.expiry_date = Some(bad.issue_date);
        assert!(matches!(bad.validate(), Err(CredentialError::Validation(_))));

        let mut empty = input();
        empty.title = "   ".to_string();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_upload_vs_issue() {
        let now = Utc::now();
        let uploaded = Credential::upload(UserId::new(), OrganizationId::new(), input(), now);
        assert_eq!(uploaded.status, CredentialStatus::Pending);
        assert_eq!(uploaded.anchor_status, AnchorStatus::None);

        let issued = Credential::issue(UserId::new(), OrganizationId::new(), input(), now);
        assert_eq!(issued.status, CredentialStatus::Issued);
        assert_eq!(issued.anchor_status, AnchorStatus::Pending);
    }

    #[test]
    fn test_verify_then_revoke() {
        let now = Utc::now();
        let verifier = UserId::new();
        let mut credential = Credential::upload(UserId::new(), OrganizationId::new(), input(), now);

        credential.verify(verifier, now).unwrap();
        assert_eq!(credential.status, CredentialStatus::Verified);
        assert_eq!(credential.verified_by, Some(verifier));

        assert!(matches!(
            credential.verify(verifier, now),
            Err(CredentialError::InvalidTransition { .. })
        ));

        credential.revoke("Issued in error", now).unwrap();
        assert_eq!(credential.status, CredentialStatus::Revoked);
        assert!(credential.expire(now).is_err());
    }

    #[test]
    fn test_verify_past_expiry() {
        let now = Utc::now();
        let mut expiring = input();
        expiring.issue_date = (now - Duration::days(30)).date_naive();
        expiring.expiry_date = Some((now - Duration::days(1)).date_naive());
        let mut credential = Credential::upload(UserId::new(), OrganizationId::new(), expiring, now);

        assert!(matches!(
            credential.verify(UserId::new(), now),
            Err(CredentialError::CredentialExpired)
        ));
        assert_eq!(credential.status, CredentialStatus::Pending);
    }

    #[test]
    fn test_payload_hash_depends_on_operation() {
        let credential = Credential::issue(UserId::new(), OrganizationId::new(), input(), Utc::now());
        let issue = credential.payload_hash(LedgerOperation::IssueCredential);
        assert_eq!(issue.len(), 64);
        assert_eq!(issue, credential.payload_hash(LedgerOperation::IssueCredential));
        assert_ne!(issue, credential.payload_hash(LedgerOperation::RevokeCredential));
    }
}
