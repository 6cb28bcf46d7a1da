//! Verification workflow rules
//!
//! Pure functions over a credential and its request. They mutate both in
//! memory and report what has to be committed; persistence happens in the
//! application layer in a single unit of work.

use chrono::{DateTime, Utc};
use kernel::id::UserId;
use ledger::LedgerOperation;
use serde::Deserialize;

use crate::domain::entity::{Credential, VerificationRequest};
use crate::domain::value_object::RequestStatus;
use crate::error::{CredentialError, CredentialResult};

pub const DEFAULT_REJECTION_REASON: &str = "Verification request rejected";
pub const EXPIRED_REJECTION_REASON: &str = "Credential expired before a decision was made";
pub const REVOKED_REJECTION_REASON: &str = "Credential was revoked";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub const fn resulting_status(&self) -> RequestStatus {
        match self {
            Decision::Approve => RequestStatus::Approved,
            Decision::Reject => RequestStatus::Rejected,
        }
    }
}

/// What a decision changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOutcome {
    /// Both documents changed. `anchor` is `None` when the credential was
    /// already terminal and only the request was closed.
    Applied { anchor: Option<LedgerOperation> },
    /// Same decision as before; nothing to write
    AlreadyDecided,
}

/// Apply `decision` to a request and its credential.
///
/// - repeating the recorded decision is a no-op
/// - the opposite decision is a conflict
/// - approving moves the credential to `verified`
/// - rejecting moves it to `revoked` with the rejection reason
pub fn apply_decision(
    credential: &mut Credential,
    request: &mut VerificationRequest,
    decision: Decision,
    decided_by: UserId,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> CredentialResult<DecisionOutcome> {
    if request.credential_id != credential.credential_id {
        return Err(CredentialError::Internal(
            "Request does not belong to credential".to_string(),
        ));
    }

    if !request.is_pending() {
        return if request.status == decision.resulting_status() {
            Ok(DecisionOutcome::AlreadyDecided)
        } else {
            Err(CredentialError::DecisionConflict(request.status))
        };
    }

    let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());

    match decision {
        Decision::Approve => {
            credential.verify(decided_by, now)?;
            request.approve(decided_by, reason, now)?;
            Ok(DecisionOutcome::Applied {
                anchor: Some(LedgerOperation::VerifyCredential),
            })
        }
        Decision::Reject => {
            let reason = reason.unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string());
            let anchor = if credential.status.is_terminal() {
                None
            } else {
                credential.revoke(reason.clone(), now)?;
                Some(LedgerOperation::RevokeCredential)
            };
            request.reject(Some(decided_by), reason, now)?;
            Ok(DecisionOutcome::Applied { anchor })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::NewCredential;
    use crate::domain::value_object::{AnchorStatus, CredentialStatus, CredentialType};
    use chrono::NaiveDate;
    use kernel::id::OrganizationId;

    fn pair() -> (Credential, VerificationRequest) {
        let now = Utc::now();
        let owner = UserId::new();
        let institution = OrganizationId::new();
        let credential = Credential::upload(
            owner,
            institution,
            NewCredential {
                title: "Transcript".to_string(),
                credential_type: CredentialType::Transcript,
                description: None,
                issue_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                expiry_date: None,
                document_hash: None,
            },
            now,
        );
        let request =
            VerificationRequest::new(credential.credential_id, owner, institution, None, now)
                .unwrap();
        (credential, request)
    }

    #[test]
    fn test_approve() {
        let (mut credential, mut request) = pair();
        let registrar = UserId::new();

        let outcome = apply_decision(
            &mut credential,
            &mut request,
            Decision::Approve,
            registrar,
            Some("  ".to_string()),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(
            outcome,
            DecisionOutcome::Applied {
                anchor: Some(LedgerOperation::VerifyCredential)
            }
        );
        assert_eq!(credential.status, CredentialStatus::Verified);
        assert_eq!(credential.anchor_status, AnchorStatus::Pending);
        assert_eq!(request.status, RequestStatus::Approved);
        assert_eq!(request.decision_reason, None);
    }

    #[test]
    fn test_reject_revokes_with_reason() {
        let (mut credential, mut request) = pair();

        apply_decision(
            &mut credential,
            &mut request,
            Decision::Reject,
            UserId::new(),
            Some("Signature mismatch".to_string()),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(credential.status, CredentialStatus::Revoked);
        assert_eq!(credential.revoked_reason.as_deref(), Some("Signature mismatch"));
        assert_eq!(request.decision_reason.as_deref(), Some("Signature mismatch"));
    }

    #[test]
    fn test_same_decision_twice_is_noop_opposite_conflicts() {
        let (mut credential, mut request) = pair();
        let registrar = UserId::new();
        apply_decision(&mut credential, &mut request, Decision::Approve, registrar, None, Utc::now())
            .unwrap();
        let snapshot = (credential.clone(), request.clone());

        let again = apply_decision(
            &mut credential,
            &mut request,
            Decision::Approve,
            registrar,
            None,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(again, DecisionOutcome::AlreadyDecided);
        assert_eq!((credential.clone(), request.clone()), snapshot);

        let opposite = apply_decision(
            &mut credential,
            &mut request,
            Decision::Reject,
            registrar,
            None,
            Utc::now(),
        );
        assert!(matches!(
            opposite,
            Err(CredentialError::DecisionConflict(RequestStatus::Approved))
        ));
    }

    #[test]
    fn test_reject_on_terminal_credential_only_closes_request() {
        let (mut credential, mut request) = pair();
        credential.revoke("Withdrawn", Utc::now()).unwrap();

        let outcome = apply_decision(
            &mut credential,
            &mut request,
            Decision::Reject,
            UserId::new(),
            None,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(outcome, DecisionOutcome::Applied { anchor: None });
        assert_eq!(credential.revoked_reason.as_deref(), Some("Withdrawn"));
        assert_eq!(request.decision_reason.as_deref(), Some(DEFAULT_REJECTION_REASON));
    }

    #[test]
    fn test_approve_on_revoked_credential_fails_without_side_effects() {
        let (mut credential, mut request) = pair();
        credential.revoke("Withdrawn", Utc::now()).unwrap();

        let result = apply_decision(
            &mut credential,
            &mut request,
            Decision::Approve,
            UserId::new(),
            None,
            Utc::now(),
        );
        assert!(matches!(result, Err(CredentialError::InvalidTransition { .. })));
        assert!(request.is_pending());
    }
}
