//! API DTOs

use chrono::{DateTime, NaiveDate, Utc};
use kernel::id::{CredentialId, LedgerAnchorId, OrganizationId, UserId, VerificationRequestId};
use kernel::pagination::PageQuery;
use ledger::presentation::dto::TransactionResponse;
use serde::{Deserialize, Serialize};

use crate::application::{CredentialDraft, DecisionOutput, VerificationView};
use crate::domain::entity::{Credential, LedgerAnchor, VerificationRequest};
use crate::domain::repository::{CredentialFilter, RequestFilter};
use crate::domain::service::workflow::Decision;
use crate::domain::value_object::{
    AnchorStatus, CredentialStatus, CredentialType, OutboxStatus, RequestStatus,
};

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialBody {
    pub title: String,
    pub credential_type: CredentialType,
    pub description: Option<String>,
    pub issue_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    /// SHA-256 hex of the document; the document itself is not stored
    pub document_hash: Option<String>,
}

impl From<CredentialBody> for CredentialDraft {
    fn from(body: CredentialBody) -> Self {
        Self {
            title: body.title,
            credential_type: body.credential_type,
            description: body.description,
            issue_date: body.issue_date,
            expiry_date: body.expiry_date,
            document_hash: body.document_hash,
        }
    }
}

/// POST /api/credentials
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCredentialRequest {
    pub institution_id: OrganizationId,
    #[serde(flatten)]
    pub credential: CredentialBody,
}

/// POST /api/credentials/issue
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCredentialRequest {
    pub owner_id: UserId,
    #[serde(flatten)]
    pub credential: CredentialBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCredentialsQuery {
    pub owner_id: Option<UserId>,
    pub institution_id: Option<OrganizationId>,
    pub status: Option<CredentialStatus>,
    pub credential_type: Option<CredentialType>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListCredentialsQuery {
    pub fn filter(&self) -> CredentialFilter {
        CredentialFilter {
            owner_id: self.owner_id,
            institution_id: self.institution_id,
            status: self.status,
            credential_type: self.credential_type,
        }
    }

    pub fn page(&self) -> PageQuery {
        PageQuery {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestVerificationBody {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequestsQuery {
    pub status: Option<RequestStatus>,
    pub credential_id: Option<CredentialId>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListRequestsQuery {
    pub fn filter(&self) -> RequestFilter {
        RequestFilter {
            status: self.status,
            credential_id: self.credential_id,
            ..Default::default()
        }
    }

    pub fn page(&self) -> PageQuery {
        PageQuery {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DecisionBody {
    pub decision: Decision,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RevokeBody {
    pub reason: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub institution_id: Option<OrganizationId>,
    pub months: Option<u32>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialResponse {
    pub credential_id: CredentialId,
    pub owner_id: UserId,
    pub institution_id: OrganizationId,
    pub title: String,
    pub credential_type: CredentialType,
    pub description: Option<String>,
    pub issue_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub document_hash: Option<String>,
    pub status: CredentialStatus,
    pub anchor_status: AnchorStatus,
    pub ledger_tx_id: Option<String>,
    pub verified_by: Option<UserId>,
    pub verified_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Credential> for CredentialResponse {
    fn from(c: Credential) -> Self {
        Self {
            credential_id: c.credential_id,
            owner_id: c.owner_id,
            institution_id: c.institution_id,
            title: c.title,
            credential_type: c.credential_type,
            description: c.description,
            issue_date: c.issue_date,
            expiry_date: c.expiry_date,
            document_hash: c.document_hash.as_ref().map(|h| h.as_str().to_string()),
            status: c.status,
            anchor_status: c.anchor_status,
            ledger_tx_id: c.ledger_tx_id,
            verified_by: c.verified_by,
            verified_at: c.verified_at,
            revoked_reason: c.revoked_reason,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequestResponse {
    pub request_id: VerificationRequestId,
    pub credential_id: CredentialId,
    pub requested_by: UserId,
    pub institution_id: OrganizationId,
    pub status: RequestStatus,
    pub message: Option<String>,
    pub decision_reason: Option<String>,
    pub decided_by: Option<UserId>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<VerificationRequest> for VerificationRequestResponse {
    fn from(r: VerificationRequest) -> Self {
        Self {
            request_id: r.request_id,
            credential_id: r.credential_id,
            requested_by: r.requested_by,
            institution_id: r.institution_id,
            status: r.status,
            message: r.message,
            decision_reason: r.decision_reason,
            decided_by: r.decided_by,
            decided_at: r.decided_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResponse {
    /// `false` when the same decision had already been recorded
    pub applied: bool,
    pub request: VerificationRequestResponse,
    pub credential: CredentialResponse,
}

impl From<DecisionOutput> for DecisionResponse {
    fn from(output: DecisionOutput) -> Self {
        Self {
            applied: output.applied,
            request: output.request.into(),
            credential: output.credential.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorResponse {
    pub anchor_id: LedgerAnchorId,
    pub operation: String,
    pub status: OutboxStatus,
    pub retry_count: u32,
    pub next_attempt_at: DateTime<Utc>,
    pub tx_id: Option<String>,
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<LedgerAnchor> for AnchorResponse {
    fn from(a: LedgerAnchor) -> Self {
        Self {
            anchor_id: a.anchor_id,
            operation: a.operation.code().to_string(),
            status: a.status,
            retry_count: a.retry_count,
            next_attempt_at: a.next_attempt_at,
            tx_id: a.tx_id,
            last_error: a.last_error,
            updated_at: a.updated_at,
        }
    }
}

/// GET /api/credentials/{id}/verification
///
/// Omits the owner's free-text description and the revocation reason.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationViewResponse {
    pub credential_id: CredentialId,
    pub owner_id: UserId,
    pub institution_id: OrganizationId,
    pub title: String,
    pub credential_type: CredentialType,
    pub issue_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub document_hash: Option<String>,
    pub status: CredentialStatus,
    pub anchor_status: AnchorStatus,
    pub ledger_tx_id: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub anchors: Vec<AnchorResponse>,
    pub ledger_available: bool,
    pub ledger_history: Vec<TransactionResponse>,
}

impl From<VerificationView> for VerificationViewResponse {
    fn from(view: VerificationView) -> Self {
        let c = view.credential;
        Self {
            credential_id: c.credential_id,
            owner_id: c.owner_id,
            institution_id: c.institution_id,
            title: c.title,
            credential_type: c.credential_type,
            issue_date: c.issue_date,
            expiry_date: c.expiry_date,
            document_hash: c.document_hash.as_ref().map(|h| h.as_str().to_string()),
            status: c.status,
            anchor_status: c.anchor_status,
            ledger_tx_id: c.ledger_tx_id,
            verified_at: c.verified_at,
            anchors: view.anchors.into_iter().map(AnchorResponse::from).collect(),
            ledger_available: view.ledger_available,
            ledger_history: view
                .history
                .into_iter()
                .map(TransactionResponse::from)
                .collect(),
        }
    }
}
