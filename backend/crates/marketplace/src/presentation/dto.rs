//! API DTOs

use chrono::{DateTime, Utc};
use credential::CredentialType;
use kernel::id::{ApplicationId, CredentialId, JobId, MessageId, OrganizationId, UserId};
use kernel::pagination::PageQuery;
use serde::{Deserialize, Serialize};

use crate::domain::entity::{
    Application, Job, JobDraft, JobPatch, Message, NewApplication, NewOrganization, Organization,
};
use crate::domain::repository::JobFilter;
use crate::domain::value_object::{ApplicationStatus, EmploymentType, JobStatus, OrganizationKind};

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
    pub kind: OrganizationKind,
    pub website: Option<String>,
    pub description: Option<String>,
}

impl From<CreateOrganizationRequest> for NewOrganization {
    fn from(body: CreateOrganizationRequest) -> Self {
        Self {
            name: body.name,
            kind: body.kind,
            website: body.website,
            description: body.description,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListOrganizationsQuery {
    pub kind: Option<OrganizationKind>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostJobRequest {
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub employment_type: EmploymentType,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    #[serde(default)]
    pub required_credentials: Vec<CredentialType>,
}

impl From<PostJobRequest> for JobDraft {
    fn from(body: PostJobRequest) -> Self {
        Self {
            title: body.title,
            description: body.description,
            location: body.location,
            employment_type: body.employment_type,
            salary_min: body.salary_min,
            salary_max: body.salary_max,
            required_credentials: body.required_credentials,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<EmploymentType>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub required_credentials: Option<Vec<CredentialType>>,
}

impl From<UpdateJobRequest> for JobPatch {
    fn from(body: UpdateJobRequest) -> Self {
        Self {
            title: body.title,
            description: body.description,
            location: body.location,
            employment_type: body.employment_type,
            salary_min: body.salary_min,
            salary_max: body.salary_max,
            required_credentials: body.required_credentials,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListJobsQuery {
    pub status: Option<JobStatus>,
    pub employment_type: Option<EmploymentType>,
    pub organization_id: Option<OrganizationId>,
    /// Free-text search
    pub q: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListJobsQuery {
    pub fn filter(&self) -> JobFilter {
        JobFilter {
            status: self.status,
            employment_type: self.employment_type,
            organization_id: self.organization_id,
            query: self.q.clone(),
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
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub credential_ids: Vec<CredentialId>,
}

impl From<ApplyRequest> for NewApplication {
    fn from(body: ApplyRequest) -> Self {
        Self {
            cover_letter: body.cover_letter,
            credential_ids: body.credential_ids,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateApplicationStatusRequest {
    pub status: ApplicationStatus,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub recipient_id: UserId,
    pub body: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationResponse {
    pub organization_id: OrganizationId,
    pub name: String,
    pub kind: OrganizationKind,
    pub website: Option<String>,
    pub description: Option<String>,
    pub verified: bool,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Organization> for OrganizationResponse {
    fn from(o: Organization) -> Self {
        Self {
            organization_id: o.organization_id,
            name: o.name,
            kind: o.kind,
            website: o.website,
            description: o.description,
            verified: o.verified,
            created_by: o.created_by,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub job_id: JobId,
    pub organization_id: OrganizationId,
    pub posted_by: UserId,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub employment_type: EmploymentType,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub required_credentials: Vec<CredentialType>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobResponse {
    fn from(j: Job) -> Self {
        Self {
            job_id: j.job_id,
            organization_id: j.organization_id,
            posted_by: j.posted_by,
            title: j.title,
            description: j.description,
            location: j.location,
            employment_type: j.employment_type,
            salary_min: j.salary_min,
            salary_max: j.salary_max,
            required_credentials: j.required_credentials,
            status: j.status,
            created_at: j.created_at,
            updated_at: j.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResponse {
    pub application_id: ApplicationId,
    pub job_id: JobId,
    pub applicant_id: UserId,
    pub cover_letter: Option<String>,
    pub credential_ids: Vec<CredentialId>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Application> for ApplicationResponse {
    fn from(a: Application) -> Self {
        Self {
            application_id: a.application_id,
            job_id: a.job_id,
            applicant_id: a.applicant_id,
            cover_letter: a.cover_letter,
            credential_ids: a.credential_ids,
            status: a.status,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message_id: MessageId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub body: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(m: Message) -> Self {
        Self {
            message_id: m.message_id,
            sender_id: m.sender_id,
            recipient_id: m.recipient_id,
            body: m.body,
            read_at: m.read_at,
            created_at: m.created_at,
        }
    }
}
