//! PostgreSQL marketplace store

use chrono::{DateTime, Utc};
use credential::CredentialType;
use kernel::id::{ApplicationId, CredentialId, JobId, MessageId, OrganizationId, UserId};
use kernel::pagination::{Page, PageQuery};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{Application, Job, Message, Organization};
use crate::domain::repository::{
    ApplicationRepository, JobFilter, JobRepository, MessageRepository, OrganizationRepository,
};
use crate::domain::value_object::{ApplicationStatus, EmploymentType, JobStatus, OrganizationKind};
use crate::error::{MarketplaceError, MarketplaceResult};

const ORGANIZATION_COLUMNS: &str = r#"
    organization_id,
    name,
    kind,
    website,
    description,
    verified,
    created_by,
    created_at,
    updated_at
"#;

const JOB_COLUMNS: &str = r#"
    job_id,
    organization_id,
    posted_by,
    title,
    description,
    location,
    employment_type,
    salary_min,
    salary_max,
    required_credentials,
    status,
    created_at,
    updated_at
"#;

const APPLICATION_COLUMNS: &str = r#"
    application_id,
    job_id,
    applicant_id,
    cover_letter,
    credential_ids,
    status,
    created_at,
    updated_at
"#;

const MESSAGE_COLUMNS: &str = r#"
    message_id,
    sender_id,
    recipient_id,
    body,
    read_at,
    created_at
"#;

#[derive(Clone)]
pub struct PgMarketplaceStore {
    pool: PgPool,
}

impl PgMarketplaceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

fn unknown(what: &str, code: &str) -> MarketplaceError {
    MarketplaceError::Internal(format!("Unknown {what} in database: {code}"))
}

fn page_of<T>(items: Vec<T>, total: i64, page: PageQuery) -> Page<T> {
    Page::new(items, total.max(0) as u64, page)
}

// ============================================================================
// Organizations
// ============================================================================

impl OrganizationRepository for PgMarketplaceStore {
    async fn create_organization(&self, o: &Organization) -> MarketplaceResult<()> {
        sqlx::query(&format!(
            "INSERT INTO organizations ({ORGANIZATION_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(o.organization_id.as_uuid())
        .bind(&o.name)
        .bind(o.kind.code())
        .bind(o.website.as_deref())
        .bind(o.description.as_deref())
        .bind(o.verified)
        .bind(o.created_by.as_uuid())
        .bind(o.created_at)
        .bind(o.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_organization(
        &self,
        organization_id: OrganizationId,
    ) -> MarketplaceResult<Option<Organization>> {
        let row = sqlx::query_as::<_, OrganizationRow>(&format!(
            "SELECT {ORGANIZATION_COLUMNS} FROM organizations WHERE organization_id = $1"
        ))
        .bind(organization_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(OrganizationRow::into_organization).transpose()
    }

    async fn list_organizations(
        &self,
        kind: Option<OrganizationKind>,
        page: PageQuery,
    ) -> MarketplaceResult<Page<Organization>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM organizations WHERE ($1::text IS NULL OR kind = $1)",
        )
        .bind(kind.map(|k| k.code()))
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, OrganizationRow>(&format!(
            r#"
            SELECT {ORGANIZATION_COLUMNS} FROM organizations
            WHERE ($1::text IS NULL OR kind = $1)
            ORDER BY name ASC, organization_id ASC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(kind.map(|k| k.code()))
        .bind(i64::from(page.limit()))
        .bind(i64::from(page.offset()))
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(OrganizationRow::into_organization)
            .collect::<MarketplaceResult<Vec<_>>>()?;
        Ok(page_of(items, total, page))
    }

    async fn update_organization(&self, o: &Organization) -> MarketplaceResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE organizations SET
                name = $2,
                website = $3,
                description = $4,
                verified = $5,
                updated_at = $6
            WHERE organization_id = $1
            "#,
        )
        .bind(o.organization_id.as_uuid())
        .bind(&o.name)
        .bind(o.website.as_deref())
        .bind(o.description.as_deref())
        .bind(o.verified)
        .bind(o.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MarketplaceError::OrganizationNotFound);
        }
        Ok(())
    }
}

// ============================================================================
// Jobs
// ============================================================================

fn credential_codes(types: &[CredentialType]) -> Vec<String> {
    types.iter().map(|t| t.code().to_string()).collect()
}

impl JobRepository for PgMarketplaceStore {
    async fn create_job(&self, j: &Job) -> MarketplaceResult<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO jobs ({JOB_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#
        ))
        .bind(j.job_id.as_uuid())
        .bind(j.organization_id.as_uuid())
        .bind(j.posted_by.as_uuid())
        .bind(&j.title)
        .bind(&j.description)
        .bind(j.location.as_deref())
        .bind(j.employment_type.code())
        .bind(j.salary_min)
        .bind(j.salary_max)
        .bind(credential_codes(&j.required_credentials))
        .bind(j.status.code())
        .bind(j.created_at)
        .bind(j.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_job(&self, job_id: JobId) -> MarketplaceResult<Option<Job>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE job_id = $1"
        ))
        .bind(job_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobRow::into_job).transpose()
    }

    async fn list_jobs(&self, filter: &JobFilter, page: PageQuery) -> MarketplaceResult<Page<Job>> {
        const WHERE: &str = r#"
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL OR employment_type = $2)
              AND ($3::uuid IS NULL OR organization_id = $3)
              AND ($4::text IS NULL
                   OR title ILIKE '%' || $4 || '%'
                   OR description ILIKE '%' || $4 || '%'
                   OR location ILIKE '%' || $4 || '%')
        "#;
        let query = filter.query.as_deref().map(escape_like);

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM jobs {WHERE}"))
            .bind(filter.status.map(|s| s.code()))
            .bind(filter.employment_type.map(|t| t.code()))
            .bind(filter.organization_id.map(|id| id.into_uuid()))
            .bind(query.as_deref())
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            SELECT {JOB_COLUMNS} FROM jobs {WHERE}
            ORDER BY created_at DESC, job_id DESC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(filter.status.map(|s| s.code()))
        .bind(filter.employment_type.map(|t| t.code()))
        .bind(filter.organization_id.map(|id| id.into_uuid()))
        .bind(query.as_deref())
        .bind(i64::from(page.limit()))
        .bind(i64::from(page.offset()))
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(JobRow::into_job)
            .collect::<MarketplaceResult<Vec<_>>>()?;
        Ok(page_of(items, total, page))
    }

    async fn update_job(&self, j: &Job) -> MarketplaceResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                title = $2,
                description = $3,
                location = $4,
                employment_type = $5,
                salary_min = $6,
                salary_max = $7,
                required_credentials = $8,
                status = $9,
                updated_at = $10
            WHERE job_id = $1
            "#,
        )
        .bind(j.job_id.as_uuid())
        .bind(&j.title)
        .bind(&j.description)
        .bind(j.location.as_deref())
        .bind(j.employment_type.code())
        .bind(j.salary_min)
        .bind(j.salary_max)
        .bind(credential_codes(&j.required_credentials))
        .bind(j.status.code())
        .bind(j.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MarketplaceError::JobNotFound);
        }
        Ok(())
    }
}

/// `%` and `_` in user input match literally
fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

// ============================================================================
// Applications
// ============================================================================

impl ApplicationRepository for PgMarketplaceStore {
    async fn create_application(&self, a: &Application) -> MarketplaceResult<()> {
        let credential_ids: Vec<Uuid> = a.credential_ids.iter().map(|id| id.into_uuid()).collect();
        let inserted = sqlx::query(&format!(
            "INSERT INTO applications ({APPLICATION_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(a.application_id.as_uuid())
        .bind(a.job_id.as_uuid())
        .bind(a.applicant_id.as_uuid())
        .bind(a.cover_letter.as_deref())
        .bind(credential_ids)
        .bind(a.status.code())
        .bind(a.created_at)
        .bind(a.updated_at)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(MarketplaceError::DuplicateApplication),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_application(
        &self,
        application_id: ApplicationId,
    ) -> MarketplaceResult<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE application_id = $1"
        ))
        .bind(application_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ApplicationRow::into_application).transpose()
    }

    async fn list_for_job(&self, job_id: JobId, page: PageQuery) -> MarketplaceResult<Page<Application>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM applications WHERE job_id = $1")
            .bind(job_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            r#"
            SELECT {APPLICATION_COLUMNS} FROM applications
            WHERE job_id = $1
            ORDER BY created_at ASC, application_id ASC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(job_id.as_uuid())
        .bind(i64::from(page.limit()))
        .bind(i64::from(page.offset()))
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(ApplicationRow::into_application)
            .collect::<MarketplaceResult<Vec<_>>>()?;
        Ok(page_of(items, total, page))
    }

    async fn list_for_applicant(
        &self,
        applicant_id: UserId,
        page: PageQuery,
    ) -> MarketplaceResult<Page<Application>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM applications WHERE applicant_id = $1")
                .bind(applicant_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            r#"
            SELECT {APPLICATION_COLUMNS} FROM applications
            WHERE applicant_id = $1
            ORDER BY created_at DESC, application_id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(applicant_id.as_uuid())
        .bind(i64::from(page.limit()))
        .bind(i64::from(page.offset()))
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(ApplicationRow::into_application)
            .collect::<MarketplaceResult<Vec<_>>>()?;
        Ok(page_of(items, total, page))
    }

    async fn update_application(
        &self,
        a: &Application,
        expected: ApplicationStatus,
    ) -> MarketplaceResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE applications SET status = $3, updated_at = $4
            WHERE application_id = $1 AND status = $2
            "#,
        )
        .bind(a.application_id.as_uuid())
        .bind(expected.code())
        .bind(a.status.code())
        .bind(a.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MarketplaceError::ConcurrentModification);
        }
        Ok(())
    }
}

// ============================================================================
// Messages
// ============================================================================

impl MessageRepository for PgMarketplaceStore {
    async fn create_message(&self, m: &Message) -> MarketplaceResult<()> {
        sqlx::query(&format!(
            "INSERT INTO messages ({MESSAGE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
        ))
        .bind(m.message_id.as_uuid())
        .bind(m.sender_id.as_uuid())
        .bind(m.recipient_id.as_uuid())
        .bind(&m.body)
        .bind(m.read_at)
        .bind(m.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_message(&self, message_id: MessageId) -> MarketplaceResult<Option<Message>> {
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE message_id = $1"
        ))
        .bind(message_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MessageRow::into_message))
    }

    async fn inbox(
        &self,
        user_id: UserId,
        unread_only: bool,
        page: PageQuery,
    ) -> MarketplaceResult<Page<Message>> {
        const WHERE: &str = "WHERE recipient_id = $1 AND (NOT $2 OR read_at IS NULL)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM messages {WHERE}"))
            .bind(user_id.as_uuid())
            .bind(unread_only)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM messages {WHERE}
            ORDER BY created_at DESC, message_id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(user_id.as_uuid())
        .bind(unread_only)
        .bind(i64::from(page.limit()))
        .bind(i64::from(page.offset()))
        .fetch_all(&self.pool)
        .await?;

        Ok(page_of(
            rows.into_iter().map(MessageRow::into_message).collect(),
            total,
            page,
        ))
    }

    async fn conversation(
        &self,
        user_id: UserId,
        other_id: UserId,
        page: PageQuery,
    ) -> MarketplaceResult<Page<Message>> {
        const WHERE: &str = r#"
            WHERE (sender_id = $1 AND recipient_id = $2)
               OR (sender_id = $2 AND recipient_id = $1)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM messages {WHERE}"))
            .bind(user_id.as_uuid())
            .bind(other_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM messages {WHERE}
            ORDER BY created_at ASC, message_id ASC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(user_id.as_uuid())
        .bind(other_id.as_uuid())
        .bind(i64::from(page.limit()))
        .bind(i64::from(page.offset()))
        .fetch_all(&self.pool)
        .await?;

        Ok(page_of(
            rows.into_iter().map(MessageRow::into_message).collect(),
            total,
            page,
        ))
    }

    async fn mark_message_read(&self, message_id: MessageId, at: DateTime<Utc>) -> MarketplaceResult<()> {
        sqlx::query("UPDATE messages SET read_at = $2 WHERE message_id = $1 AND read_at IS NULL")
            .bind(message_id.as_uuid())
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ============================================================================
// Rows
// ============================================================================

#[derive(sqlx::FromRow)]
struct OrganizationRow {
    organization_id: Uuid,
    name: String,
    kind: String,
    website: Option<String>,
    description: Option<String>,
    verified: bool,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrganizationRow {
    fn into_organization(self) -> MarketplaceResult<Organization> {
        Ok(Organization {
            organization_id: OrganizationId::from_uuid(self.organization_id),
            name: self.name,
            kind: OrganizationKind::from_code(&self.kind)
                .ok_or_else(|| unknown("organization kind", &self.kind))?,
            website: self.website,
            description: self.description,
            verified: self.verified,
            created_by: UserId::from_uuid(self.created_by),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    job_id: Uuid,
    organization_id: Uuid,
    posted_by: Uuid,
    title: String,
    description: String,
    location: Option<String>,
    employment_type: String,
    salary_min: Option<i64>,
    salary_max: Option<i64>,
    required_credentials: Vec<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl JobRow {
    fn into_job(self) -> MarketplaceResult<Job> {
        let required_credentials = self
            .required_credentials
            .iter()
            .map(|code| CredentialType::from_code(code).ok_or_else(|| unknown("credential type", code)))
            .collect::<MarketplaceResult<Vec<_>>>()?;

        Ok(Job {
            job_id: JobId::from_uuid(self.job_id),
            organization_id: OrganizationId::from_uuid(self.organization_id),
            posted_by: UserId::from_uuid(self.posted_by),
            title: self.title,
            description: self.description,
            location: self.location,
            employment_type: EmploymentType::from_code(&self.employment_type)
                .ok_or_else(|| unknown("employment type", &self.employment_type))?,
            salary_min: self.salary_min,
            salary_max: self.salary_max,
            required_credentials,
            status: JobStatus::from_code(&self.status)
                .ok_or_else(|| unknown("job status", &self.status))?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ApplicationRow {
    application_id: Uuid,
    job_id: Uuid,
    applicant_id: Uuid,
    cover_letter: Option<String>,
    credential_ids: Vec<Uuid>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ApplicationRow {
    fn into_application(self) -> MarketplaceResult<Application> {
        Ok(Application {
            application_id: ApplicationId::from_uuid(self.application_id),
            job_id: JobId::from_uuid(self.job_id),
            applicant_id: UserId::from_uuid(self.applicant_id),
            cover_letter: self.cover_letter,
            credential_ids: self
                .credential_ids
                .into_iter()
                .map(CredentialId::from_uuid)
                .collect(),
            status: ApplicationStatus::from_code(&self.status)
                .ok_or_else(|| unknown("application status", &self.status))?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    message_id: Uuid,
    sender_id: Uuid,
    recipient_id: Uuid,
    body: String,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_message(self) -> Message {
        Message {
            message_id: MessageId::from_uuid(self.message_id),
            sender_id: UserId::from_uuid(self.sender_id),
            recipient_id: UserId::from_uuid(self.recipient_id),
            body: self.body,
            read_at: self.read_at,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_match"), "100\\%\\_match");
        assert_eq!(escape_like("plain"), "plain");
    }
}
