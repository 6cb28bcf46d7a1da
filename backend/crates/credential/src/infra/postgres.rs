//! PostgreSQL credential store
//!
//! Optimistic concurrency: every update is `WHERE id = $1 AND version = $2`
//! and bumps the version; zero affected rows means someone else got there
//! first. The partial unique index on open requests and the unique
//! `(credential_id, operation)` outbox key back the in-code checks.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use kernel::id::{CredentialId, LedgerAnchorId, OrganizationId, UserId, VerificationRequestId};
use kernel::pagination::{Page, PageQuery};
use ledger::LedgerOperation;
use notification::infra::postgres::insert_notification;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::entity::{Credential, LedgerAnchor, VerificationRequest};
use crate::domain::repository::{
    AnchorOutbox, ChangeSet, CredentialFilter, CredentialRepository, CredentialUnitOfWork,
    RequestFilter, Write,
};
use crate::domain::service::analytics::{
    CredentialAnalytics, InstitutionCount, empty_analytics, month_label, month_starts,
};
use crate::domain::value_object::{
    AnchorStatus, CredentialStatus, CredentialType, DocumentHash, OutboxStatus, RequestStatus,
};
use crate::error::{CredentialError, CredentialResult};

const CREDENTIAL_COLUMNS: &str = r#"
    credential_id,
    owner_id,
    institution_id,
    title,
    credential_type,
    description,
    issue_date,
    expiry_date,
    document_hash,
    status,
    anchor_status,
    ledger_tx_id,
    verified_by,
    verified_at,
    revoked_reason,
    version,
    created_at,
    updated_at
"#;

const REQUEST_COLUMNS: &str = r#"
    request_id,
    credential_id,
    requested_by,
    institution_id,
    status,
    message,
    decision_reason,
    decided_by,
    decided_at,
    version,
    created_at,
    updated_at
"#;

const ANCHOR_COLUMNS: &str = r#"
    anchor_id,
    credential_id,
    operation,
    status,
    retry_count,
    max_retries,
    next_attempt_at,
    locked_until,
    payload_hash,
    submitted_by,
    tx_id,
    last_error,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

// ============================================================================
// Writes
// ============================================================================

async fn insert_credential(conn: &mut PgConnection, c: &Credential) -> CredentialResult<()> {
    sqlx::query(&format!(
        r#"
        INSERT INTO credentials ({CREDENTIAL_COLUMNS})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        "#
    ))
    .bind(c.credential_id.as_uuid())
    .bind(c.owner_id.as_uuid())
    .bind(c.institution_id.as_uuid())
    .bind(&c.title)
    .bind(c.credential_type.code())
    .bind(c.description.as_deref())
    .bind(c.issue_date)
    .bind(c.expiry_date)
    .bind(c.document_hash.as_ref().map(DocumentHash::as_str))
    .bind(c.status.code())
    .bind(c.anchor_status.code())
    .bind(c.ledger_tx_id.as_deref())
    .bind(c.verified_by.map(|id| id.into_uuid()))
    .bind(c.verified_at)
    .bind(c.revoked_reason.as_deref())
    .bind(c.version)
    .bind(c.created_at)
    .bind(c.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

async fn update_credential(conn: &mut PgConnection, c: &Credential) -> CredentialResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE credentials SET
            status = $3,
            anchor_status = $4,
            ledger_tx_id = $5,
            verified_by = $6,
            verified_at = $7,
            revoked_reason = $8,
            updated_at = $9,
            version = version + 1
        WHERE credential_id = $1 AND version = $2
        "#,
    )
    .bind(c.credential_id.as_uuid())
    .bind(c.version)
    .bind(c.status.code())
    .bind(c.anchor_status.code())
    .bind(c.ledger_tx_id.as_deref())
    .bind(c.verified_by.map(|id| id.into_uuid()))
    .bind(c.verified_at)
    .bind(c.revoked_reason.as_deref())
    .bind(c.updated_at)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CredentialError::ConcurrentModification);
    }
    Ok(())
}

async fn insert_request(conn: &mut PgConnection, r: &VerificationRequest) -> CredentialResult<()> {
    let inserted = sqlx::query(&format!(
        r#"
        INSERT INTO verification_requests ({REQUEST_COLUMNS})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#
    ))
    .bind(r.request_id.as_uuid())
    .bind(r.credential_id.as_uuid())
    .bind(r.requested_by.as_uuid())
    .bind(r.institution_id.as_uuid())
    .bind(r.status.code())
    .bind(r.message.as_deref())
    .bind(r.decision_reason.as_deref())
    .bind(r.decided_by.map(|id| id.into_uuid()))
    .bind(r.decided_at)
    .bind(r.version)
    .bind(r.created_at)
    .bind(r.updated_at)
    .execute(conn)
    .await;

    match inserted {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => Err(CredentialError::DuplicatePendingRequest),
        Err(e) => Err(e.into()),
    }
}

async fn update_request(conn: &mut PgConnection, r: &VerificationRequest) -> CredentialResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE verification_requests SET
            status = $3,
            decision_reason = $4,
            decided_by = $5,
            decided_at = $6,
            updated_at = $7,
            version = version + 1
        WHERE request_id = $1 AND version = $2
        "#,
    )
    .bind(r.request_id.as_uuid())
    .bind(r.version)
    .bind(r.status.code())
    .bind(r.decision_reason.as_deref())
    .bind(r.decided_by.map(|id| id.into_uuid()))
    .bind(r.decided_at)
    .bind(r.updated_at)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CredentialError::ConcurrentModification);
    }
    Ok(())
}

async fn enqueue_anchor(conn: &mut PgConnection, a: &LedgerAnchor) -> CredentialResult<()> {
    sqlx::query(&format!(
        r#"
        INSERT INTO ledger_anchors ({ANCHOR_COLUMNS})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        ON CONFLICT (credential_id, operation) DO NOTHING
        "#
    ))
    .bind(a.anchor_id.as_uuid())
    .bind(a.credential_id.as_uuid())
    .bind(a.operation.code())
    .bind(a.status.code())
    .bind(a.retry_count as i32)
    .bind(a.max_retries as i32)
    .bind(a.next_attempt_at)
    .bind(a.locked_until)
    .bind(&a.payload_hash)
    .bind(&a.submitted_by)
    .bind(a.tx_id.as_deref())
    .bind(a.last_error.as_deref())
    .bind(a.created_at)
    .bind(a.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

impl CredentialUnitOfWork for PgCredentialStore {
    async fn commit(&self, changes: ChangeSet) -> CredentialResult<()> {
        let mut tx = self.pool.begin().await?;

        match &changes.credential {
            Some(Write::Insert(c)) => insert_credential(&mut *tx, c).await?,
            Some(Write::Update(c)) => update_credential(&mut *tx, c).await?,
            None => {}
        }
        for write in &changes.requests {
            match write {
                Write::Insert(r) => insert_request(&mut *tx, r).await?,
                Write::Update(r) => update_request(&mut *tx, r).await?,
            }
        }
        if let Some(anchor) = &changes.anchor {
            enqueue_anchor(&mut *tx, anchor).await?;
        }
        for notification in &changes.notifications {
            insert_notification(&mut *tx, notification).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

// ============================================================================
// Reads
// ============================================================================

impl CredentialRepository for PgCredentialStore {
    async fn find_credential(&self, id: CredentialId) -> CredentialResult<Option<Credential>> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE credential_id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(CredentialRow::into_credential).transpose()
    }

    async fn list_credentials(
        &self,
        filter: &CredentialFilter,
        page: PageQuery,
    ) -> CredentialResult<Page<Credential>> {
        const WHERE: &str = r#"
            WHERE ($1::uuid IS NULL OR owner_id = $1)
              AND ($2::uuid IS NULL OR institution_id = $2)
              AND ($3::text IS NULL OR status = $3)
              AND ($4::text IS NULL OR credential_type = $4)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM credentials {WHERE}"))
            .bind(filter.owner_id.map(|id| id.into_uuid()))
            .bind(filter.institution_id.map(|id| id.into_uuid()))
            .bind(filter.status.map(|s| s.code()))
            .bind(filter.credential_type.map(|t| t.code()))
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, CredentialRow>(&format!(
            r#"
            SELECT {CREDENTIAL_COLUMNS} FROM credentials {WHERE}
            ORDER BY created_at DESC, credential_id DESC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(filter.owner_id.map(|id| id.into_uuid()))
        .bind(filter.institution_id.map(|id| id.into_uuid()))
        .bind(filter.status.map(|s| s.code()))
        .bind(filter.credential_type.map(|t| t.code()))
        .bind(i64::from(page.limit()))
        .bind(i64::from(page.offset()))
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(CredentialRow::into_credential)
            .collect::<CredentialResult<Vec<_>>>()?;
        Ok(Page::new(items, total as u64, page))
    }

    async fn find_request(
        &self,
        id: VerificationRequestId,
    ) -> CredentialResult<Option<VerificationRequest>> {
        let row = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM verification_requests WHERE request_id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(RequestRow::into_request).transpose()
    }

    async fn find_pending_request(
        &self,
        credential_id: CredentialId,
    ) -> CredentialResult<Option<VerificationRequest>> {
        let row = sqlx::query_as::<_, RequestRow>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS} FROM verification_requests
            WHERE credential_id = $1 AND status = 'pending'
            "#
        ))
        .bind(credential_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(RequestRow::into_request).transpose()
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
        page: PageQuery,
    ) -> CredentialResult<Page<VerificationRequest>> {
        const WHERE: &str = r#"
            WHERE ($1::uuid IS NULL OR institution_id = $1)
              AND ($2::uuid IS NULL OR requested_by = $2)
              AND ($3::uuid IS NULL OR credential_id = $3)
              AND ($4::text IS NULL OR status = $4)
        "#;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM verification_requests {WHERE}"))
                .bind(filter.institution_id.map(|id| id.into_uuid()))
                .bind(filter.requested_by.map(|id| id.into_uuid()))
                .bind(filter.credential_id.map(|id| id.into_uuid()))
                .bind(filter.status.map(|s| s.code()))
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query_as::<_, RequestRow>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS} FROM verification_requests {WHERE}
            ORDER BY created_at ASC, request_id ASC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(filter.institution_id.map(|id| id.into_uuid()))
        .bind(filter.requested_by.map(|id| id.into_uuid()))
        .bind(filter.credential_id.map(|id| id.into_uuid()))
        .bind(filter.status.map(|s| s.code()))
        .bind(i64::from(page.limit()))
        .bind(i64::from(page.offset()))
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(RequestRow::into_request)
            .collect::<CredentialResult<Vec<_>>>()?;
        Ok(Page::new(items, total as u64, page))
    }

    async fn find_past_expiry(
        &self,
        today: NaiveDate,
        limit: u32,
    ) -> CredentialResult<Vec<Credential>> {
        let rows = sqlx::query_as::<_, CredentialRow>(&format!(
            r#"
            SELECT {CREDENTIAL_COLUMNS} FROM credentials
            WHERE expiry_date < $1 AND status NOT IN ('revoked', 'expired')
            ORDER BY expiry_date ASC
            LIMIT $2
            "#
        ))
        .bind(today)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CredentialRow::into_credential).collect()
    }

    async fn analytics(
        &self,
        institution_id: Option<OrganizationId>,
        months: u32,
        today: NaiveDate,
    ) -> CredentialResult<CredentialAnalytics> {
        let scope = institution_id.map(|id| id.into_uuid());
        let mut analytics = empty_analytics(months, today);

        let by_status: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*) FROM credentials
            WHERE ($1::uuid IS NULL OR institution_id = $1)
            GROUP BY status
            "#,
        )
        .bind(scope)
        .fetch_all(&self.pool)
        .await?;
        for (code, count) in by_status {
            if let Some(status) = CredentialStatus::from_code(&code) {
                analytics.by_status.insert(status, count as u64);
                analytics.total += count as u64;
            }
        }

        let by_type: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT credential_type, COUNT(*) FROM credentials
            WHERE ($1::uuid IS NULL OR institution_id = $1)
            GROUP BY credential_type
            "#,
        )
        .bind(scope)
        .fetch_all(&self.pool)
        .await?;
        for (code, count) in by_type {
            if let Some(t) = CredentialType::from_code(&code) {
                analytics.by_type.insert(t, count as u64);
            }
        }

        let anchoring: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT anchor_status, COUNT(*) FROM credentials
            WHERE ($1::uuid IS NULL OR institution_id = $1)
            GROUP BY anchor_status
            "#,
        )
        .bind(scope)
        .fetch_all(&self.pool)
        .await?;
        for (code, count) in anchoring {
            if let Some(s) = AnchorStatus::from_code(&code) {
                analytics.anchoring.insert(s, count as u64);
            }
        }

        let by_institution: Vec<(Uuid, i64, i64)> = sqlx::query_as(
            r#"
            SELECT institution_id, COUNT(*), COUNT(*) FILTER (WHERE status = 'verified')
            FROM credentials
            WHERE ($1::uuid IS NULL OR institution_id = $1)
            GROUP BY institution_id
            ORDER BY 2 DESC, 1 ASC
            "#,
        )
        .bind(scope)
        .fetch_all(&self.pool)
        .await?;
        analytics.by_institution = by_institution
            .into_iter()
            .map(|(id, total, verified)| InstitutionCount {
                institution_id: OrganizationId::from_uuid(id),
                total: total as u64,
                verified: verified as u64,
            })
            .collect();

        if let Some(since) = month_starts(months, today).first().copied() {
            let monthly: Vec<(NaiveDate, i64)> = sqlx::query_as(
                r#"
                SELECT date_trunc('month', issue_date)::date, COUNT(*) FROM credentials
                WHERE ($1::uuid IS NULL OR institution_id = $1) AND issue_date >= $2
                GROUP BY 1
                "#,
            )
            .bind(scope)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;
            let monthly: BTreeMap<String, u64> = monthly
                .into_iter()
                .map(|(month, count)| (month_label(month), count as u64))
                .collect();
            for bucket in &mut analytics.monthly_issuance {
                bucket.count = monthly.get(&bucket.month).copied().unwrap_or(0);
            }
        }

        let (total, pending, approved, rejected, average_secs): (i64, i64, i64, i64, Option<f64>) =
            sqlx::query_as(
                r#"
                SELECT
                    COUNT(*),
                    COUNT(*) FILTER (WHERE status = 'pending'),
                    COUNT(*) FILTER (WHERE status = 'approved'),
                    COUNT(*) FILTER (WHERE status = 'rejected'),
                    AVG(EXTRACT(EPOCH FROM (decided_at - created_at)))::float8
                FROM verification_requests
                WHERE ($1::uuid IS NULL OR institution_id = $1)
                "#,
            )
            .bind(scope)
            .fetch_one(&self.pool)
            .await?;
        analytics.verification.total = total as u64;
        analytics.verification.pending = pending as u64;
        analytics.verification.approved = approved as u64;
        analytics.verification.rejected = rejected as u64;
        analytics.verification.average_decision_hours = average_secs.map(|secs| secs / 3600.0);

        Ok(analytics)
    }
}

// ============================================================================
// Outbox
// ============================================================================

impl AnchorOutbox for PgCredentialStore {
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        lease: Duration,
        limit: u32,
    ) -> CredentialResult<Vec<LedgerAnchor>> {
        let lease = chrono::Duration::from_std(lease)
            .map_err(|e| CredentialError::Internal(e.to_string()))?;

        // SKIP LOCKED lets several workers claim disjoint batches. A row waits
        // while an older row for the same credential is still pending.
        let rows = sqlx::query_as::<_, AnchorRow>(&format!(
            r#"
            UPDATE ledger_anchors SET locked_until = $2
            WHERE anchor_id IN (
                SELECT anchor_id FROM ledger_anchors
                WHERE status = 'pending'
                  AND next_attempt_at <= $1
                  AND (locked_until IS NULL OR locked_until <= $1)
                  AND NOT EXISTS (
                      SELECT 1 FROM ledger_anchors e
                      WHERE e.credential_id = ledger_anchors.credential_id
                        AND e.status = 'pending'
                        AND (e.created_at, e.anchor_id)
                            < (ledger_anchors.created_at, ledger_anchors.anchor_id)
                  )
                ORDER BY next_attempt_at ASC
                LIMIT $3
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {ANCHOR_COLUMNS}
            "#
        ))
        .bind(now)
        .bind(now + lease)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AnchorRow::into_anchor).collect()
    }

    async fn record_attempt(&self, anchor: &LedgerAnchor) -> CredentialResult<Option<Credential>> {
        let mut tx = self.pool.begin().await?;

        // Serializes workers finishing different anchors of one credential,
        // so the pending check below sees the other's committed outcome
        sqlx::query("SELECT 1 FROM credentials WHERE credential_id = $1 FOR UPDATE")
            .bind(anchor.credential_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        let updated = sqlx::query(
            r#"
            UPDATE ledger_anchors SET
                status = $2,
                retry_count = $3,
                next_attempt_at = $4,
                locked_until = $5,
                tx_id = $6,
                last_error = $7,
                updated_at = $8
            WHERE anchor_id = $1 AND status = 'pending'
            "#,
        )
        .bind(anchor.anchor_id.as_uuid())
        .bind(anchor.status.code())
        .bind(anchor.retry_count as i32)
        .bind(anchor.next_attempt_at)
        .bind(anchor.locked_until)
        .bind(anchor.tx_id.as_deref())
        .bind(anchor.last_error.as_deref())
        .bind(anchor.updated_at)
        .execute(&mut *tx)
        .await?;

        // Another worker already finished it after our lease ran out
        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let anchor_status = match anchor.status {
            OutboxStatus::Pending => {
                tx.commit().await?;
                return Ok(None);
            }
            OutboxStatus::Anchored => {
                let more_pending: bool = sqlx::query_scalar(
                    r#"
                    SELECT EXISTS(
                        SELECT 1 FROM ledger_anchors
                        WHERE credential_id = $1 AND status = 'pending'
                    )
                    "#,
                )
                .bind(anchor.credential_id.as_uuid())
                .fetch_one(&mut *tx)
                .await?;
                if more_pending {
                    AnchorStatus::Pending
                } else {
                    AnchorStatus::Anchored
                }
            }
            OutboxStatus::Failed => AnchorStatus::Failed,
        };

        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            r#"
            UPDATE credentials SET
                anchor_status = $2,
                ledger_tx_id = COALESCE($3, ledger_tx_id),
                updated_at = $4,
                version = version + 1
            WHERE credential_id = $1
            RETURNING {CREDENTIAL_COLUMNS}
            "#
        ))
        .bind(anchor.credential_id.as_uuid())
        .bind(anchor_status.code())
        .bind(anchor.tx_id.as_deref())
        .bind(anchor.updated_at)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        row.map(CredentialRow::into_credential).transpose()
    }

    async fn anchors_for(&self, credential_id: CredentialId) -> CredentialResult<Vec<LedgerAnchor>> {
        let rows = sqlx::query_as::<_, AnchorRow>(&format!(
            r#"
            SELECT {ANCHOR_COLUMNS} FROM ledger_anchors
            WHERE credential_id = $1
            ORDER BY created_at ASC
            "#
        ))
        .bind(credential_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AnchorRow::into_anchor).collect()
    }
}

// ============================================================================
// Rows
// ============================================================================

fn unknown(what: &str, code: &str) -> CredentialError {
    CredentialError::Internal(format!("Unknown {what} in database: {code}"))
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    credential_id: Uuid,
    owner_id: Uuid,
    institution_id: Uuid,
    title: String,
    credential_type: String,
    description: Option<String>,
    issue_date: NaiveDate,
    expiry_date: Option<NaiveDate>,
    document_hash: Option<String>,
    status: String,
    anchor_status: String,
    ledger_tx_id: Option<String>,
    verified_by: Option<Uuid>,
    verified_at: Option<DateTime<Utc>>,
    revoked_reason: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CredentialRow {
    fn into_credential(self) -> CredentialResult<Credential> {
        Ok(Credential {
            credential_id: CredentialId::from_uuid(self.credential_id),
            owner_id: UserId::from_uuid(self.owner_id),
            institution_id: OrganizationId::from_uuid(self.institution_id),
            title: self.title,
            credential_type: CredentialType::from_code(&self.credential_type)
                .ok_or_else(|| unknown("credential type", &self.credential_type))?,
            description: self.description,
            issue_date: self.issue_date,
            expiry_date: self.expiry_date,
            document_hash: self.document_hash.map(DocumentHash::from_db),
            status: CredentialStatus::from_code(&self.status)
                .ok_or_else(|| unknown("credential status", &self.status))?,
            anchor_status: AnchorStatus::from_code(&self.anchor_status)
                .ok_or_else(|| unknown("anchor status", &self.anchor_status))?,
            ledger_tx_id: self.ledger_tx_id,
            verified_by: self.verified_by.map(UserId::from_uuid),
            verified_at: self.verified_at,
            revoked_reason: self.revoked_reason,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RequestRow {
    request_id: Uuid,
    credential_id: Uuid,
    requested_by: Uuid,
    institution_id: Uuid,
    status: String,
    message: Option<String>,
    decision_reason: Option<String>,
    decided_by: Option<Uuid>,
    decided_at: Option<DateTime<Utc>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RequestRow {
    fn into_request(self) -> CredentialResult<VerificationRequest> {
        Ok(VerificationRequest {
            request_id: VerificationRequestId::from_uuid(self.request_id),
            credential_id: CredentialId::from_uuid(self.credential_id),
            requested_by: UserId::from_uuid(self.requested_by),
            institution_id: OrganizationId::from_uuid(self.institution_id),
            status: RequestStatus::from_code(&self.status)
                .ok_or_else(|| unknown("request status", &self.status))?,
            message: self.message,
            decision_reason: self.decision_reason,
            decided_by: self.decided_by.map(UserId::from_uuid),
            decided_at: self.decided_at,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AnchorRow {
    anchor_id: Uuid,
    credential_id: Uuid,
    operation: String,
    status: String,
    retry_count: i32,
    max_retries: i32,
    next_attempt_at: DateTime<Utc>,
    locked_until: Option<DateTime<Utc>>,
    payload_hash: String,
    submitted_by: String,
    tx_id: Option<String>,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AnchorRow {
    fn into_anchor(self) -> CredentialResult<LedgerAnchor> {
        Ok(LedgerAnchor {
            anchor_id: LedgerAnchorId::from_uuid(self.anchor_id),
            credential_id: CredentialId::from_uuid(self.credential_id),
            operation: LedgerOperation::from_code(&self.operation)
                .ok_or_else(|| unknown("ledger operation", &self.operation))?,
            status: OutboxStatus::from_code(&self.status)
                .ok_or_else(|| unknown("outbox status", &self.status))?,
            retry_count: self.retry_count.max(0) as u32,
            max_retries: self.max_retries.max(0) as u32,
            next_attempt_at: self.next_attempt_at,
            locked_until: self.locked_until,
            payload_hash: self.payload_hash,
            submitted_by: self.submitted_by,
            tx_id: self.tx_id,
            last_error: self.last_error,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
