//! PostgreSQL notification repository

use chrono::{DateTime, Utc};
use kernel::id::{NotificationId, UserId};
use kernel::pagination::{Page, PageQuery};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::notification::{Notification, NotificationKind};
use crate::domain::repository::NotificationRepository;
use crate::error::{NotificationError, NotificationResult};

const NOTIFICATION_COLUMNS: &str = r#"
    notification_id,
    user_id,
    kind,
    title,
    body,
    link,
    read_at,
    created_at
"#;

#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Insert on a caller-owned connection, typically inside another crate's
/// transaction so the notification commits with the change it reports.
pub async fn insert_notification(
    conn: &mut PgConnection,
    notification: &Notification,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO notifications (
            notification_id,
            user_id,
            kind,
            title,
            body,
            link,
            read_at,
            created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(notification.notification_id.as_uuid())
    .bind(notification.user_id.as_uuid())
    .bind(notification.kind.code())
    .bind(&notification.title)
    .bind(&notification.body)
    .bind(notification.link.as_deref())
    .bind(notification.read_at)
    .bind(notification.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

impl NotificationRepository for PgNotificationRepository {
    async fn create(&self, notification: &Notification) -> NotificationResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_notification(&mut *conn, notification).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: NotificationId) -> NotificationResult<Option<Notification>> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE notification_id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(NotificationRow::into_notification).transpose()
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        unread_only: bool,
        page: PageQuery,
    ) -> NotificationResult<Page<Notification>> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM notifications
            WHERE user_id = $1 AND ($2 = FALSE OR read_at IS NULL)
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            WHERE user_id = $1 AND ($2 = FALSE OR read_at IS NULL)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(user_id.as_uuid())
        .bind(unread_only)
        .bind(i64::from(page.limit()))
        .bind(i64::from(page.offset()))
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(NotificationRow::into_notification)
            .collect::<NotificationResult<Vec<_>>>()?;
        Ok(Page::new(items, total as u64, page))
    }

    async fn unread_count(&self, user_id: UserId) -> NotificationResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read_at IS NULL",
        )
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn mark_read(&self, id: NotificationId, at: DateTime<Utc>) -> NotificationResult<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET read_at = $2 WHERE notification_id = $1 AND read_at IS NULL",
        )
        .bind(id.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, user_id: UserId, at: DateTime<Utc>) -> NotificationResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read_at = $2 WHERE user_id = $1 AND read_at IS NULL",
        )
        .bind(user_id.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    notification_id: Uuid,
    user_id: Uuid,
    kind: String,
    title: String,
    body: String,
    link: Option<String>,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl NotificationRow {
    fn into_notification(self) -> NotificationResult<Notification> {
        let kind = NotificationKind::from_code(&self.kind).ok_or_else(|| {
            NotificationError::Internal(format!("Unknown notification kind: {}", self.kind))
        })?;

        Ok(Notification {
            notification_id: NotificationId::from_uuid(self.notification_id),
            user_id: UserId::from_uuid(self.user_id),
            kind,
            title: self.title,
            body: self.body,
            link: self.link,
            read_at: self.read_at,
            created_at: self.created_at,
        })
    }
}
