//! Repository traits

use chrono::{DateTime, Utc};
use kernel::id::{NotificationId, UserId};
use kernel::pagination::{Page, PageQuery};

use crate::domain::notification::Notification;
use crate::error::NotificationResult;

#[trait_variant::make(NotificationRepository: Send)]
pub trait LocalNotificationRepository {
    async fn create(&self, notification: &Notification) -> NotificationResult<()>;

    async fn find_by_id(&self, id: NotificationId) -> NotificationResult<Option<Notification>>;

    /// Newest first
    async fn list_for_user(
        &self,
        user_id: UserId,
        unread_only: bool,
        page: PageQuery,
    ) -> NotificationResult<Page<Notification>>;

    async fn unread_count(&self, user_id: UserId) -> NotificationResult<u64>;

    /// `false` when already read
    async fn mark_read(&self, id: NotificationId, at: DateTime<Utc>) -> NotificationResult<bool>;

    /// Number of notifications that changed
    async fn mark_all_read(&self, user_id: UserId, at: DateTime<Utc>) -> NotificationResult<u64>;
}
