//! In-memory notification repository

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::{NotificationId, UserId};
use kernel::pagination::{Page, PageQuery};
use tokio::sync::RwLock;

use crate::domain::notification::Notification;
use crate::domain::repository::NotificationRepository;
use crate::error::NotificationResult;

#[derive(Clone, Default)]
pub struct InMemoryNotificationRepository {
    // Insertion order is creation order
    notifications: Arc<RwLock<Vec<Notification>>>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything stored for `user_id`, oldest first
    pub async fn all_for(&self, user_id: UserId) -> Vec<Notification> {
        self.notifications
            .read()
            .await
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }
}

impl NotificationRepository for InMemoryNotificationRepository {
    async fn create(&self, notification: &Notification) -> NotificationResult<()> {
        self.notifications.write().await.push(notification.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: NotificationId) -> NotificationResult<Option<Notification>> {
        Ok(self
            .notifications
            .read()
            .await
            .iter()
            .find(|n| n.notification_id == id)
            .cloned())
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        unread_only: bool,
        page: PageQuery,
    ) -> NotificationResult<Page<Notification>> {
        let matching: Vec<Notification> = self
            .notifications
            .read()
            .await
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read()))
            .cloned()
            .collect();
        Ok(page.slice(&matching))
    }

    async fn unread_count(&self, user_id: UserId) -> NotificationResult<u64> {
        Ok(self
            .notifications
            .read()
            .await
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read())
            .count() as u64)
    }

    async fn mark_read(&self, id: NotificationId, at: DateTime<Utc>) -> NotificationResult<bool> {
        Ok(self
            .notifications
            .write()
            .await
            .iter_mut()
            .find(|n| n.notification_id == id)
            .map(|n| n.mark_read(at))
            .unwrap_or(false))
    }

    async fn mark_all_read(&self, user_id: UserId, at: DateTime<Utc>) -> NotificationResult<u64> {
        let mut changed = 0;
        for n in self
            .notifications
            .write()
            .await
            .iter_mut()
            .filter(|n| n.user_id == user_id)
        {
            if n.mark_read(at) {
                changed += 1;
            }
        }
        Ok(changed)
    }
}
