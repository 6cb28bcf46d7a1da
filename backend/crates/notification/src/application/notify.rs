//! Notification use cases

use std::sync::Arc;

use chrono::Utc;
use kernel::actor::CurrentUser;
use kernel::id::NotificationId;
use kernel::pagination::{Page, PageQuery};

use crate::application::bus::EventBus;
use crate::domain::event::Audience;
use crate::domain::notification::Notification;
use crate::domain::repository::NotificationRepository;
use crate::error::{NotificationError, NotificationResult};

/// Stores notifications and pushes them to the recipient's connections.
pub struct Notifier<R>
where
    R: NotificationRepository + Send + Sync + 'static,
{
    repo: Arc<R>,
    bus: EventBus,
}

impl<R> Clone for Notifier<R>
where
    R: NotificationRepository + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            bus: self.bus.clone(),
        }
    }
}

impl<R> Notifier<R>
where
    R: NotificationRepository + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, bus: EventBus) -> Self {
        Self { repo, bus }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub async fn notify(&self, notification: Notification) -> NotificationResult<Notification> {
        self.repo.create(&notification).await?;
        self.announce(&notification);
        Ok(notification)
    }

    /// Push a notification that was committed as part of another
    /// transaction.
    pub fn announce(&self, notification: &Notification) {
        self.bus
            .publish(notification.to_event(), Audience::User(notification.user_id));
    }
}

pub struct NotificationUseCase<R>
where
    R: NotificationRepository + Send + Sync + 'static,
{
    repo: Arc<R>,
}

impl<R> NotificationUseCase<R>
where
    R: NotificationRepository + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn list(
        &self,
        actor: &CurrentUser,
        unread_only: bool,
        page: PageQuery,
    ) -> NotificationResult<Page<Notification>> {
        self.repo
            .list_for_user(actor.user_id, unread_only, page)
            .await
    }

    pub async fn unread_count(&self, actor: &CurrentUser) -> NotificationResult<u64> {
        self.repo.unread_count(actor.user_id).await
    }

    /// Other users' notifications are reported as missing.
    pub async fn mark_read(
        &self,
        actor: &CurrentUser,
        id: NotificationId,
    ) -> NotificationResult<Notification> {
        let mut notification = self
            .repo
            .find_by_id(id)
            .await?
            .filter(|n| n.user_id == actor.user_id)
            .ok_or(NotificationError::NotificationNotFound)?;

        let now = Utc::now();
        if notification.mark_read(now) {
            self.repo.mark_read(id, now).await?;
        }
        Ok(notification)
    }

    pub async fn mark_all_read(&self, actor: &CurrentUser) -> NotificationResult<u64> {
        let changed = self.repo.mark_all_read(actor.user_id, Utc::now()).await?;
        tracing::debug!(user_id = %actor.user_id, changed, "Notifications marked read");
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::NotificationKind;
    use crate::infra::memory::InMemoryNotificationRepository;
    use kernel::actor::UserRole;
    use kernel::id::UserId;

    fn actor() -> CurrentUser {
        CurrentUser::new(UserId::new(), UserRole::Student, None)
    }

    #[tokio::test]
    async fn test_notify_persists_and_publishes() {
        let repo = Arc::new(InMemoryNotificationRepository::new());
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let notifier = Notifier::new(repo.clone(), bus);
        let me = actor();

        notifier
            .notify(Notification::new(
                me.user_id,
                NotificationKind::VerificationApproved,
                "Approved",
                "Your transcript was verified",
            ))
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.envelope.event_type, "notification.created");
        assert_eq!(event.audience, Audience::User(me.user_id));

        let use_case = NotificationUseCase::new(repo);
        assert_eq!(use_case.unread_count(&me).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_only_own() {
        let repo = Arc::new(InMemoryNotificationRepository::new());
        let me = actor();
        let other = actor();
        let n = Notification::new(me.user_id, NotificationKind::MessageReceived, "t", "b");
        repo.create(&n).await.unwrap();

        let use_case = NotificationUseCase::new(repo);
        assert!(matches!(
            use_case.mark_read(&other, n.notification_id).await,
            Err(NotificationError::NotificationNotFound)
        ));

        let read = use_case.mark_read(&me, n.notification_id).await.unwrap();
        assert!(read.is_read());
        assert_eq!(use_case.unread_count(&me).await.unwrap(), 0);

        // Second call is a no-op
        assert!(use_case.mark_read(&me, n.notification_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_unread_and_mark_all() {
        let repo = Arc::new(InMemoryNotificationRepository::new());
        let me = actor();
        for i in 0..3 {
            repo.create(&Notification::new(
                me.user_id,
                NotificationKind::ApplicationStatusChanged,
                format!("n{i}"),
                "b",
            ))
            .await
            .unwrap();
        }
        let use_case = NotificationUseCase::new(repo);

        let page = use_case.list(&me, true, PageQuery::new(2, 0)).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);

        assert_eq!(use_case.mark_all_read(&me).await.unwrap(), 3);
        let unread = use_case.list(&me, true, PageQuery::default()).await.unwrap();
        assert_eq!(unread.total, 0);
        let all = use_case.list(&me, false, PageQuery::default()).await.unwrap();
        assert_eq!(all.total, 3);
    }
}
