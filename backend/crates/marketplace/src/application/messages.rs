//! Direct messaging

use std::sync::Arc;

use chrono::Utc;
use kernel::actor::CurrentUser;
use kernel::id::{MessageId, UserId};
use kernel::pagination::{Page, PageQuery};
use notification::{
    Audience, EventActor, EventEnvelope, Notification, NotificationKind, NotificationRepository,
    Notifier,
};

use crate::domain::entity::Message;
use crate::domain::repository::MessageRepository;
use crate::error::{MarketplaceError, MarketplaceResult};

pub struct MessageUseCase<R, N>
where
    R: MessageRepository + Send + Sync + 'static,
    N: NotificationRepository + Send + Sync + 'static,
{
    repo: Arc<R>,
    notifier: Notifier<N>,
}

impl<R, N> MessageUseCase<R, N>
where
    R: MessageRepository + Send + Sync + 'static,
    N: NotificationRepository + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, notifier: Notifier<N>) -> Self {
        Self { repo, notifier }
    }

    pub async fn send(
        &self,
        actor: &CurrentUser,
        recipient_id: UserId,
        body: String,
    ) -> MarketplaceResult<Message> {
        let message = Message::new(actor.user_id, recipient_id, body, Utc::now())?;
        self.repo.create_message(&message).await?;

        tracing::debug!(
            message_id = %message.message_id,
            sender_id = %actor.user_id,
            %recipient_id,
            "Message sent"
        );
        self.notifier.bus().publish(
            message_event(&message).with_actor(EventActor::user(actor.user_id)),
            Audience::User(recipient_id),
        );

        let notice = Notification::new(
            recipient_id,
            NotificationKind::MessageReceived,
            "New message",
            message.preview(),
        )
        .with_link(format!("/messages/with/{}", actor.user_id));
        if let Err(e) = self.notifier.notify(notice).await {
            tracing::warn!(message_id = %message.message_id, error = %e, "Failed to notify recipient");
        }
        Ok(message)
    }

    pub async fn inbox(
        &self,
        actor: &CurrentUser,
        unread_only: bool,
        page: PageQuery,
    ) -> MarketplaceResult<Page<Message>> {
        self.repo.inbox(actor.user_id, unread_only, page).await
    }

    pub async fn conversation(
        &self,
        actor: &CurrentUser,
        other_id: UserId,
        page: PageQuery,
    ) -> MarketplaceResult<Page<Message>> {
        self.repo.conversation(actor.user_id, other_id, page).await
    }

    /// Recipient only; anyone else sees 404
    pub async fn mark_read(
        &self,
        actor: &CurrentUser,
        message_id: MessageId,
    ) -> MarketplaceResult<Message> {
        let mut message = self
            .repo
            .find_message(message_id)
            .await?
            .filter(|m| m.recipient_id == actor.user_id)
            .ok_or(MarketplaceError::MessageNotFound)?;

        let now = Utc::now();
        if message.mark_read(now) {
            self.repo.mark_message_read(message_id, now).await?;
        }
        Ok(message)
    }
}

fn message_event(message: &Message) -> EventEnvelope {
    EventEnvelope::new(
        "message.received",
        serde_json::json!({
            "messageId": message.message_id,
            "senderId": message.sender_id,
            "recipientId": message.recipient_id,
            "preview": message.preview(),
        }),
    )
    .with_entity("message", message.message_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fixtures::*;

    #[tokio::test]
    async fn test_send_publishes_and_notifies() {
        let env = MarketEnv::new().await;
        let recruiter = env.employer();
        let student = env.student();
        let use_case = MessageUseCase::new(env.store.clone(), env.notifier());
        let mut rx = env.bus.subscribe();

        use_case
            .send(&recruiter, student.user_id, "Are you free for an interview?".to_string())
            .await
            .unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(event.envelope.event_type, "message.received");
        assert_eq!(event.audience, Audience::User(student.user_id));
        assert_eq!(rx.try_recv().unwrap().envelope.event_type, "notification.created");

        let notices = env.notifications.all_for(student.user_id).await;
        assert_eq!(notices[0].kind, NotificationKind::MessageReceived);
        assert_eq!(notices[0].body, "Are you free for an interview?");
    }

    #[tokio::test]
    async fn test_conversation_is_chronological_and_private() {
        let env = MarketEnv::new().await;
        let recruiter = env.employer();
        let student = env.student();
        let bystander = env.student();
        let use_case = MessageUseCase::new(env.store.clone(), env.notifier());

        use_case.send(&recruiter, student.user_id, "Hello".to_string()).await.unwrap();
        use_case.send(&student, recruiter.user_id, "Hi!".to_string()).await.unwrap();
        use_case.send(&bystander, student.user_id, "Unrelated".to_string()).await.unwrap();

        let thread = use_case
            .conversation(&student, recruiter.user_id, PageQuery::default())
            .await
            .unwrap();
        let bodies: Vec<&str> = thread.items.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["Hello", "Hi!"]);

        let inbox = use_case.inbox(&student, false, PageQuery::default()).await.unwrap();
        assert_eq!(inbox.total, 2);
        assert_eq!(inbox.items[0].body, "Unrelated");
    }

    #[tokio::test]
    async fn test_mark_read_recipient_only() {
        let env = MarketEnv::new().await;
        let recruiter = env.employer();
        let student = env.student();
        let use_case = MessageUseCase::new(env.store.clone(), env.notifier());
        let message = use_case
            .send(&recruiter, student.user_id, "Offer attached".to_string())
            .await
            .unwrap();

        assert!(matches!(
            use_case.mark_read(&recruiter, message.message_id).await,
            Err(MarketplaceError::MessageNotFound)
        ));
        let read = use_case.mark_read(&student, message.message_id).await.unwrap();
        assert!(read.read_at.is_some());

        let unread = use_case.inbox(&student, true, PageQuery::default()).await.unwrap();
        assert_eq!(unread.total, 0);
    }
}
