//! Direct message between two users

use chrono::{DateTime, Utc};
use kernel::id::{MessageId, UserId};

use crate::error::{MarketplaceError, MarketplaceResult};

pub const BODY_MAX_LENGTH: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub message_id: MessageId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub body: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        sender_id: UserId,
        recipient_id: UserId,
        body: String,
        now: DateTime<Utc>,
    ) -> MarketplaceResult<Self> {
        if sender_id == recipient_id {
            return Err(MarketplaceError::Validation(
                "cannot send a message to yourself".to_string(),
            ));
        }
        let body = body.trim().to_string();
        let length = body.chars().count();
        if length == 0 || length > BODY_MAX_LENGTH {
            return Err(MarketplaceError::Validation(format!(
                "body must be 1 to {BODY_MAX_LENGTH} characters"
            )));
        }

        Ok(Self {
            message_id: MessageId::new(),
            sender_id,
            recipient_id,
            body,
            read_at: None,
            created_at: now,
        })
    }

    /// `false` when it was already read
    pub fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if self.read_at.is_some() {
            return false;
        }
        self.read_at = Some(at);
        true
    }

    /// Short excerpt for notifications
    pub fn preview(&self) -> String {
        const PREVIEW_LENGTH: usize = 80;
        if self.body.chars().count() <= PREVIEW_LENGTH {
            return self.body.clone();
        }
        let mut preview: String = self.body.chars().take(PREVIEW_LENGTH).collect();
        preview.push('…');
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_limits() {
        let (a, b) = (UserId::new(), UserId::new());
        assert!(Message::new(a, b, "  ".to_string(), Utc::now()).is_err());
        assert!(Message::new(a, b, "x".repeat(BODY_MAX_LENGTH + 1), Utc::now()).is_err());
        assert!(Message::new(a, b, "x".repeat(BODY_MAX_LENGTH), Utc::now()).is_ok());
    }

    #[test]
    fn test_no_self_messages() {
        let a = UserId::new();
        assert!(matches!(
            Message::new(a, a, "hello".to_string(), Utc::now()),
            Err(MarketplaceError::Validation(_))
        ));
    }

    #[test]
    fn test_preview_truncates() {
        let message = Message::new(UserId::new(), UserId::new(), "é".repeat(100), Utc::now()).unwrap();
        assert_eq!(message.preview().chars().count(), 81);
        assert!(message.preview().ends_with('…'));
    }
}
