//! Notification entity

use chrono::{DateTime, Utc};
use kernel::id::{NotificationId, UserId};
use serde::{Deserialize, Serialize};

use crate::domain::event::EventEnvelope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    CredentialIssued,
    CredentialRevoked,
    CredentialExpired,
    VerificationRequested,
    VerificationApproved,
    VerificationRejected,
    ApplicationStatusChanged,
    MessageReceived,
}

impl NotificationKind {
    pub const fn code(&self) -> &'static str {
        use NotificationKind::*;
        match self {
            CredentialIssued => "credential_issued",
            CredentialRevoked => "credential_revoked",
            CredentialExpired => "credential_expired",
            VerificationRequested => "verification_requested",
            VerificationApproved => "verification_approved",
            VerificationRejected => "verification_rejected",
            ApplicationStatusChanged => "application_status_changed",
            MessageReceived => "message_received",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        use NotificationKind::*;
        [
            CredentialIssued,
            CredentialRevoked,
            CredentialExpired,
            VerificationRequested,
            VerificationApproved,
            VerificationRejected,
            ApplicationStatusChanged,
            MessageReceived,
        ]
        .into_iter()
        .find(|kind| kind.code() == code)
    }
}

/// In-app notification addressed to one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub notification_id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    /// Relative UI path, e.g. `/credentials/<id>`
    pub link: Option<String>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            notification_id: NotificationId::new(),
            user_id,
            kind,
            title: title.into(),
            body: body.into(),
            link: None,
            read_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    /// `false` when it was already read
    pub fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if self.read_at.is_some() {
            return false;
        }
        self.read_at = Some(at);
        true
    }

    /// `notification.created` envelope, published to the recipient after the
    /// row is committed.
    pub fn to_event(&self) -> EventEnvelope {
        EventEnvelope::new(
            "notification.created",
            serde_json::json!({
                "notificationId": self.notification_id,
                "kind": self.kind,
                "title": self.title,
                "body": self.body,
                "link": self.link,
            }),
        )
        .with_entity("notification", self.notification_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes_roundtrip() {
        for kind in [
            NotificationKind::VerificationApproved,
            NotificationKind::MessageReceived,
            NotificationKind::CredentialExpired,
        ] {
            assert_eq!(NotificationKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(NotificationKind::from_code("unknown"), None);
    }

    #[test]
    fn test_mark_read_once() {
        let mut n = Notification::new(
            UserId::new(),
            NotificationKind::CredentialIssued,
            "Issued",
            "Your diploma was issued",
        );
        assert!(!n.is_read());
        assert!(n.mark_read(Utc::now()));
        assert!(!n.mark_read(Utc::now()));
        assert!(n.is_read());
    }

    #[test]
    fn test_to_event() {
        let n = Notification::new(UserId::new(), NotificationKind::MessageReceived, "t", "b")
            .with_link("/messages");
        let event = n.to_event();
        assert_eq!(event.event_type, "notification.created");
        assert_eq!(event.payload["kind"], "message_received");
        assert_eq!(event.payload["link"], "/messages");
    }
}
