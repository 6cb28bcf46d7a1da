//! Event envelope and audience
//!
//! Every state change other crates want to surface in real time is wrapped
//! in an [`EventEnvelope`] with a dot-namespaced type (`credential.issued`,
//! `verification.approved`, ...). The bus stamps it with a sequence number
//! and an [`Audience`] that decides which WebSocket connections see it.

use chrono::{DateTime, Utc};
use kernel::actor::CurrentUser;
use kernel::id::{OrganizationId, UserId};
use serde::Serialize;
use uuid::Uuid;

/// Who caused an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventActor {
    /// `system` or `user`
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl EventActor {
    /// Background workers (anchoring, expiry sweeps)
    pub fn system() -> Self {
        Self {
            kind: "system".to_string(),
            id: None,
        }
    }

    pub fn user(id: UserId) -> Self {
        Self {
            kind: "user".to_string(),
            id: Some(id.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub actor: EventActor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    pub fn new(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            occurred_at: Utc::now(),
            actor: EventActor::system(),
            entity_type: None,
            entity_id: None,
            payload,
        }
    }

    pub fn with_actor(mut self, actor: EventActor) -> Self {
        self.actor = actor;
        self
    }

    pub fn with_entity(mut self, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }
}

/// Connections an event is delivered to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum Audience {
    All,
    User(UserId),
    Organization(OrganizationId),
    /// One user plus every member of one organization, e.g. a credential's
    /// owner and its institution
    Parties(UserId, OrganizationId),
}

impl Audience {
    pub fn admits(&self, viewer: &CurrentUser) -> bool {
        match self {
            Audience::All => true,
            Audience::User(user_id) => viewer.user_id == *user_id,
            Audience::Organization(org_id) => viewer.belongs_to(*org_id),
            Audience::Parties(user_id, org_id) => {
                viewer.user_id == *user_id || viewer.belongs_to(*org_id)
            }
        }
    }
}

/// An envelope after it went through the bus
#[derive(Debug, Clone, Serialize)]
pub struct SequencedEvent {
    pub seq: u64,
    #[serde(skip)]
    pub audience: Audience,
    #[serde(flatten)]
    pub envelope: EventEnvelope,
}
