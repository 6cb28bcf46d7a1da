//! Shared workflow plumbing: event publishing after commit and the anchoring
//! worker wake-up signal.

use std::sync::Arc;

use notification::{Audience, EventActor, EventBus, EventEnvelope, Notification};
use tokio::sync::Notify;

use crate::application::config::CredentialConfig;
use crate::domain::entity::{Credential, VerificationRequest};

/// Wakes the anchoring worker as soon as an outbox row is committed
#[derive(Clone, Default)]
pub struct AnchorWakeup(Arc<Notify>);

impl AnchorWakeup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wake(&self) {
        self.0.notify_one();
    }

    pub async fn notified(&self) {
        self.0.notified().await
    }
}

/// Everything a workflow use case needs besides its repository
#[derive(Clone)]
pub struct WorkflowContext {
    pub bus: EventBus,
    pub wakeup: AnchorWakeup,
    pub config: Arc<CredentialConfig>,
}

impl WorkflowContext {
    pub fn new(bus: EventBus, wakeup: AnchorWakeup, config: Arc<CredentialConfig>) -> Self {
        Self {
            bus,
            wakeup,
            config,
        }
    }

    /// Publish a credential event to its owner and institution
    pub fn publish_credential(
        &self,
        event_type: &str,
        credential: &Credential,
        request: Option<&VerificationRequest>,
        actor: EventActor,
    ) -> u64 {
        self.bus.publish(
            credential_event(event_type, credential, request).with_actor(actor),
            Audience::Parties(credential.owner_id, credential.institution_id),
        )
    }

    /// Push notifications that were committed with the change
    pub fn announce(&self, notifications: &[Notification]) {
        for n in notifications {
            self.bus.publish(n.to_event(), Audience::User(n.user_id));
        }
    }
}

pub fn credential_event(
    event_type: &str,
    credential: &Credential,
    request: Option<&VerificationRequest>,
) -> EventEnvelope {
    EventEnvelope::new(
        event_type,
        serde_json::json!({
            "credentialId": credential.credential_id,
            "ownerId": credential.owner_id,
            "institutionId": credential.institution_id,
            "title": credential.title,
            "status": credential.status,
            "anchorStatus": credential.anchor_status,
            "ledgerTxId": credential.ledger_tx_id,
            "requestId": request.map(|r| r.request_id),
            "requestStatus": request.map(|r| r.status),
        }),
    )
    .with_entity("credential", credential.credential_id.to_string())
}
