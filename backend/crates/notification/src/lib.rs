//! Notification Module
//!
//! In-app notifications and the real-time event stream.
//!
//! ## Delivery semantics
//!
//! - Every event gets a sequence number from a single counter; all
//!   WebSocket connections see events in that order.
//! - The broadcast buffer is bounded. A connection that cannot keep up is
//!   told how many events it missed (`lagged`) instead of stalling
//!   publishers.
//! - Recent events are kept in a replay ring so a reconnecting client can
//!   resume with `?since=<seq>`; if the gap is too old it gets `resync`.
//! - Clients acknowledge with `{"type":"ack","seq":n}`.

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

pub use application::{EventBus, EventBusConfig, NotificationUseCase, Notifier, Subscription};
pub use domain::{
    Audience, EventActor, EventEnvelope, Notification, NotificationKind, NotificationRepository,
    SequencedEvent,
};
pub use error::{NotificationError, NotificationResult};
pub use infra::{InMemoryNotificationRepository, PgNotificationRepository};
pub use presentation::router::notification_router_generic;
