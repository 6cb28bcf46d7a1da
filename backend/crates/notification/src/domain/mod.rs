//! Domain Layer

pub mod event;
pub mod notification;
pub mod repository;

pub use event::{Audience, EventActor, EventEnvelope, SequencedEvent};
pub use notification::{Notification, NotificationKind};
pub use repository::NotificationRepository;
