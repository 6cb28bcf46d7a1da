//! Presentation Layer

pub mod dto;
pub mod handlers;
pub mod router;
pub mod ws;

pub use handlers::NotificationAppState;
pub use router::notification_router_generic;
