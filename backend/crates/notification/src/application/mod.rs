//! Application Layer

pub mod bus;
pub mod config;
pub mod notify;

pub use bus::{EventBus, Subscription};
pub use config::EventBusConfig;
pub use notify::{NotificationUseCase, Notifier};
