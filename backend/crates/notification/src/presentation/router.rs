//! Notification Router

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::application::{EventBus, EventBusConfig};
use crate::domain::repository::NotificationRepository;
use crate::presentation::handlers::{self, NotificationAppState};
use crate::presentation::ws;

/// Notification + WebSocket routes (mounted under `/api`)
pub fn notification_router_generic<R>(repo: R, bus: EventBus, config: &EventBusConfig) -> Router
where
    R: NotificationRepository + Send + Sync + 'static,
{
    let state = NotificationAppState {
        repo: Arc::new(repo),
        bus,
        ping_interval: config.ping_interval,
    };

    Router::new()
        .route("/notifications", get(handlers::list::<R>))
        .route("/notifications/unread-count", get(handlers::unread_count::<R>))
        .route("/notifications/read-all", post(handlers::mark_all_read::<R>))
        .route("/notifications/{id}/read", post(handlers::mark_read::<R>))
        .route("/ws", get(ws::ws_handler::<R>))
        .with_state(state)
}
