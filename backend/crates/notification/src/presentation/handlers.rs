//! HTTP Handlers

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, Query, State};
use kernel::actor::CurrentUser;
use kernel::id::NotificationId;
use kernel::pagination::Page;

use crate::application::{EventBus, NotificationUseCase};
use crate::domain::repository::NotificationRepository;
use crate::error::NotificationResult;
use crate::presentation::dto::{
    ListNotificationsQuery, MarkAllReadResponse, NotificationResponse, UnreadCountResponse,
};

pub struct NotificationAppState<R>
where
    R: NotificationRepository + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub bus: EventBus,
    pub ping_interval: Duration,
}

impl<R> Clone for NotificationAppState<R>
where
    R: NotificationRepository + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            bus: self.bus.clone(),
            ping_interval: self.ping_interval,
        }
    }
}

/// GET /api/notifications
pub async fn list<R>(
    State(state): State<NotificationAppState<R>>,
    actor: CurrentUser,
    Query(query): Query<ListNotificationsQuery>,
) -> NotificationResult<Json<Page<NotificationResponse>>>
where
    R: NotificationRepository + Send + Sync + 'static,
{
    let page = NotificationUseCase::new(state.repo.clone())
        .list(&actor, query.unread_only, query.page())
        .await?;
    Ok(Json(page.map(NotificationResponse::from)))
}

/// GET /api/notifications/unread-count
pub async fn unread_count<R>(
    State(state): State<NotificationAppState<R>>,
    actor: CurrentUser,
) -> NotificationResult<Json<UnreadCountResponse>>
where
    R: NotificationRepository + Send + Sync + 'static,
{
    let unread = NotificationUseCase::new(state.repo.clone())
        .unread_count(&actor)
        .await?;
    Ok(Json(UnreadCountResponse { unread }))
}

/// POST /api/notifications/{id}/read
pub async fn mark_read<R>(
    State(state): State<NotificationAppState<R>>,
    actor: CurrentUser,
    Path(id): Path<NotificationId>,
) -> NotificationResult<Json<NotificationResponse>>
where
    R: NotificationRepository + Send + Sync + 'static,
{
    let notification = NotificationUseCase::new(state.repo.clone())
        .mark_read(&actor, id)
        .await?;
    Ok(Json(notification.into()))
}

/// POST /api/notifications/read-all
pub async fn mark_all_read<R>(
    State(state): State<NotificationAppState<R>>,
    actor: CurrentUser,
) -> NotificationResult<Json<MarkAllReadResponse>>
where
    R: NotificationRepository + Send + Sync + 'static,
{
    let updated = NotificationUseCase::new(state.repo.clone())
        .mark_all_read(&actor)
        .await?;
    Ok(Json(MarkAllReadResponse { updated }))
}
