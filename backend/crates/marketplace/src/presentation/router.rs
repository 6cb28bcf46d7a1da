//! Marketplace Router

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use notification::{NotificationRepository, Notifier};

use crate::domain::repository::MarketplaceStore;
use crate::presentation::handlers::{self, MarketplaceAppState};

/// Organization, job, application and message routes (mounted under `/api`)
pub fn marketplace_router_generic<S, N>(store: Arc<S>, notifier: Notifier<N>) -> Router
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    let state = MarketplaceAppState { store, notifier };

    Router::new()
        .route(
            "/organizations",
            get(handlers::list_organizations::<S, N>).post(handlers::create_organization::<S, N>),
        )
        .route("/organizations/{id}", get(handlers::get_organization::<S, N>))
        .route(
            "/organizations/{id}/verify",
            post(handlers::verify_organization::<S, N>),
        )
        .route(
            "/jobs",
            get(handlers::list_jobs::<S, N>).post(handlers::post_job::<S, N>),
        )
        .route(
            "/jobs/{id}",
            get(handlers::get_job::<S, N>).patch(handlers::update_job::<S, N>),
        )
        .route("/jobs/{id}/close", post(handlers::close_job::<S, N>))
        .route(
            "/jobs/{id}/applications",
            get(handlers::list_job_applications::<S, N>).post(handlers::apply::<S, N>),
        )
        .route("/applications/mine", get(handlers::my_applications::<S, N>))
        .route("/applications/{id}", get(handlers::get_application::<S, N>))
        .route(
            "/applications/{id}/status",
            put(handlers::update_application_status::<S, N>),
        )
        .route(
            "/applications/{id}/withdraw",
            post(handlers::withdraw_application::<S, N>),
        )
        .route(
            "/messages",
            get(handlers::inbox::<S, N>).post(handlers::send_message::<S, N>),
        )
        .route(
            "/messages/with/{user_id}",
            get(handlers::conversation::<S, N>),
        )
        .route("/messages/{id}/read", post(handlers::mark_message_read::<S, N>))
        .with_state(state)
}
