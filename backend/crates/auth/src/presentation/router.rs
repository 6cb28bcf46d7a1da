//! Auth Router

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::application::config::AuthConfig;
use crate::domain::repository::{
    AuthRepository, AuthSessionRepository, OrganizationDirectory, UserRepository,
};
use crate::presentation::handlers::{self, AuthAppState};

/// Auth router for any repository implementation
pub fn auth_router_generic<R, D>(repo: R, config: AuthConfig, directory: D) -> Router
where
    R: UserRepository + AuthRepository + AuthSessionRepository + Clone + Send + Sync + 'static,
    D: OrganizationDirectory + Send + Sync + 'static,
{
    auth_router_with_state(AuthAppState {
        repo: Arc::new(repo),
        directory: Arc::new(directory),
        config: Arc::new(config),
    })
}

pub fn auth_router_with_state<R, D>(state: AuthAppState<R, D>) -> Router
where
    R: UserRepository + AuthRepository + AuthSessionRepository + Clone + Send + Sync + 'static,
    D: OrganizationDirectory + Send + Sync + 'static,
{
    Router::new()
        .route("/signup", post(handlers::sign_up::<R, D>))
        .route("/signin", post(handlers::sign_in::<R, D>))
        .route("/signout", post(handlers::sign_out::<R, D>))
        .route("/status", get(handlers::session_status::<R, D>))
        .route("/me", get(handlers::me::<R, D>))
        .route("/me/organization", put(handlers::bind_organization::<R, D>))
        .with_state(state)
}
