//! Auth Middleware
//!
//! Resolves the session cookie into a [`CurrentUser`] request extension.
//! Requests without a usable session pass through anonymously; handlers that
//! need a user reject them through the `CurrentUser` extractor.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use kernel::actor::CurrentUser;
use platform::client::{extract_client_ip, extract_fingerprint};
use platform::cookie::extract_cookie;

use crate::application::CheckSessionUseCase;
use crate::application::config::AuthConfig;
use crate::domain::repository::{AuthSessionRepository, UserRepository};
use crate::error::AuthError;

pub struct AuthMiddlewareState<R>
where
    R: AuthSessionRepository + UserRepository + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub config: Arc<AuthConfig>,
}

impl<R> Clone for AuthMiddlewareState<R>
where
    R: AuthSessionRepository + UserRepository + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            config: self.config.clone(),
        }
    }
}

impl<R> AuthMiddlewareState<R>
where
    R: AuthSessionRepository + UserRepository + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, config: Arc<AuthConfig>) -> Self {
        Self { repo, config }
    }
}

/// Use with `axum::middleware::from_fn_with_state`
pub async fn resolve_current_user<R>(
    State(state): State<AuthMiddlewareState<R>>,
    mut req: Request<Body>,
    next: Next,
) -> Response
where
    R: AuthSessionRepository + UserRepository + Send + Sync + 'static,
{
    let direct_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());

    if let Some(actor) = current_user(&state, req.headers(), direct_ip).await {
        req.extensions_mut().insert(actor);
    }
    next.run(req).await
}

async fn current_user<R>(
    state: &AuthMiddlewareState<R>,
    headers: &HeaderMap,
    direct_ip: Option<IpAddr>,
) -> Option<CurrentUser>
where
    R: AuthSessionRepository + UserRepository + Send + Sync + 'static,
{
    let token = extract_cookie(headers, &state.config.session_cookie_name)?;

    let client_ip = extract_client_ip(headers, direct_ip);
    let fingerprint = extract_fingerprint(headers, client_ip).ok()?;

    let use_case =
        CheckSessionUseCase::new(state.repo.clone(), state.repo.clone(), state.config.clone());
    match use_case.resolve(&token, &fingerprint.hash).await {
        Ok((_, user)) => Some(user.as_actor()),
        Err(AuthError::Database(e)) => {
            tracing::error!(error = %e, "Session lookup failed");
            None
        }
        Err(e) => {
            tracing::debug!(error = %e, "Request with unusable session");
            None
        }
    }
}
