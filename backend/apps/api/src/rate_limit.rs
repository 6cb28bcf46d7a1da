//! Per-client rate limiting middleware

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderValue, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use kernel::error::app_error::AppError;
use platform::client::client_key;
use platform::rate_limit::{RateLimitConfig, RateLimitStore, now_ms};

pub struct RateLimitState<S>
where
    S: RateLimitStore + Send + Sync + 'static,
{
    pub store: Arc<S>,
    pub config: Arc<RateLimitConfig>,
}

impl<S> Clone for RateLimitState<S>
where
    S: RateLimitStore + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S> RateLimitState<S>
where
    S: RateLimitStore + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, config: RateLimitConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    /// Drop finished windows once per window length
    pub async fn purge_loop(self) {
        let mut ticker = tokio::time::interval(self.config.window);
        loop {
            ticker.tick().await;
            if let Err(e) = self.store.purge_expired(&self.config, now_ms()).await {
                tracing::warn!(error = %e, "Rate limit purge failed");
            }
        }
    }
}

/// Use with `axum::middleware::from_fn_with_state`. A failing store lets the
/// request through.
pub async fn enforce_rate_limit<S>(
    State(state): State<RateLimitState<S>>,
    req: Request<Body>,
    next: Next,
) -> Response
where
    S: RateLimitStore + Send + Sync + 'static,
{
    let direct_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());
    let key = client_key(req.headers(), direct_ip);

    match state.store.check_and_increment(&key, &state.config).await {
        Ok(result) if result.allowed => next.run(req).await,
        Ok(result) => {
            let retry_after = result.retry_after_secs(now_ms());
            tracing::warn!(client = %key, retry_after, "Rate limit exceeded");
            let mut response = AppError::too_many_requests("Too many requests")
                .with_action("Wait before retrying")
                .into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
            response
        }
        Err(e) => {
            tracing::error!(error = %e, "Rate limit check failed");
            next.run(req).await
        }
    }
}
