//! Router assembly and background tasks
//!
//! Generic over the storage backend so PostgreSQL and in-memory stores go
//! through exactly the same wiring.

use std::sync::Arc;

use auth::domain::repository::{AuthRepository, AuthSessionRepository, UserRepository};
use auth::{AuthMiddlewareState, auth_router_generic, resolve_current_user};
use axum::extract::State;
use axum::http::{HeaderValue, Method, header};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::{Json, Router};
use credential::{
    AnchorWakeup, CredentialStore, ExpirySweeper, LedgerAnchorWorker, WorkflowContext,
    credential_router_generic,
};
use ledger::{MockFabricNetwork, ledger_router_generic};
use marketplace::{
    CredentialParties, MarketplaceStore, OrganizationRegistry, marketplace_router_generic,
};
use notification::{EventBus, NotificationRepository, Notifier, notification_router_generic};
use platform::rate_limit::InMemoryRateLimitStore;
use serde::Serialize;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{ServerConfig, StorageBackend};
use crate::rate_limit::{RateLimitState, enforce_rate_limit};

/// Storage backing every module
pub struct Stores<A, C, M, N> {
    pub auth: A,
    pub credentials: Arc<C>,
    pub marketplace: Arc<M>,
    pub notifications: N,
}

/// Process-wide services shared by routers and workers
#[derive(Clone)]
pub struct Runtime {
    pub bus: EventBus,
    pub network: Arc<MockFabricNetwork>,
    pub workflow: WorkflowContext,
    pub rate_limiter: RateLimitState<InMemoryRateLimitStore>,
}

impl Runtime {
    pub fn new(config: &ServerConfig) -> Self {
        let bus = EventBus::new(&config.event_bus);
        let workflow = WorkflowContext::new(
            bus.clone(),
            AnchorWakeup::new(),
            Arc::new(config.credential.clone()),
        );
        Self {
            network: Arc::new(MockFabricNetwork::new(config.ledger.clone())),
            rate_limiter: RateLimitState::new(
                Arc::new(InMemoryRateLimitStore::new()),
                config.rate_limit.clone(),
            ),
            workflow,
            bus,
        }
    }
}

#[derive(Clone)]
struct HealthState {
    storage: StorageBackend,
    network: Arc<MockFabricNetwork>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    storage: &'static str,
    ledger_network: String,
    ledger_block_height: u64,
}

/// GET /api/health
async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        storage: state.storage.code(),
        ledger_network: state.network.config().network_name.clone(),
        ledger_block_height: state.network.block_height(),
    })
}

pub fn build_router<A, C, M, N>(
    config: &ServerConfig,
    runtime: &Runtime,
    stores: &Stores<A, C, M, N>,
) -> Router
where
    A: UserRepository + AuthRepository + AuthSessionRepository + Clone + Send + Sync + 'static,
    C: CredentialStore,
    M: MarketplaceStore,
    N: NotificationRepository + Clone + Send + Sync + 'static,
{
    let directory = OrganizationRegistry::new(stores.marketplace.clone());
    let notifier = Notifier::new(Arc::new(stores.notifications.clone()), runtime.bus.clone());

    let api = Router::new()
        .route(
            "/health",
            get(health).with_state(HealthState {
                storage: config.storage,
                network: runtime.network.clone(),
            }),
        )
        .nest(
            "/auth",
            auth_router_generic(stores.auth.clone(), config.auth.clone(), directory.clone()),
        )
        .nest("/ledger", ledger_router_generic(runtime.network.clone()))
        .merge(credential_router_generic(
            stores.credentials.clone(),
            Arc::new(CredentialParties::new(directory, Arc::new(stores.auth.clone()))),
            runtime.network.clone(),
            runtime.workflow.clone(),
        ))
        .merge(notification_router_generic(
            stores.notifications.clone(),
            runtime.bus.clone(),
            &config.event_bus,
        ))
        .merge(marketplace_router_generic(
            stores.marketplace.clone(),
            notifier,
        ));

    let session = AuthMiddlewareState::new(
        Arc::new(stores.auth.clone()),
        Arc::new(config.auth.clone()),
    );

    Router::new()
        .nest("/api", api)
        .layer(from_fn_with_state(session, resolve_current_user::<A>))
        .layer(from_fn_with_state(
            runtime.rate_limiter.clone(),
            enforce_rate_limit::<InMemoryRateLimitStore>,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors(&config.frontend_origins))
}

fn cors(origins: &[String]) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true)
}

/// Anchoring worker, expiry sweeper and rate limit purge. Aborted on shutdown.
pub fn spawn_background<C>(runtime: &Runtime, credentials: Arc<C>) -> Vec<JoinHandle<()>>
where
    C: CredentialStore,
{
    let anchor_worker = LedgerAnchorWorker::new(
        credentials.clone(),
        runtime.network.clone(),
        runtime.workflow.clone(),
    );
    let sweeper = ExpirySweeper::new(credentials, runtime.workflow.clone());

    vec![
        tokio::spawn(anchor_worker.run()),
        tokio::spawn(sweeper.run()),
        tokio::spawn(runtime.rate_limiter.clone().purge_loop()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth::InMemoryAuthRepository;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use credential::InMemoryCredentialStore;
    use ledger::LedgerConfig;
    use marketplace::InMemoryMarketplaceStore;
    use notification::{EventBusConfig, InMemoryNotificationRepository};
    use platform::rate_limit::RateLimitConfig;
    use tower::ServiceExt;

    fn config(max_requests: u32) -> ServerConfig {
        ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            storage: StorageBackend::Memory,
            database_url: None,
            db_max_connections: 1,
            frontend_origins: vec!["http://localhost:40922".to_string()],
            rate_limit: RateLimitConfig::new(max_requests, 60),
            auth: auth::AuthConfig::development(),
            ledger: LedgerConfig::instant(),
            credential: credential::CredentialConfig::development(),
            event_bus: EventBusConfig::default(),
        }
    }

    fn app(max_requests: u32) -> Router {
        let config = config(max_requests);
        let runtime = Runtime::new(&config);
        let notifications = InMemoryNotificationRepository::new();
        let stores = Stores {
            auth: InMemoryAuthRepository::new(),
            credentials: Arc::new(InMemoryCredentialStore::new(notifications.clone())),
            marketplace: Arc::new(InMemoryMarketplaceStore::new()),
            notifications,
        };
        build_router(&config, &runtime, &stores)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(100).oneshot(get_request("/api/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["storage"], "memory");
        assert_eq!(body["ledgerNetwork"], "credential-network");
        assert_eq!(body["ledgerBlockHeight"], 0);
    }

    #[tokio::test]
    async fn test_protected_routes_require_session() {
        let app = app(100);
        for uri in ["/api/notifications", "/api/jobs", "/api/credentials", "/api/auth/me"] {
            let response = app.clone().oneshot(get_request(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_rate_limit() {
        let app = app(2);
        for _ in 0..2 {
            let response = app.clone().oneshot(get_request("/api/health")).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let blocked = app.clone().oneshot(get_request("/api/health")).await.unwrap();
        assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(blocked.headers().contains_key(header::RETRY_AFTER));

        // Keyed per client
        let other = Request::builder()
            .uri("/api/health")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.oneshot(other).await.unwrap().status(), StatusCode::OK);
    }

    #[test]
    fn test_runtime_shares_bus() {
        let runtime = Runtime::new(&config(1));
        let mut receiver = runtime.bus.subscribe();
        runtime.workflow.bus.publish(
            notification::EventEnvelope::new("test.ping", serde_json::json!({})),
            notification::Audience::All,
        );
        assert_eq!(receiver.try_recv().unwrap().envelope.event_type, "test.ping");
    }
}
