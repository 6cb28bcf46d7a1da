//! API Server Entry Point
//!
//! Loads configuration, picks the storage backend and serves every module
//! under `/api`. Uses `anyhow` for startup errors; request-level errors go
//! through `kernel::error::AppError`.

mod app;
mod config;
mod rate_limit;

use std::net::SocketAddr;
use std::sync::Arc;

use auth::domain::repository::{AuthRepository, AuthSessionRepository, UserRepository};
use auth::{InMemoryAuthRepository, PgAuthRepository};
use credential::{CredentialStore, InMemoryCredentialStore, PgCredentialStore};
use marketplace::{InMemoryMarketplaceStore, MarketplaceStore, PgMarketplaceStore};
use notification::{InMemoryNotificationRepository, NotificationRepository, PgNotificationRepository};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::{Runtime, Stores, build_router, spawn_background};
use crate::config::{ServerConfig, StorageBackend};

const DEFAULT_LOG_FILTER: &str = "api=info,auth=info,credential=info,ledger=info,marketplace=info,notification=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(storage = %config.storage, addr = %config.bind_addr, "Configuration loaded");

    match config.storage {
        StorageBackend::Postgres => {
            let pool = connect(&config).await?;
            let stores = Stores {
                auth: PgAuthRepository::new(pool.clone()),
                credentials: Arc::new(PgCredentialStore::new(pool.clone())),
                marketplace: Arc::new(PgMarketplaceStore::new(pool.clone())),
                notifications: PgNotificationRepository::new(pool),
            };
            cleanup_sessions(&stores.auth).await;
            serve(config, stores).await
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data is lost on restart");
            let notifications = InMemoryNotificationRepository::new();
            let stores = Stores {
                auth: InMemoryAuthRepository::new(),
                credentials: Arc::new(InMemoryCredentialStore::new(notifications.clone())),
                marketplace: Arc::new(InMemoryMarketplaceStore::new()),
                notifications,
            };
            serve(config, stores).await
        }
    }
}

async fn connect(config: &ServerConfig) -> anyhow::Result<PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set for postgres storage"))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(database_url)
        .await?;
    tracing::info!("Connected to database");

    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;
    tracing::info!("Migrations completed");

    Ok(pool)
}

/// Errors here should not prevent server startup
async fn cleanup_sessions<A>(repo: &A)
where
    A: AuthSessionRepository + Send + Sync,
{
    match repo.cleanup_expired().await {
        Ok(sessions) => {
            tracing::info!(sessions_deleted = sessions, "Auth session cleanup completed");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Auth session cleanup failed, continuing anyway");
        }
    }
}

async fn serve<A, C, M, N>(config: ServerConfig, stores: Stores<A, C, M, N>) -> anyhow::Result<()>
where
    A: UserRepository + AuthRepository + AuthSessionRepository + Clone + Send + Sync + 'static,
    C: CredentialStore,
    M: MarketplaceStore,
    N: NotificationRepository + Clone + Send + Sync + 'static,
{
    let runtime = Runtime::new(&config);
    let app = build_router(&config, &runtime, &stores);
    let workers = spawn_background(&runtime, stores.credentials.clone());

    tracing::info!("Listening on {}", config.bind_addr);
    let listener = TcpListener::bind(config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    for worker in workers {
        worker.abort();
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await
        }
    }
}
