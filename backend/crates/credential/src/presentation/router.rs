//! Credential Router

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use ledger::LedgerGateway;

use crate::application::WorkflowContext;
use crate::domain::repository::{CredentialDirectory, CredentialStore};
use crate::presentation::handlers::{self, CredentialAppState};

/// Credential, verification-request and analytics routes (mounted under `/api`)
pub fn credential_router_generic<S, D, G>(
    store: Arc<S>,
    directory: Arc<D>,
    gateway: Arc<G>,
    ctx: WorkflowContext,
) -> Router
where
    S: CredentialStore,
    D: CredentialDirectory,
    G: LedgerGateway + Send + Sync + 'static,
{
    let state = CredentialAppState {
        store,
        directory,
        gateway,
        ctx,
    };

    Router::new()
        .route(
            "/credentials",
            get(handlers::list::<S, D, G>).post(handlers::upload::<S, D, G>),
        )
        .route("/credentials/issue", post(handlers::issue::<S, D, G>))
        .route("/credentials/{id}", get(handlers::get::<S, D, G>))
        .route(
            "/credentials/{id}/verification",
            get(handlers::verification_view::<S, D, G>),
        )
        .route("/credentials/{id}/revoke", post(handlers::revoke::<S, D, G>))
        .route(
            "/credentials/{id}/verification-requests",
            post(handlers::request_verification::<S, D, G>),
        )
        .route(
            "/verification-requests",
            get(handlers::list_requests::<S, D, G>),
        )
        .route(
            "/verification-requests/{id}",
            get(handlers::get_request::<S, D, G>),
        )
        .route(
            "/verification-requests/{id}/decision",
            post(handlers::decide::<S, D, G>),
        )
        .route("/analytics/credentials", get(handlers::analytics::<S, D, G>))
        .with_state(state)
}
