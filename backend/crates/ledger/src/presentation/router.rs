//! Ledger Router

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::domain::gateway::LedgerGateway;
use crate::presentation::handlers::{self, LedgerAppState};

/// Ledger status and query routes (mounted under `/api/ledger`)
pub fn ledger_router_generic<G>(gateway: Arc<G>) -> Router
where
    G: LedgerGateway + Send + Sync + 'static,
{
    Router::new()
        .route("/status", get(handlers::status::<G>))
        .route(
            "/credentials/{id}/history",
            get(handlers::credential_history::<G>),
        )
        .route("/transactions/{tx_id}", get(handlers::transaction::<G>))
        .with_state(LedgerAppState { gateway })
}
