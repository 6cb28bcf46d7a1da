//! HTTP Handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use kernel::actor::CurrentUser;
use kernel::id::CredentialId;

use crate::application::LedgerQueryUseCase;
use crate::domain::gateway::LedgerGateway;
use crate::error::LedgerResult;
use crate::presentation::dto::{
    CredentialHistoryResponse, LedgerStatusResponse, TransactionResponse,
};

pub struct LedgerAppState<G>
where
    G: LedgerGateway + Send + Sync + 'static,
{
    pub gateway: Arc<G>,
}

impl<G> Clone for LedgerAppState<G>
where
    G: LedgerGateway + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
        }
    }
}

/// GET /api/ledger/status
pub async fn status<G>(
    State(state): State<LedgerAppState<G>>,
    _actor: CurrentUser,
) -> LedgerResult<Json<LedgerStatusResponse>>
where
    G: LedgerGateway + Send + Sync + 'static,
{
    let status = LedgerQueryUseCase::new(state.gateway.clone()).status().await?;
    Ok(Json(status.into()))
}

/// GET /api/ledger/credentials/{id}/history
pub async fn credential_history<G>(
    State(state): State<LedgerAppState<G>>,
    _actor: CurrentUser,
    Path(credential_id): Path<CredentialId>,
) -> LedgerResult<Json<CredentialHistoryResponse>>
where
    G: LedgerGateway + Send + Sync + 'static,
{
    let receipts = LedgerQueryUseCase::new(state.gateway.clone())
        .credential_history(credential_id)
        .await?;

    Ok(Json(CredentialHistoryResponse {
        credential_id,
        transactions: receipts.into_iter().map(Into::into).collect(),
    }))
}

/// GET /api/ledger/transactions/{tx_id}
pub async fn transaction<G>(
    State(state): State<LedgerAppState<G>>,
    _actor: CurrentUser,
    Path(tx_id): Path<String>,
) -> LedgerResult<Json<TransactionResponse>>
where
    G: LedgerGateway + Send + Sync + 'static,
{
    let receipt = LedgerQueryUseCase::new(state.gateway.clone())
        .transaction(&tx_id)
        .await?;
    Ok(Json(receipt.into()))
}
