//! HTTP Handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use kernel::actor::CurrentUser;
use kernel::id::{CredentialId, VerificationRequestId};
use kernel::pagination::Page;
use ledger::LedgerGateway;

use crate::application::{
    AnalyticsUseCase, CredentialQueryUseCase, DecideVerificationUseCase, IssueCredentialUseCase,
    RequestVerificationUseCase, RevokeCredentialUseCase, UploadCredentialUseCase,
    WorkflowContext,
};
use crate::domain::repository::{CredentialDirectory, CredentialStore};
use crate::domain::service::analytics::CredentialAnalytics;
use crate::error::CredentialResult;
use crate::presentation::dto::{
    AnalyticsQuery, CredentialResponse, DecisionBody, DecisionResponse, IssueCredentialRequest,
    ListCredentialsQuery, ListRequestsQuery, RequestVerificationBody, RevokeBody,
    UploadCredentialRequest, VerificationRequestResponse, VerificationViewResponse,
};

pub struct CredentialAppState<S, D, G>
where
    S: CredentialStore,
    D: CredentialDirectory,
    G: LedgerGateway + Send + Sync + 'static,
{
    pub store: Arc<S>,
    pub directory: Arc<D>,
    pub gateway: Arc<G>,
    pub ctx: WorkflowContext,
}

impl<S, D, G> Clone for CredentialAppState<S, D, G>
where
    S: CredentialStore,
    D: CredentialDirectory,
    G: LedgerGateway + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            directory: self.directory.clone(),
            gateway: self.gateway.clone(),
            ctx: self.ctx.clone(),
        }
    }
}

impl<S, D, G> CredentialAppState<S, D, G>
where
    S: CredentialStore,
    D: CredentialDirectory,
    G: LedgerGateway + Send + Sync + 'static,
{
    fn queries(&self) -> CredentialQueryUseCase<S, G> {
        CredentialQueryUseCase::new(self.store.clone(), self.gateway.clone())
    }
}

/// POST /api/credentials
pub async fn upload<S, D, G>(
    State(state): State<CredentialAppState<S, D, G>>,
    actor: CurrentUser,
    Json(body): Json<UploadCredentialRequest>,
) -> CredentialResult<(StatusCode, Json<CredentialResponse>)>
where
    S: CredentialStore,
    D: CredentialDirectory,
    G: LedgerGateway + Send + Sync + 'static,
{
    let credential =
        UploadCredentialUseCase::new(state.store.clone(), state.directory.clone(), state.ctx.clone())
            .execute(&actor, body.institution_id, body.credential.into())
            .await?;
    Ok((StatusCode::CREATED, Json(credential.into())))
}

/// POST /api/credentials/issue
pub async fn issue<S, D, G>(
    State(state): State<CredentialAppState<S, D, G>>,
    actor: CurrentUser,
    Json(body): Json<IssueCredentialRequest>,
) -> CredentialResult<(StatusCode, Json<CredentialResponse>)>
where
    S: CredentialStore,
    D: CredentialDirectory,
    G: LedgerGateway + Send + Sync + 'static,
{
    let credential =
        IssueCredentialUseCase::new(state.store.clone(), state.directory.clone(), state.ctx.clone())
            .execute(&actor, body.owner_id, body.credential.into())
            .await?;
    Ok((StatusCode::CREATED, Json(credential.into())))
}

/// GET /api/credentials
pub async fn list<S, D, G>(
    State(state): State<CredentialAppState<S, D, G>>,
    actor: CurrentUser,
    Query(query): Query<ListCredentialsQuery>,
) -> CredentialResult<Json<Page<CredentialResponse>>>
where
    S: CredentialStore,
    D: CredentialDirectory,
    G: LedgerGateway + Send + Sync + 'static,
{
    let page = state
        .queries()
        .list(&actor, query.filter(), query.page())
        .await?;
    Ok(Json(page.map(CredentialResponse::from)))
}

/// GET /api/credentials/{id}
pub async fn get<S, D, G>(
    State(state): State<CredentialAppState<S, D, G>>,
    actor: CurrentUser,
    Path(id): Path<CredentialId>,
) -> CredentialResult<Json<CredentialResponse>>
where
    S: CredentialStore,
    D: CredentialDirectory,
    G: LedgerGateway + Send + Sync + 'static,
{
    let credential = state.queries().get(&actor, id).await?;
    Ok(Json(credential.into()))
}

/// GET /api/credentials/{id}/verification
pub async fn verification_view<S, D, G>(
    State(state): State<CredentialAppState<S, D, G>>,
    _actor: CurrentUser,
    Path(id): Path<CredentialId>,
) -> CredentialResult<Json<VerificationViewResponse>>
where
    S: CredentialStore,
    D: CredentialDirectory,
    G: LedgerGateway + Send + Sync + 'static,
{
    let view = state.queries().verification_view(id).await?;
    Ok(Json(view.into()))
}

/// POST /api/credentials/{id}/revoke
pub async fn revoke<S, D, G>(
    State(state): State<CredentialAppState<S, D, G>>,
    actor: CurrentUser,
    Path(id): Path<CredentialId>,
    Json(body): Json<RevokeBody>,
) -> CredentialResult<Json<CredentialResponse>>
where
    S: CredentialStore,
    D: CredentialDirectory,
    G: LedgerGateway + Send + Sync + 'static,
{
    let credential = RevokeCredentialUseCase::new(state.store.clone(), state.ctx.clone())
        .execute(&actor, id, body.reason)
        .await?;
    Ok(Json(credential.into()))
}

/// POST /api/credentials/{id}/verification-requests
///
/// 201 for a new request, 200 when an open one already existed.
pub async fn request_verification<S, D, G>(
    State(state): State<CredentialAppState<S, D, G>>,
    actor: CurrentUser,
    Path(id): Path<CredentialId>,
    Json(body): Json<RequestVerificationBody>,
) -> CredentialResult<(StatusCode, Json<VerificationRequestResponse>)>
where
    S: CredentialStore,
    D: CredentialDirectory,
    G: LedgerGateway + Send + Sync + 'static,
{
    let output = RequestVerificationUseCase::new(state.store.clone(), state.ctx.clone())
        .execute(&actor, id, body.message)
        .await?;
    let status = if output.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(output.request.into())))
}

/// GET /api/verification-requests
pub async fn list_requests<S, D, G>(
    State(state): State<CredentialAppState<S, D, G>>,
    actor: CurrentUser,
    Query(query): Query<ListRequestsQuery>,
) -> CredentialResult<Json<Page<VerificationRequestResponse>>>
where
    S: CredentialStore,
    D: CredentialDirectory,
    G: LedgerGateway + Send + Sync + 'static,
{
    let page = state
        .queries()
        .list_requests(&actor, query.filter(), query.page())
        .await?;
    Ok(Json(page.map(VerificationRequestResponse::from)))
}

/// GET /api/verification-requests/{id}
pub async fn get_request<S, D, G>(
    State(state): State<CredentialAppState<S, D, G>>,
    actor: CurrentUser,
    Path(id): Path<VerificationRequestId>,
) -> CredentialResult<Json<VerificationRequestResponse>>
where
    S: CredentialStore,
    D: CredentialDirectory,
    G: LedgerGateway + Send + Sync + 'static,
{
    let request = state.queries().get_request(&actor, id).await?;
    Ok(Json(request.into()))
}

/// POST /api/verification-requests/{id}/decision
pub async fn decide<S, D, G>(
    State(state): State<CredentialAppState<S, D, G>>,
    actor: CurrentUser,
    Path(id): Path<VerificationRequestId>,
    Json(body): Json<DecisionBody>,
) -> CredentialResult<Json<DecisionResponse>>
where
    S: CredentialStore,
    D: CredentialDirectory,
    G: LedgerGateway + Send + Sync + 'static,
{
    let output = DecideVerificationUseCase::new(state.store.clone(), state.ctx.clone())
        .execute(&actor, id, body.decision, body.reason)
        .await?;
    Ok(Json(output.into()))
}

/// GET /api/analytics/credentials
pub async fn analytics<S, D, G>(
    State(state): State<CredentialAppState<S, D, G>>,
    actor: CurrentUser,
    Query(query): Query<AnalyticsQuery>,
) -> CredentialResult<Json<CredentialAnalytics>>
where
    S: CredentialStore,
    D: CredentialDirectory,
    G: LedgerGateway + Send + Sync + 'static,
{
    let analytics = AnalyticsUseCase::new(state.store.clone(), state.ctx.config.analytics_months)
        .execute(&actor, query.institution_id, query.months)
        .await?;
    Ok(Json(analytics))
}
