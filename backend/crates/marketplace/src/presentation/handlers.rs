//! HTTP Handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use kernel::actor::CurrentUser;
use kernel::id::{ApplicationId, JobId, MessageId, OrganizationId, UserId};
use kernel::pagination::{Page, PageQuery};
use notification::{NotificationRepository, Notifier};

use crate::application::{ApplicationUseCase, JobUseCase, MessageUseCase, OrganizationUseCase};
use crate::domain::repository::MarketplaceStore;
use crate::error::MarketplaceResult;
use crate::presentation::dto::{
    ApplicationResponse, ApplyRequest, CreateOrganizationRequest, InboxQuery, JobResponse,
    ListJobsQuery, ListOrganizationsQuery, MessageResponse, OrganizationResponse, PostJobRequest,
    SendMessageRequest, UpdateApplicationStatusRequest, UpdateJobRequest,
};

pub struct MarketplaceAppState<S, N>
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    pub store: Arc<S>,
    pub notifier: Notifier<N>,
}

impl<S, N> Clone for MarketplaceAppState<S, N>
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

impl<S, N> MarketplaceAppState<S, N>
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    fn jobs(&self) -> JobUseCase<S> {
        JobUseCase::new(self.store.clone(), self.notifier.bus().clone())
    }

    fn applications(&self) -> ApplicationUseCase<S, N> {
        ApplicationUseCase::new(self.store.clone(), self.notifier.clone())
    }

    fn messages(&self) -> MessageUseCase<S, N> {
        MessageUseCase::new(self.store.clone(), self.notifier.clone())
    }
}

// ============================================================================
// Organizations
// ============================================================================

/// POST /api/organizations
pub async fn create_organization<S, N>(
    State(state): State<MarketplaceAppState<S, N>>,
    actor: CurrentUser,
    Json(body): Json<CreateOrganizationRequest>,
) -> MarketplaceResult<(StatusCode, Json<OrganizationResponse>)>
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    let organization = OrganizationUseCase::new(state.store.clone())
        .create(&actor, body.into())
        .await?;
    Ok((StatusCode::CREATED, Json(organization.into())))
}

/// GET /api/organizations
pub async fn list_organizations<S, N>(
    State(state): State<MarketplaceAppState<S, N>>,
    _actor: CurrentUser,
    Query(query): Query<ListOrganizationsQuery>,
) -> MarketplaceResult<Json<Page<OrganizationResponse>>>
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    let page = PageQuery {
        limit: query.limit,
        offset: query.offset,
    };
    let page = OrganizationUseCase::new(state.store.clone())
        .list(query.kind, page)
        .await?;
    Ok(Json(page.map(OrganizationResponse::from)))
}

/// GET /api/organizations/{id}
pub async fn get_organization<S, N>(
    State(state): State<MarketplaceAppState<S, N>>,
    _actor: CurrentUser,
    Path(id): Path<OrganizationId>,
) -> MarketplaceResult<Json<OrganizationResponse>>
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    let organization = OrganizationUseCase::new(state.store.clone()).get(id).await?;
    Ok(Json(organization.into()))
}

/// POST /api/organizations/{id}/verify
pub async fn verify_organization<S, N>(
    State(state): State<MarketplaceAppState<S, N>>,
    actor: CurrentUser,
    Path(id): Path<OrganizationId>,
) -> MarketplaceResult<Json<OrganizationResponse>>
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    let organization = OrganizationUseCase::new(state.store.clone())
        .verify(&actor, id)
        .await?;
    Ok(Json(organization.into()))
}

// ============================================================================
// Jobs
// ============================================================================

/// POST /api/jobs
pub async fn post_job<S, N>(
    State(state): State<MarketplaceAppState<S, N>>,
    actor: CurrentUser,
    Json(body): Json<PostJobRequest>,
) -> MarketplaceResult<(StatusCode, Json<JobResponse>)>
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    let job = state.jobs().post(&actor, body.into()).await?;
    Ok((StatusCode::CREATED, Json(job.into())))
}

/// GET /api/jobs
pub async fn list_jobs<S, N>(
    State(state): State<MarketplaceAppState<S, N>>,
    _actor: CurrentUser,
    Query(query): Query<ListJobsQuery>,
) -> MarketplaceResult<Json<Page<JobResponse>>>
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    let page = state.jobs().list(query.filter(), query.page()).await?;
    Ok(Json(page.map(JobResponse::from)))
}

/// GET /api/jobs/{id}
pub async fn get_job<S, N>(
    State(state): State<MarketplaceAppState<S, N>>,
    _actor: CurrentUser,
    Path(id): Path<JobId>,
) -> MarketplaceResult<Json<JobResponse>>
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    let job = state.jobs().get(id).await?;
    Ok(Json(job.into()))
}

/// PATCH /api/jobs/{id}
pub async fn update_job<S, N>(
    State(state): State<MarketplaceAppState<S, N>>,
    actor: CurrentUser,
    Path(id): Path<JobId>,
    Json(body): Json<UpdateJobRequest>,
) -> MarketplaceResult<Json<JobResponse>>
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    let job = state.jobs().update(&actor, id, body.into()).await?;
    Ok(Json(job.into()))
}

/// POST /api/jobs/{id}/close
pub async fn close_job<S, N>(
    State(state): State<MarketplaceAppState<S, N>>,
    actor: CurrentUser,
    Path(id): Path<JobId>,
) -> MarketplaceResult<Json<JobResponse>>
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    let job = state.jobs().close(&actor, id).await?;
    Ok(Json(job.into()))
}

// ============================================================================
// Applications
// ============================================================================

/// POST /api/jobs/{id}/applications
pub async fn apply<S, N>(
    State(state): State<MarketplaceAppState<S, N>>,
    actor: CurrentUser,
    Path(id): Path<JobId>,
    Json(body): Json<ApplyRequest>,
) -> MarketplaceResult<(StatusCode, Json<ApplicationResponse>)>
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    let application = state.applications().apply(&actor, id, body.into()).await?;
    Ok((StatusCode::CREATED, Json(application.into())))
}

/// GET /api/jobs/{id}/applications
pub async fn list_job_applications<S, N>(
    State(state): State<MarketplaceAppState<S, N>>,
    actor: CurrentUser,
    Path(id): Path<JobId>,
    Query(page): Query<PageQuery>,
) -> MarketplaceResult<Json<Page<ApplicationResponse>>>
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    let page = state.applications().list_for_job(&actor, id, page).await?;
    Ok(Json(page.map(ApplicationResponse::from)))
}

/// GET /api/applications/mine
pub async fn my_applications<S, N>(
    State(state): State<MarketplaceAppState<S, N>>,
    actor: CurrentUser,
    Query(page): Query<PageQuery>,
) -> MarketplaceResult<Json<Page<ApplicationResponse>>>
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    let page = state.applications().list_mine(&actor, page).await?;
    Ok(Json(page.map(ApplicationResponse::from)))
}

/// GET /api/applications/{id}
pub async fn get_application<S, N>(
    State(state): State<MarketplaceAppState<S, N>>,
    actor: CurrentUser,
    Path(id): Path<ApplicationId>,
) -> MarketplaceResult<Json<ApplicationResponse>>
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    let application = state.applications().get(&actor, id).await?;
    Ok(Json(application.into()))
}

/// PUT /api/applications/{id}/status
pub async fn update_application_status<S, N>(
    State(state): State<MarketplaceAppState<S, N>>,
    actor: CurrentUser,
    Path(id): Path<ApplicationId>,
    Json(body): Json<UpdateApplicationStatusRequest>,
) -> MarketplaceResult<Json<ApplicationResponse>>
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    let application = state
        .applications()
        .update_status(&actor, id, body.status)
        .await?;
    Ok(Json(application.into()))
}

/// POST /api/applications/{id}/withdraw
pub async fn withdraw_application<S, N>(
    State(state): State<MarketplaceAppState<S, N>>,
    actor: CurrentUser,
    Path(id): Path<ApplicationId>,
) -> MarketplaceResult<Json<ApplicationResponse>>
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    let application = state.applications().withdraw(&actor, id).await?;
    Ok(Json(application.into()))
}

// ============================================================================
// Messages
// ============================================================================

/// POST /api/messages
pub async fn send_message<S, N>(
    State(state): State<MarketplaceAppState<S, N>>,
    actor: CurrentUser,
    Json(body): Json<SendMessageRequest>,
) -> MarketplaceResult<(StatusCode, Json<MessageResponse>)>
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    let message = state
        .messages()
        .send(&actor, body.recipient_id, body.body)
        .await?;
    Ok((StatusCode::CREATED, Json(message.into())))
}

/// GET /api/messages
pub async fn inbox<S, N>(
    State(state): State<MarketplaceAppState<S, N>>,
    actor: CurrentUser,
    Query(query): Query<InboxQuery>,
) -> MarketplaceResult<Json<Page<MessageResponse>>>
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    let page = PageQuery {
        limit: query.limit,
        offset: query.offset,
    };
    let page = state
        .messages()
        .inbox(&actor, query.unread_only, page)
        .await?;
    Ok(Json(page.map(MessageResponse::from)))
}

/// GET /api/messages/with/{user_id}
pub async fn conversation<S, N>(
    State(state): State<MarketplaceAppState<S, N>>,
    actor: CurrentUser,
    Path(user_id): Path<UserId>,
    Query(page): Query<PageQuery>,
) -> MarketplaceResult<Json<Page<MessageResponse>>>
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    let page = state.messages().conversation(&actor, user_id, page).await?;
    Ok(Json(page.map(MessageResponse::from)))
}

/// POST /api/messages/{id}/read
pub async fn mark_message_read<S, N>(
    State(state): State<MarketplaceAppState<S, N>>,
    actor: CurrentUser,
    Path(id): Path<MessageId>,
) -> MarketplaceResult<Json<MessageResponse>>
where
    S: MarketplaceStore,
    N: NotificationRepository + Send + Sync + 'static,
{
    let message = state.messages().mark_read(&actor, id).await?;
    Ok(Json(message.into()))
}
