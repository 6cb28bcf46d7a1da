//! HTTP Handlers

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use kernel::actor::CurrentUser;
use platform::client::{extract_client_ip, extract_fingerprint};
use platform::cookie::{delete_cookie_header, extract_cookie, set_cookie_header};

use crate::application::config::AuthConfig;
use crate::application::{
    BindOrganizationUseCase, CheckSessionUseCase, GetProfileUseCase, SignInInput, SignInUseCase,
    SignOutUseCase, SignUpInput, SignUpUseCase,
};
use crate::domain::repository::{
    AuthRepository, AuthSessionRepository, OrganizationDirectory, UserRepository,
};
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    BindOrganizationRequest, SessionStatusResponse, SignInRequest, SignInResponse, SignUpRequest,
    SignUpResponse, UserResponse,
};

/// Shared state for auth handlers
pub struct AuthAppState<R, D>
where
    R: UserRepository + AuthRepository + AuthSessionRepository + Clone + Send + Sync + 'static,
    D: OrganizationDirectory + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub directory: Arc<D>,
    pub config: Arc<AuthConfig>,
}

impl<R, D> Clone for AuthAppState<R, D>
where
    R: UserRepository + AuthRepository + AuthSessionRepository + Clone + Send + Sync + 'static,
    D: OrganizationDirectory + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            directory: self.directory.clone(),
            config: self.config.clone(),
        }
    }
}

// ============================================================================
// Sign Up
// ============================================================================

/// POST /api/auth/signup
pub async fn sign_up<R, D>(
    State(state): State<AuthAppState<R, D>>,
    Json(req): Json<SignUpRequest>,
) -> AuthResult<impl IntoResponse>
where
    R: UserRepository + AuthRepository + AuthSessionRepository + Clone + Send + Sync + 'static,
    D: OrganizationDirectory + Send + Sync + 'static,
{
    let use_case = SignUpUseCase::new(state.repo.clone(), state.config.clone());

    let output = use_case
        .execute(SignUpInput {
            email: req.email,
            password: req.password,
            display_name: req.display_name,
            role: req.role,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            user_id: output.user_id,
            email: output.email,
            role: output.role.code().to_string(),
        }),
    ))
}

// ============================================================================
// Sign In
// ============================================================================

/// POST /api/auth/signin
pub async fn sign_in<R, D>(
    State(state): State<AuthAppState<R, D>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<SignInRequest>,
) -> AuthResult<impl IntoResponse>
where
    R: UserRepository + AuthRepository + AuthSessionRepository + Clone + Send + Sync + 'static,
    D: OrganizationDirectory + Send + Sync + 'static,
{
    let client_ip = extract_client_ip(&headers, Some(addr.ip()));
    let fingerprint = extract_fingerprint(&headers, client_ip)?;

    let use_case = SignInUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.repo.clone(),
        state.config.clone(),
    );

    let remember_me = req.remember_me;
    let output = use_case
        .execute(
            SignInInput {
                email: req.email,
                password: req.password,
                remember_me,
            },
            fingerprint,
        )
        .await?;

    let cookie = set_cookie_header(
        &state.config.session_cookie(remember_me),
        &output.session_token,
    )
    .ok_or_else(|| AuthError::Internal("Session token is not a valid header value".into()))?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(SignInResponse {
            user: output.user.into(),
            expires_at_ms: output.expires_at_ms,
        }),
    ))
}

// ============================================================================
// Sign Out
// ============================================================================

/// POST /api/auth/signout
pub async fn sign_out<R, D>(
    State(state): State<AuthAppState<R, D>>,
    headers: HeaderMap,
) -> AuthResult<impl IntoResponse>
where
    R: UserRepository + AuthRepository + AuthSessionRepository + Clone + Send + Sync + 'static,
    D: OrganizationDirectory + Send + Sync + 'static,
{
    if let Some(token) = extract_cookie(&headers, &state.config.session_cookie_name) {
        let use_case = SignOutUseCase::new(state.repo.clone(), state.config.clone());
        // The cookie is cleared either way
        if let Err(e) = use_case.execute(&token).await {
            tracing::debug!(error = %e, "Sign-out with unusable session token");
        }
    }

    let cookie = delete_cookie_header(&state.config.clear_cookie())
        .ok_or_else(|| AuthError::Internal("Invalid cookie configuration".into()))?;

    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]))
}

// ============================================================================
// Session Status
// ============================================================================

/// GET /api/auth/status
pub async fn session_status<R, D>(
    State(state): State<AuthAppState<R, D>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> AuthResult<Json<SessionStatusResponse>>
where
    R: UserRepository + AuthRepository + AuthSessionRepository + Clone + Send + Sync + 'static,
    D: OrganizationDirectory + Send + Sync + 'static,
{
    let client_ip = extract_client_ip(&headers, Some(addr.ip()));
    let fingerprint = extract_fingerprint(&headers, client_ip)?;

    let Some(token) = extract_cookie(&headers, &state.config.session_cookie_name) else {
        return Ok(Json(SessionStatusResponse::anonymous()));
    };

    let use_case =
        CheckSessionUseCase::new(state.repo.clone(), state.repo.clone(), state.config.clone());

    match use_case.execute(&token, &fingerprint.hash).await {
        Ok(info) => Ok(Json(SessionStatusResponse {
            authenticated: true,
            user_id: Some(info.user_id),
            role: Some(info.role.code().to_string()),
            organization_id: info.organization_id,
            expires_at_ms: Some(info.expires_at_ms),
        })),
        Err(AuthError::Database(e)) => Err(AuthError::Database(e)),
        Err(_) => Ok(Json(SessionStatusResponse::anonymous())),
    }
}

// ============================================================================
// Profile
// ============================================================================

/// GET /api/auth/me
pub async fn me<R, D>(
    State(state): State<AuthAppState<R, D>>,
    actor: CurrentUser,
) -> AuthResult<Json<UserResponse>>
where
    R: UserRepository + AuthRepository + AuthSessionRepository + Clone + Send + Sync + 'static,
    D: OrganizationDirectory + Send + Sync + 'static,
{
    let user = GetProfileUseCase::new(state.repo.clone())
        .execute(&actor.user_id)
        .await?;

    Ok(Json(user.into()))
}

/// PUT /api/auth/me/organization
pub async fn bind_organization<R, D>(
    State(state): State<AuthAppState<R, D>>,
    actor: CurrentUser,
    Json(req): Json<BindOrganizationRequest>,
) -> AuthResult<Json<UserResponse>>
where
    R: UserRepository + AuthRepository + AuthSessionRepository + Clone + Send + Sync + 'static,
    D: OrganizationDirectory + Send + Sync + 'static,
{
    let user = BindOrganizationUseCase::new(state.repo.clone(), state.directory.clone())
        .execute(&actor.user_id, req.organization_id)
        .await?;

    Ok(Json(user.into()))
}
