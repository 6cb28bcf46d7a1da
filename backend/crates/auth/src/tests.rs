//! Crate-level tests for the auth module

#[cfg(test)]
mod config_tests {
    use crate::application::config::*;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = AuthConfig::default();

        assert_eq!(config.session_cookie_name, "cm_session");
        assert_eq!(config.session_ttl_short, Duration::from_secs(12 * 3600));
        assert_eq!(config.session_ttl_long, Duration::from_secs(7 * 24 * 3600));
        assert!(config.cookie_secure);
        assert_eq!(config.cookie_same_site, SameSite::Lax);
        assert!(config.pepper().is_none());
    }

    #[test]
    fn test_random_secrets_differ() {
        let a = AuthConfig::with_random_secret();
        let b = AuthConfig::with_random_secret();
        assert_ne!(a.session_secret, b.session_secret);
        assert!(!AuthConfig::development().cookie_secure);
    }
}

#[cfg(test)]
mod models_tests {
    use crate::presentation::dto::*;

    #[test]
    fn test_sign_up_request_deserialization() {
        let json = r#"{"email":"a@b.example","password":"x","displayName":"A B","role":"student"}"#;
        let req: SignUpRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.display_name, "A B");
        assert_eq!(req.role, "student");
    }

    #[test]
    fn test_sign_in_request_remember_me_defaults_false() {
        let req: SignInRequest =
            serde_json::from_str(r#"{"email":"a@b.example","password":"x"}"#).unwrap();
        assert!(!req.remember_me);
    }

    #[test]
    fn test_session_status_serialization() {
        let json = serde_json::to_string(&SessionStatusResponse::anonymous()).unwrap();
        assert!(json.contains(r#""authenticated":false"#));
        assert!(json.contains("expiresAtMs"));
        assert!(json.contains("organizationId"));
    }
}

#[cfg(test)]
mod error_tests {
    use crate::error::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use kernel::error::app_error::AppError;

    #[test]
    fn test_error_into_response_status_codes() {
        let test_cases: Vec<(AuthError, StatusCode)> = vec![
            (AuthError::UserNotFound, StatusCode::NOT_FOUND),
            (AuthError::EmailTaken, StatusCode::CONFLICT),
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::AccountLocked, StatusCode::LOCKED),
            (AuthError::AccountDisabled, StatusCode::FORBIDDEN),
            (AuthError::SessionInvalid, StatusCode::UNAUTHORIZED),
            (
                AuthError::MissingHeader("User-Agent".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AuthError::RoleNotSelfAssignable("admin".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (AuthError::OrganizationNotFound, StatusCode::NOT_FOUND),
            (
                AuthError::OrganizationRoleMismatch("company".into()),
                StatusCode::FORBIDDEN,
            ),
            (
                AuthError::App(AppError::forbidden("nope")),
                StatusCode::FORBIDDEN,
            ),
            (
                AuthError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected_status) in test_cases {
            assert_eq!(error.status_code(), expected_status);
            assert_eq!(error.into_response().status(), expected_status);
        }
    }

    #[test]
    fn test_internal_details_not_exposed() {
        let app = AuthError::Internal("connection string leaked".into()).to_app_error();
        assert!(!app.message().contains("leaked"));
    }
}

#[cfg(test)]
mod router_tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::{Request, StatusCode, header};
    use axum::middleware::from_fn_with_state;
    use kernel::id::OrganizationId;
    use tower::ServiceExt;

    use crate::application::config::AuthConfig;
    use crate::domain::repository::OrganizationAffiliation;
    use crate::infra::memory::{InMemoryAuthRepository, StaticOrganizationDirectory};
    use crate::presentation::middleware::{AuthMiddlewareState, resolve_current_user};
    use crate::presentation::router::auth_router_generic;

    const UA: &str = "router-test/1.0";

    fn app(directory: StaticOrganizationDirectory) -> Router {
        let repo = InMemoryAuthRepository::new();
        let config = AuthConfig::development();
        let middleware_state = AuthMiddlewareState::new(Arc::new(repo.clone()), Arc::new(config.clone()));

        Router::new()
            .nest("/api/auth", auth_router_generic(repo, config, directory))
            .layer(from_fn_with_state(
                middleware_state,
                resolve_current_user::<InMemoryAuthRepository>,
            ))
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))))
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::USER_AGENT, UA)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Sign up and sign in, returning the `name=value` cookie pair
    async fn signed_in(app: &Router, email: &str, role: &str) -> String {
        let signup = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/signup",
                serde_json::json!({
                    "email": email,
                    "password": "Quartz-Meadow-19",
                    "displayName": "Router Test",
                    "role": role,
                }),
            ))
            .await
            .unwrap();
        assert_eq!(signup.status(), StatusCode::CREATED);

        let signin = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/signin",
                serde_json::json!({ "email": email, "password": "Quartz-Meadow-19" }),
            ))
            .await
            .unwrap();
        assert_eq!(signin.status(), StatusCode::OK);

        let set_cookie = signin
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.contains("HttpOnly"));
        set_cookie.split(';').next().unwrap().to_string()
    }

    fn get_with_cookie(uri: &str, cookie: &str, ua: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::COOKIE, cookie)
            .header(header::USER_AGENT, ua)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_sign_in_then_me() {
        let app = app(StaticOrganizationDirectory::new());
        let cookie = signed_in(&app, "me@uni.example.edu", "student").await;

        let response = app
            .clone()
            .oneshot(get_with_cookie("/api/auth/me", &cookie, UA))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["email"], "me@uni.example.edu");
        assert_eq!(body["role"], "student");
    }

    #[tokio::test]
    async fn test_me_requires_session_and_matching_agent() {
        let app = app(StaticOrganizationDirectory::new());

        let anonymous = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/auth/me")
                    .header(header::USER_AGENT, UA)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let cookie = signed_in(&app, "agent@uni.example.edu", "student").await;
        let other_agent = app
            .clone()
            .oneshot(get_with_cookie("/api/auth/me", &cookie, "another-browser/2.0"))
            .await
            .unwrap();
        assert_eq!(other_agent.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_status_and_sign_out() {
        let app = app(StaticOrganizationDirectory::new());
        let cookie = signed_in(&app, "out@uni.example.edu", "employer").await;

        let status = app
            .clone()
            .oneshot(get_with_cookie("/api/auth/status", &cookie, UA))
            .await
            .unwrap();
        let body = body_json(status).await;
        assert_eq!(body["authenticated"], true);
        assert_eq!(body["role"], "employer");

        let sign_out = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/signout")
                    .header(header::COOKIE, &cookie)
                    .header(header::USER_AGENT, UA)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(sign_out.status(), StatusCode::NO_CONTENT);

        let after = app
            .clone()
            .oneshot(get_with_cookie("/api/auth/me", &cookie, UA))
            .await
            .unwrap();
        assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bind_organization_is_visible_on_next_request() {
        let directory = StaticOrganizationDirectory::new();
        let company = OrganizationId::new();
        directory
            .insert(company, OrganizationAffiliation::Company)
            .await;
        let app = app(directory);
        let cookie = signed_in(&app, "hr@acme.example.com", "employer").await;

        let bind = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/auth/me/organization")
                    .header(header::COOKIE, &cookie)
                    .header(header::USER_AGENT, UA)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::json!({ "organizationId": company }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(bind.status(), StatusCode::OK);

        let status = app
            .clone()
            .oneshot(get_with_cookie("/api/auth/status", &cookie, UA))
            .await
            .unwrap();
        let body = body_json(status).await;
        assert_eq!(body["organizationId"], company.to_string());
    }

    #[tokio::test]
    async fn test_sign_up_conflict_is_problem_json() {
        let app = app(StaticOrganizationDirectory::new());
        signed_in(&app, "twice@uni.example.edu", "student").await;

        let again = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/signup",
                serde_json::json!({
                    "email": "twice@uni.example.edu",
                    "password": "Quartz-Meadow-19",
                    "displayName": "Again",
                    "role": "student",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(again.status(), StatusCode::CONFLICT);
        let body = body_json(again).await;
        assert_eq!(body["status"], 409);
    }
}
