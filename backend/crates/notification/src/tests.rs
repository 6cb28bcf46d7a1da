//! Crate-level tests for the notification module

#[cfg(test)]
mod models_tests {
    use crate::domain::event::{Audience, EventEnvelope, SequencedEvent};
    use crate::presentation::dto::*;

    #[test]
    fn test_client_frames() {
        let ack: ClientFrame = serde_json::from_str(r#"{"type":"ack","seq":42}"#).unwrap();
        assert_eq!(ack, ClientFrame::Ack { seq: 42 });

        let ping: ClientFrame = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(ping, ClientFrame::Ping);

        assert!(serde_json::from_str::<ClientFrame>(r#"{"type":"subscribe"}"#).is_err());
    }

    #[test]
    fn test_server_frames() {
        let event = SequencedEvent {
            seq: 3,
            audience: Audience::All,
            envelope: EventEnvelope::new("verification.approved", serde_json::json!({"a": 1})),
        };
        let json = serde_json::to_value(ServerFrame::Event(&event)).unwrap();
        assert_eq!(json["type"], "event");
        assert_eq!(json["seq"], 3);
        assert_eq!(json["eventType"], "verification.approved");
        assert_eq!(json["payload"]["a"], 1);

        let lagged = serde_json::to_value(ServerFrame::Lagged { missed: 5 }).unwrap();
        assert_eq!(lagged, serde_json::json!({"type": "lagged", "missed": 5}));

        let resync = serde_json::to_value(ServerFrame::Resync { oldest: 9 }).unwrap();
        assert_eq!(resync, serde_json::json!({"type": "resync", "oldest": 9}));

        let acked = serde_json::to_value(ServerFrame::Acked { seq: 2 }).unwrap();
        assert_eq!(acked, serde_json::json!({"type": "acked", "seq": 2}));
    }

    #[test]
    fn test_list_query_defaults() {
        let query: ListNotificationsQuery = serde_json::from_str("{}").unwrap();
        assert!(!query.unread_only);
        assert_eq!(query.page().limit(), 20);
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
        let test_cases: Vec<(NotificationError, StatusCode)> = vec![
            (NotificationError::NotificationNotFound, StatusCode::NOT_FOUND),
            (
                NotificationError::App(AppError::bad_request("bad")),
                StatusCode::BAD_REQUEST,
            ),
            (
                NotificationError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected_status) in test_cases {
            assert_eq!(error.status_code(), expected_status);
            assert_eq!(error.into_response().status(), expected_status);
        }
    }
}

#[cfg(test)]
mod router_tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::{Extension, Router};
    use kernel::actor::{CurrentUser, UserRole};
    use kernel::id::UserId;
    use tower::ServiceExt;

    use crate::application::{EventBus, EventBusConfig};
    use crate::domain::notification::{Notification, NotificationKind};
    use crate::domain::repository::NotificationRepository;
    use crate::infra::memory::InMemoryNotificationRepository;
    use crate::presentation::router::notification_router_generic;

    fn app(repo: InMemoryNotificationRepository, actor: CurrentUser) -> Router {
        let config = EventBusConfig::default();
        Router::new()
            .nest(
                "/api",
                notification_router_generic(repo, EventBus::new(&config), &config),
            )
            .layer(Extension(actor))
    }

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_list_count_and_mark_read() {
        let repo = InMemoryNotificationRepository::new();
        let me = CurrentUser::new(UserId::new(), UserRole::Student, None);
        let first = Notification::new(me.user_id, NotificationKind::CredentialIssued, "a", "b");
        repo.create(&first).await.unwrap();
        repo.create(&Notification::new(me.user_id, NotificationKind::MessageReceived, "c", "d"))
            .await
            .unwrap();
        repo.create(&Notification::new(UserId::new(), NotificationKind::MessageReceived, "x", "y"))
            .await
            .unwrap();
        let app = app(repo, me);

        let list = app
            .clone()
            .oneshot(request("GET", "/api/notifications?unreadOnly=true&limit=10"))
            .await
            .unwrap();
        assert_eq!(list.status(), StatusCode::OK);
        let body = body_json(list).await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["items"][0]["kind"], "message_received");

        let read = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/api/notifications/{}/read", first.notification_id),
            ))
            .await
            .unwrap();
        assert_eq!(read.status(), StatusCode::OK);
        assert_eq!(body_json(read).await["read"], true);

        let count = app
            .clone()
            .oneshot(request("GET", "/api/notifications/unread-count"))
            .await
            .unwrap();
        assert_eq!(body_json(count).await["unread"], 1);

        let all = app
            .clone()
            .oneshot(request("POST", "/api/notifications/read-all"))
            .await
            .unwrap();
        assert_eq!(body_json(all).await["updated"], 1);
    }

    #[tokio::test]
    async fn test_mark_read_of_unknown_is_404() {
        let me = CurrentUser::new(UserId::new(), UserRole::Employer, None);
        let app = app(InMemoryNotificationRepository::new(), me);

        let response = app
            .oneshot(request(
                "POST",
                &format!("/api/notifications/{}/read", uuid::Uuid::new_v4()),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_requires_authentication() {
        let config = EventBusConfig::default();
        let app = Router::new().nest(
            "/api",
            notification_router_generic(
                InMemoryNotificationRepository::new(),
                EventBus::new(&config),
                &config,
            ),
        );
        let response = app
            .oneshot(request("GET", "/api/notifications"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[cfg(test)]
mod ws_tests {
    use std::time::Duration;

    use axum::{Extension, Router};
    use futures::{SinkExt, Stream, StreamExt};
    use kernel::actor::{CurrentUser, UserRole};
    use kernel::id::UserId;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::{Error as WsError, Message};

    use crate::application::{EventBus, EventBusConfig};
    use crate::domain::event::{Audience, EventEnvelope};
    use crate::infra::memory::InMemoryNotificationRepository;
    use crate::presentation::router::notification_router_generic;

    async fn serve(bus: EventBus, viewer: CurrentUser) -> String {
        let config = EventBusConfig::default();
        let app = Router::new()
            .nest(
                "/api",
                notification_router_generic(InMemoryNotificationRepository::new(), bus, &config),
            )
            .layer(Extension(viewer));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("ws://{addr}/api/ws")
    }

    /// Next text frame as JSON, skipping pings
    async fn next_json(
        ws: &mut (impl Stream<Item = Result<Message, WsError>> + Unpin),
    ) -> serde_json::Value {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("connection closed")
                .unwrap();
            if let Message::Text(text) = msg {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    fn publish(bus: &EventBus, audience: Audience) -> u64 {
        bus.publish(
            EventEnvelope::new("message.received", serde_json::json!({})),
            audience,
        )
    }

    #[tokio::test]
    async fn test_resume_filter_and_ack() {
        let bus = EventBus::new(&EventBusConfig::default());
        let viewer = CurrentUser::new(UserId::new(), UserRole::Student, None);
        publish(&bus, Audience::All);
        publish(&bus, Audience::User(UserId::new()));
        publish(&bus, Audience::User(viewer.user_id));

        let url = serve(bus.clone(), viewer).await;
        let (mut ws, _) = tokio_tungstenite::connect_async(format!("{url}?since=0"))
            .await
            .unwrap();

        let first = next_json(&mut ws).await;
        assert_eq!(first["type"], "event");
        assert_eq!(first["seq"], 1);
        assert_eq!(next_json(&mut ws).await["seq"], 3);

        // The pong proves the connection is subscribed before publishing live
        ws.send(Message::Text(r#"{"type":"ping"}"#.into())).await.unwrap();
        assert_eq!(next_json(&mut ws).await["type"], "pong");

        publish(&bus, Audience::User(UserId::new()));
        publish(&bus, Audience::All);
        assert_eq!(next_json(&mut ws).await["seq"], 5);

        ws.send(Message::Text(r#"{"type":"ack","seq":5}"#.into())).await.unwrap();
        let acked = next_json(&mut ws).await;
        assert_eq!(acked["type"], "acked");
        assert_eq!(acked["seq"], 5);

        ws.send(Message::Text(r#"{"type":"ack","seq":2}"#.into())).await.unwrap();
        assert_eq!(next_json(&mut ws).await["seq"], 5);
    }

    #[tokio::test]
    async fn test_stale_resume_point_gets_resync() {
        let bus = EventBus::new(&EventBusConfig {
            replay_capacity: 2,
            ..Default::default()
        });
        let viewer = CurrentUser::new(UserId::new(), UserRole::Employer, None);
        for _ in 0..4 {
            publish(&bus, Audience::All);
        }

        let url = serve(bus, viewer).await;
        let (mut ws, _) = tokio_tungstenite::connect_async(format!("{url}?since=1"))
            .await
            .unwrap();

        let resync = next_json(&mut ws).await;
        assert_eq!(resync["type"], "resync");
        assert_eq!(resync["oldest"], 3);
        assert_eq!(next_json(&mut ws).await["seq"], 3);
        assert_eq!(next_json(&mut ws).await["seq"], 4);
    }
}
