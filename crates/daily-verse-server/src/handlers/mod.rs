//! HTTP handlers

pub mod admin;
pub mod auth;
pub mod health;
pub mod users;
pub mod verses;

pub use health::health;

#[cfg(test)]
mod tests {
    use crate::services::{AuthService, BatchDispatcher};
    use crate::storage::MemoryStore;
    use crate::testing::{RecordingMailer, StaticVerseSource};
    use crate::{app, AppState};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;
    use verse_core::{EntityStore, NewVerse};

    struct Harness {
        app: Router,
        store: Arc<dyn EntityStore>,
        mailer: Arc<RecordingMailer>,
    }

    fn psalm() -> NewVerse {
        NewVerse::new(
            "The LORD is my shepherd; I shall not want.",
            "Psalm 23:1",
            "God as shepherd.",
            "Practice contentment today.",
        )
    }

    fn harness(mailer: RecordingMailer) -> Harness {
        let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new(Duration::from_secs(60)));
        let mailer = Arc::new(mailer);
        let state = AppState {
            store: store.clone(),
            auth_service: Arc::new(AuthService::new(store.clone(), chrono::Duration::hours(1))),
            verse_source: Arc::new(StaticVerseSource(psalm())),
            dispatcher: Arc::new(BatchDispatcher::new(
                store.clone(),
                mailer.clone(),
                Duration::ZERO,
            )),
        };
        Harness {
            app: app(state, None),
            store,
            mailer,
        }
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn register(app: &Router, username: &str, subscribed: bool) -> (Value, String) {
        let (status, body) = call(
            app,
            Method::POST,
            "/api/register",
            None,
            Some(json!({
                "username": username,
                "password": "secret123",
                "email": format!("{}@example.com", username),
                "fullName": format!("{} Example", username),
                "isSubscribed": subscribed,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        let token = body["token"].as_str().unwrap().to_string();
        (body["user"].clone(), token)
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness(RecordingMailer::default());
        let (status, body) = call(&h.app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_register_login_and_me() {
        let h = harness(RecordingMailer::default());
        let (user, token) = register(&h.app, "alice", true).await;
        assert_eq!(user["username"], "alice");
        assert_eq!(user["isSubscribed"], true);
        assert!(user.get("password").is_none());

        let (status, me) = call(&h.app, Method::GET, "/api/user", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["id"], user["id"]);

        let (status, body) = call(
            &h.app,
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "username": "Alice", "password": "secret123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "alice@example.com");

        let (status, _) = call(
            &h.app,
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "username": "alice", "password": "wrong-password" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_bad_request() {
        let h = harness(RecordingMailer::default());
        register(&h.app, "alice", true).await;

        let (status, body) = call(
            &h.app,
            Method::POST,
            "/api/register",
            None,
            Some(json!({
                "username": "ALICE",
                "password": "secret123",
                "email": "other@example.com",
                "fullName": "Other",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_protected_routes_require_session() {
        let h = harness(RecordingMailer::default());

        for (method, uri) in [
            (Method::GET, "/api/user"),
            (Method::POST, "/api/logout"),
            (Method::POST, "/api/verses"),
            (Method::POST, "/api/admin/send-daily-verse"),
        ] {
            let (status, _) = call(&h.app, method.clone(), uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);

            let (status, _) = call(&h.app, method.clone(), uri, Some("bogus"), None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        }
    }

    #[tokio::test]
    async fn test_logout_invalidates_token() {
        let h = harness(RecordingMailer::default());
        let (_, token) = register(&h.app, "alice", true).await;

        let (status, _) = call(&h.app, Method::POST, "/api/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&h.app, Method::GET, "/api/user", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_update_subscription() {
        let h = harness(RecordingMailer::default());
        let (_, token) = register(&h.app, "alice", true).await;

        let (status, body) = call(
            &h.app,
            Method::PATCH,
            "/api/user/settings",
            Some(&token),
            Some(json!({ "isSubscribed": false })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isSubscribed"], false);
        assert!(h.store.get_subscribed_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_random_verse_is_stored_once() {
        let h = harness(RecordingMailer::default());

        for _ in 0..2 {
            let (status, body) = call(&h.app, Method::GET, "/api/verses/random", None, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(
                body,
                json!({
                    "text": "The LORD is my shepherd; I shall not want.",
                    "reference": "Psalm 23:1",
                    "explanation": "God as shepherd.",
                    "application": "Practice contentment today.",
                })
            );
        }

        let stored = h.store.get_verse_by_reference("Psalm 23:1").await.unwrap();
        assert_eq!(stored.map(|v| v.id), Some(1));
        assert!(h.store.get_verse(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_verse() {
        let h = harness(RecordingMailer::default());
        let (_, token) = register(&h.app, "alice", true).await;

        let body = json!({
            "text": "For God so loved the world",
            "reference": "John 3:16",
            "explanation": "Love.",
            "application": "Share it.",
        });
        let (status, first) = call(
            &h.app,
            Method::POST,
            "/api/verses",
            Some(&token),
            Some(body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(first["reference"], "John 3:16");

        let (status, second) =
            call(&h.app, Method::POST, "/api/verses", Some(&token), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(second["id"], first["id"]);

        let (status, err) = call(
            &h.app,
            Method::POST,
            "/api/verses",
            Some(&token),
            Some(json!({ "text": "missing the rest" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["message"], "Invalid verse data");
    }

    #[tokio::test]
    async fn test_send_daily_verse_reaches_subscribers() {
        let h = harness(RecordingMailer::failing_for(&["bob@example.com"]));
        let (_, token) = register(&h.app, "alice", true).await;
        register(&h.app, "bob", true).await;
        register(&h.app, "carol", false).await;

        let (status, body) = call(
            &h.app,
            Method::POST,
            "/api/admin/send-daily-verse",
            Some(&token),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Daily verse sent to 2 users");
        assert_eq!(body["verse"]["reference"], "Psalm 23:1");
        assert_eq!(body["report"]["sentCount"], 2);
        assert_eq!(body["report"]["errors"][0]["recipient"], "bob@example.com");
        assert_eq!(h.mailer.sent(), vec!["alice@example.com"]);
    }
}
