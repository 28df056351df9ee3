use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use chrono::Duration;
use ephemeral_state::{
    AppState,
    cache::{MemoryKvStore, TokenPurpose},
    clock::ManualClock,
    config::Config,
    database::MemorySessionStore,
    router::build_router,
};
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    clock: Arc<ManualClock>,
    state: AppState,
    router: Router,
}

fn test_app() -> TestApp {
    let clock = Arc::new(ManualClock::starting_now());
    let kv = Arc::new(MemoryKvStore::new(clock.clone()));
    let db = Arc::new(MemorySessionStore::new());
    let state = AppState::new(Config::default(), kv, db, clock.clone());
    let router = build_router(state.clone());
    TestApp {
        clock,
        state,
        router,
    }
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn authed(method: &str, uri: &str, secret: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", secret))
        .body(Body::empty())
        .expect("request")
}

fn redeem_request(secret: &str, purpose: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/tokens/redeem")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "secret": secret, "purpose": purpose }).to_string(),
        ))
        .expect("request")
}

#[tokio::test]
async fn cache_stats_reports_connected_store() {
    let app = test_app();
    app.state.cache.set("catalog:1", &json!({"id": 1}), None).await;

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/internal/cache/stats")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["content"]["connected"], true);
    assert_eq!(body["content"]["key_count"], 1);
}

#[tokio::test]
async fn session_routes_require_a_valid_session() {
    let app = test_app();

    let missing = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/sessions/active")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let bogus = app
        .router
        .oneshot(authed("GET", "/sessions/active", "not-a-session"))
        .await
        .expect("response");
    assert_eq!(bogus.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn active_sessions_lists_devices_newest_first() {
    let app = test_app();
    let sessions = &app.state.sessions;
    let laptop = sessions
        .create_session("u1", "secretA", Some("laptop"), "1.1.1.1")
        .await;
    app.clock.advance(Duration::seconds(5));
    let phone = sessions
        .create_session("u1", "secretB", Some("phone"), "2.2.2.2")
        .await;
    sessions
        .create_session("u2", "secretC", None, "3.3.3.3")
        .await;

    let response = app
        .router
        .oneshot(authed("GET", "/sessions/active", "secretA"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["content"]["current"], laptop);
    let listed: Vec<&str> = body["content"]["sessions"]
        .as_array()
        .expect("sessions")
        .iter()
        .map(|s| s["token_hash"].as_str().expect("hash"))
        .collect();
    assert_eq!(listed, vec![phone.as_str(), laptop.as_str()]);
    assert_eq!(body["content"]["sessions"][0]["device_label"], "phone");
}

#[tokio::test]
async fn logout_ends_only_the_current_session() {
    let app = test_app();
    app.state
        .sessions
        .create_session("u1", "secretA", None, "1.1.1.1")
        .await;
    app.state
        .sessions
        .create_session("u1", "secretB", None, "1.1.1.1")
        .await;

    let response = app
        .router
        .clone()
        .oneshot(authed("POST", "/sessions/logout", "secretA"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    assert!(app.state.sessions.validate_session("secretA").await.is_none());
    assert!(app.state.sessions.validate_session("secretB").await.is_some());
}

#[tokio::test]
async fn logout_all_ends_every_session_of_the_user() {
    let app = test_app();
    app.state
        .sessions
        .create_session("u1", "secretA", Some("UA"), "1.2.3.4")
        .await;
    app.state
        .sessions
        .create_session("u1", "secretB", None, "1.2.3.4")
        .await;

    let response = app
        .router
        .clone()
        .oneshot(authed("POST", "/sessions/logout-all", "secretA"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["content"]["removed"], 2);

    let after = app
        .router
        .oneshot(authed("GET", "/sessions/active", "secretB"))
        .await
        .expect("response");
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn redeem_token_once() {
    let app = test_app();
    let secret = app
        .state
        .tokens
        .issue("u1", TokenPurpose::EmailVerification)
        .await
        .expect("issue");

    let response = app
        .router
        .clone()
        .oneshot(redeem_request(&secret, "email_verification"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["content"]["subject_id"], "u1");

    let again = app
        .router
        .oneshot(redeem_request(&secret, "email_verification"))
        .await
        .expect("response");
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(again).await["code"], 1006);
}

#[tokio::test]
async fn redeem_with_wrong_purpose_looks_like_expiry() {
    let app = test_app();
    let secret = app
        .state
        .tokens
        .issue("u1", TokenPurpose::EmailVerification)
        .await
        .expect("issue");

    let wrong = app
        .router
        .clone()
        .oneshot(redeem_request(&secret, "password_reset"))
        .await
        .expect("response");
    assert_eq!(wrong.status(), StatusCode::BAD_REQUEST);
    let wrong_body = body_json(wrong).await;

    let unknown = app
        .router
        .oneshot(redeem_request("0000", "password_reset"))
        .await
        .expect("response");
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
    assert_eq!(wrong_body, body_json(unknown).await);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let app = test_app();
    let secret = app
        .state
        .tokens
        .issue("u1", TokenPurpose::PasswordReset)
        .await
        .expect("issue");
    app.clock.advance(Duration::seconds(3601));

    let response = app
        .router
        .oneshot(redeem_request(&secret, "password_reset"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
