//! Integration tests for the admin authentication endpoints.
//!
//! Covers login, lockout, the request gate and the open health check.

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
};
use backstage::api::AppState;
use backstage::config::Config;
use backstage::models::AdminRole;
use backstage::services::{AuthService, Clock, ManualClock, NewAdmin};
use backstage::state::SharedState;
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "integration-secret-integration-secret";
const RATE_LIMITED: &str = "Too many failed login attempts. Please try again in 15 minutes.";

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    clock: Arc<ManualClock>,
}

async fn spawn_app() -> TestApp {
    let db_path =
        std::env::temp_dir().join(format!("backstage-auth-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.token.secret = SECRET.to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;

    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
    ));
    let shared = SharedState::with_clock(config, clock.clone())
        .await
        .expect("Failed to create shared state");

    for (username, role) in [("alice", AdminRole::Admin), ("bob", AdminRole::Editor)] {
        shared
            .auth
            .provision_admin(NewAdmin {
                username: username.to_string(),
                password: "Secret123".to_string(),
                email: None,
                role,
            })
            .await
            .expect("Failed to provision admin");
    }

    let state = backstage::api::create_app_state(Arc::new(shared), None);

    TestApp {
        router: backstage::api::router(state.clone()),
        state,
        clock,
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn login(app: &TestApp, username: &str, password: &str) -> (StatusCode, Value) {
    let peer: SocketAddr = "192.0.2.10:40000".parse().unwrap();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header("Content-Type", "application/json")
                .extension(ConnectInfo(peer))
                .body(Body::from(
                    json!({ "username": username, "password": password }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    (status, body_json(response).await)
}

async fn get_with_token(app: &TestApp, uri: &str, token: Option<&str>) -> axum::response::Response {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    app.router
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn attempts(app: &TestApp, username: &str) -> Vec<backstage::models::LoginAttempt> {
    let since = app.clock.now() - chrono::Duration::days(1);
    app.state
        .store()
        .get_recent_login_attempts(username, since)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_login_success_and_me() {
    let app = spawn_app().await;

    let (status, body) = login(&app, "alice", "Secret123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["role"], "admin");
    assert!(body["data"]["user_id"].is_number());
    assert!(body["data"]["expires_at"].is_string());

    let token = body["data"]["token"].as_str().unwrap().to_string();

    let response = get_with_token(&app, "/api/auth/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["data"]["username"], "alice");
    assert_eq!(me["data"]["role"], "admin");
    assert_eq!(me["data"]["user_id"], body["data"]["user_id"]);

    let recorded = attempts(&app, "alice").await;
    assert_eq!(recorded.len(), 1);
    assert!(recorded[0].successful);
    assert_eq!(recorded[0].ip_address.as_deref(), Some("192.0.2.10"));

    let admin = app
        .state
        .store()
        .get_admin_user_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(admin.last_login_at, Some(app.clock.now()));
}

#[tokio::test]
async fn test_lockout_after_repeated_failures() {
    let app = spawn_app().await;

    for _ in 0..5 {
        let (status, body) = login(&app, "alice", "wrong-password").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Invalid credentials");
    }

    // Correct password, but the account is locked.
    let (status, body) = login(&app, "alice", "Secret123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], RATE_LIMITED);
    assert!(body.get("data").is_none());

    let recorded = attempts(&app, "alice").await;
    assert_eq!(recorded.len(), 6);
    assert!(recorded.iter().all(|a| !a.successful));

    // Other identities are unaffected.
    let (status, _) = login(&app, "bob", "Secret123").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_lockout_lapses_after_window() {
    let app = spawn_app().await;

    for _ in 0..5 {
        login(&app, "alice", "wrong-password").await;
    }

    app.clock.advance(chrono::Duration::minutes(10));
    let (status, body) = login(&app, "alice", "Secret123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], RATE_LIMITED);

    // The first five failures leave the window; the rate-limited one does not.
    app.clock.advance(chrono::Duration::minutes(5) + chrono::Duration::seconds(1));
    let (status, _) = login(&app, "alice", "Secret123").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_and_inactive_users_look_like_wrong_passwords() {
    let app = spawn_app().await;

    let (status, wrong) = login(&app, "alice", "nope-nope").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown) = login(&app, "nobody", "Secret123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, wrong);

    assert!(app.state.store().set_admin_active("bob", false).await.unwrap());
    let (status, inactive) = login(&app, "bob", "Secret123").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(inactive, wrong);

    // Unknown usernames accrue failures like real ones.
    assert_eq!(attempts(&app, "nobody").await.len(), 1);
}

#[tokio::test]
async fn test_login_requires_both_fields() {
    let app = spawn_app().await;

    let (status, body) = login(&app, "", "Secret123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username is required");

    let (status, body) = login(&app, "alice", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Password is required");

    assert!(attempts(&app, "alice").await.is_empty());
}

#[tokio::test]
async fn test_gate_rejects_missing_and_invalid_tokens() {
    let app = spawn_app().await;

    let response = get_with_token(&app, "/api/auth/me", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Authentication required");

    let response = get_with_token(&app, "/api/auth/me", Some("garbage")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid or expired token");

    let response = get_with_token(&app, "/api/metrics", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_expires_after_a_day() {
    let app = spawn_app().await;

    let (_, body) = login(&app, "alice", "Secret123").await;
    let token = body["data"]["token"].as_str().unwrap().to_string();

    app.clock.advance(chrono::Duration::hours(23));
    let response = get_with_token(&app, "/api/auth/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    app.clock.advance(chrono::Duration::hours(1));
    let response = get_with_token(&app, "/api/auth/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid or expired token");
}

#[tokio::test]
async fn test_logout_does_not_revoke_token() {
    let app = spawn_app().await;

    let (_, body) = login(&app, "bob", "Secret123").await;
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_with_token(&app, "/api/auth/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["role"], "editor");
}

#[tokio::test]
async fn test_metrics_with_token() {
    let app = spawn_app().await;

    let (_, body) = login(&app, "alice", "Secret123").await;
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let response = get_with_token(&app, "/api/metrics", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_is_open() {
    let app = spawn_app().await;

    let response = get_with_token(&app, "/api/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}
