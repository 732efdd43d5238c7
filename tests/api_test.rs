//! Router behaviour that never reaches the database

mod helpers;

use axum::http::{header, Method, StatusCode};
use helpers::*;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use CampusEvents::{AppState, DatabaseService};

fn app_state(configure: impl FnOnce(&mut CampusEvents::Settings)) -> AppState {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut settings = test_settings("postgresql://localhost/campus_events_test", &temp_dir);
    configure(&mut settings);

    let pool = PgPoolOptions::new()
        .connect_lazy(&settings.database.url)
        .unwrap();
    AppState::new(settings, DatabaseService::new(pool)).unwrap()
}

fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = CampusEvents::build_app(app_state(|_| {}));
    let (status, headers, body) = send(app, Method::GET, "/api/me", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(headers.contains_key("x-request-id"));
    let body = json_body(&body);
    assert_eq!(body["code"], "unauthenticated");
    assert_eq!(body["error"], "Authentication error: Missing bearer token");
}

#[tokio::test]
async fn test_forged_token_is_unauthorized() {
    let app = CampusEvents::build_app(app_state(|_| {}));
    let (status, _, body) = send(app, Method::POST, "/api/events", Some("not.a.jwt"), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(&body)["code"], "unauthenticated");
}

#[tokio::test]
async fn test_token_from_another_issuer_is_rejected() {
    let foreign = CampusEvents::services::AuthService::new(CampusEvents::config::AuthConfig {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        jwt_issuer: "someone-else".to_string(),
        token_ttl_seconds: 60,
        admin_emails: vec![],
    });
    let token = foreign.issue_token("sub-1", "eve@campus.test", "Eve").unwrap();

    let app = CampusEvents::build_app(app_state(|_| {}));
    let (status, _, body) = send(app, Method::GET, "/api/me/tickets", Some(&token), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(&body)["error"], "Authentication error: Token issuer not accepted");
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = CampusEvents::build_app(app_state(|_| {}));
    let request = axum::http::Request::builder()
        .uri("/api/me")
        .header("x-request-id", "req-42")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-42");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = CampusEvents::build_app(app_state(|_| {}));
    let (status, _, _) = send(app, Method::GET, "/api/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rate_limit_returns_429() {
    let state = app_state(|settings| {
        settings.rate_limit.requests_per_minute = 1;
        settings.rate_limit.burst = 1;
    });

    let (first, _, _) = send(CampusEvents::build_app(state.clone()), Method::GET, "/api/me", None, None).await;
    assert_eq!(first, StatusCode::UNAUTHORIZED);

    let (second, _, body) = send(CampusEvents::build_app(state), Method::GET, "/api/me", None, None).await;
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json_body(&body)["code"], "rate_limited");
}

#[tokio::test]
async fn test_cors_preflight_allows_configured_origin() {
    let app = CampusEvents::build_app(app_state(|settings| {
        settings.server.cors_origins = vec!["https://events.campus.test".to_string()];
    }));
    let request = axum::http::Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/events")
        .header(header::ORIGIN, "https://events.campus.test")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://events.campus.test"
    );
}

#[tokio::test]
async fn test_disabled_galleries_answer_503() {
    let state = app_state(|settings| settings.features.galleries = false);
    let health = state.services.health_check().await;
    assert!(health.is_healthy());
    assert!(health.get_issues().is_empty());

    let (status, _, body) = send(CampusEvents::build_app(state), Method::GET, "/api/events/1/galleries", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(&body);
    assert_eq!(body["code"], "service_unavailable");
    assert_eq!(body["error"], "Service unavailable: Galleries are disabled");
}
