//! Test context for unified test setup
//!
//! Builds the application state the way `main` does, on top of a
//! `TestDatabase`, and drives the router in-process.

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use CampusEvents::models::{UpsertUserRequest, User, UserRole};
use CampusEvents::{AppState, DatabaseService, Settings};

use super::database_helper::TestDatabase;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-test-jwt-secret-0123";
pub const TEST_QR_SECRET: &str = "test-qr-secret-test-qr-secret-456789";

/// Settings suitable for in-process tests
pub fn test_settings(database_url: &str, temp_dir: &TempDir) -> Settings {
    let mut settings = Settings::default();
    settings.database.url = database_url.to_string();
    settings.database.max_connections = 5;
    settings.auth.jwt_secret = TEST_JWT_SECRET.to_string();
    settings.auth.admin_emails = vec!["admin@campus.test".to_string()];
    settings.ticketing.qr_secret = TEST_QR_SECRET.to_string();
    settings.rate_limit.requests_per_minute = 10_000;
    settings.rate_limit.burst = 10_000;
    settings.rate_limit.scan_requests_per_minute = 10_000;
    settings.logging.level = "debug".to_string();
    settings.logging.file_path = temp_dir.path().join("logs").to_string_lossy().to_string();
    settings.features.redis_cache = false;
    settings
}

/// A signed-in test user
pub struct TestUser {
    pub user: User,
    pub token: String,
}

/// Unified test context that manages all test components
pub struct TestContext {
    pub database: TestDatabase,
    pub settings: Settings,
    pub state: AppState,
    pub temp_dir: TempDir,
}

impl TestContext {
    /// Context with a clean database, or `None` when tests should be skipped
    pub async fn new() -> Option<Self> {
        let database = TestDatabase::connect().await?;
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let settings = test_settings(&database.database_url, &temp_dir);
        settings.validate().expect("Test settings must be valid");

        let db = DatabaseService::new(database.pool.clone());
        let state = AppState::new(settings.clone(), db).expect("Failed to build app state");

        Some(Self {
            database,
            settings,
            state,
            temp_dir,
        })
    }

    pub fn app(&self) -> Router {
        CampusEvents::build_app(self.state.clone())
    }

    /// Create a user with the given role and a bearer token for them
    pub async fn user(&self, name: &str, email: &str, role: UserRole) -> TestUser {
        let subject = format!("sub-{}", email);
        let mut user = self
            .state
            .db
            .users
            .upsert(UpsertUserRequest {
                auth_subject: subject.clone(),
                email: email.to_string(),
                full_name: name.to_string(),
                role: UserRole::Student,
            })
            .await
            .expect("Failed to create test user");

        if role != UserRole::Student {
            user = self.state.db.users.set_role(user.id, role).await.expect("Failed to set role");
        }

        let token = self
            .state
            .services
            .auth_service
            .issue_token(&subject, email, name)
            .expect("Failed to issue token");

        TestUser { user, token }
    }

    pub async fn organizer(&self) -> TestUser {
        self.user("Olivia Organizer", "olivia@campus.test", UserRole::Organizer).await
    }

    pub async fn student(&self, name: &str, email: &str) -> TestUser {
        self.user(name, email, UserRole::Student).await
    }

    /// Send a request through the router and decode the JSON body
    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let (status, _, bytes) = self.raw_request(method, uri, token, body).await;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
        };
        (status, json)
    }

    pub async fn raw_request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Vec<u8>) {
        send(self.app(), method, uri, token, body).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn cleanup(&self) {
        self.database.cleanup().await.expect("Failed to cleanup database");
    }
}

/// Drive a router with one request
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, HeaderMap, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .oneshot(builder.body(body).expect("Failed to build request"))
        .await
        .expect("Router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes()
        .to_vec();
    (status, headers, bytes)
}
