//! Health check endpoint

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::warn;
use crate::database::connection::health_check;
use crate::AppState;

/// Database health, plus the cache when it is enabled
pub async fn health(State(state): State<AppState>) -> Response {
    let database = match health_check(state.db.pool()).await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Database health check failed");
            false
        }
    };
    let services = state.services.health_check().await;

    let mut issues = services.get_issues();
    if !database {
        issues.insert(0, "Database connection failed".to_string());
    }
    let healthy = database && services.is_healthy();
    let status = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    let body = json!({
        "status": if healthy { "ok" } else { "degraded" },
        "version": crate::VERSION,
        "database": database,
        "cache": {
            "enabled": services.cache_enabled,
            "healthy": services.cache_healthy,
        },
        "issues": issues,
    });

    (status, Json(body)).into_response()
}
