//! Event reports

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use crate::handlers::managed_event;
use crate::middleware::AuthUser;
use crate::services::EventReport;
use crate::utils::errors::Result;
use crate::AppState;

pub const MARKDOWN_CONTENT_TYPE: &str = "text/markdown; charset=utf-8";

pub async fn json_report(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
) -> Result<Json<EventReport>> {
    let event = managed_event(&state, &user, event_id).await?;
    Ok(Json(state.services.report_service.build(&event).await?))
}

pub async fn markdown_report(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
) -> Result<Response> {
    let event = managed_event(&state, &user, event_id).await?;
    let report = state.services.report_service.build(&event).await?;
    Ok(([(header::CONTENT_TYPE, MARKDOWN_CONTENT_TYPE)], report.render_markdown()).into_response())
}
