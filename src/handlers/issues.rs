//! Event issue reports

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use crate::handlers::{managed_event, ApiJson};
use crate::middleware::AuthUser;
use crate::models::{CreateIssueRequest, EventStatus, Issue, IssueStatus, UpdateIssueStatusRequest};
use crate::services::AuthService;
use crate::utils::errors::{CampusEventsError, Result};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct IssueQuery {
    pub status: Option<IssueStatus>,
}

pub async fn list_issues(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
    Query(query): Query<IssueQuery>,
) -> Result<Json<Vec<Issue>>> {
    managed_event(&state, &user, event_id).await?;
    Ok(Json(state.db.issues.list_for_event(event_id, query.status).await?))
}

/// Any signed-in user can report a problem with a visible event
pub async fn report_issue(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
    ApiJson(request): ApiJson<CreateIssueRequest>,
) -> Result<(StatusCode, Json<Issue>)> {
    let event = state.db.require_event(event_id).await?;
    if event.status() == EventStatus::Draft && !AuthService::can_manage_event(&user, &event) {
        return Err(CampusEventsError::EventNotFound { event_id });
    }
    request.validate()?;

    let issue = state.db.issues.create(event_id, user.id, request).await?;
    info!(event_id = event_id, issue_id = issue.id, severity = %issue.severity, "Issue reported");
    Ok((StatusCode::CREATED, Json(issue)))
}

pub async fn update_status(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<UpdateIssueStatusRequest>,
) -> Result<Json<Issue>> {
    let issue = state.db.require_issue(id).await?;
    managed_event(&state, &user, issue.event_id).await?;

    let from = issue.status();
    let note = request
        .resolution_note
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let updated = state.db.issues.update_status(id, from, request.status, note, Utc::now()).await?;
    info!(issue_id = id, from = %from, to = %request.status, "Issue status changed");
    Ok(Json(updated))
}
