//! Event task checklists

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;
use crate::handlers::{managed_event, ApiJson};
use crate::middleware::AuthUser;
use crate::models::{CreateTaskRequest, EventTask, UpdateTaskRequest, User};
use crate::services::tasks::default_checklist;
use crate::utils::errors::{CampusEventsError, Result};
use crate::utils::logging::log_event_action;
use crate::AppState;

async fn managed_task(state: &AppState, user: &User, id: i64) -> Result<EventTask> {
    let task = state.db.require_task(id).await?;
    managed_event(state, user, task.event_id).await?;
    Ok(task)
}

async fn check_assignee(state: &AppState, event_id: i64, assignee: Option<i64>) -> Result<()> {
    if let Some(stakeholder_id) = assignee {
        let stakeholder = state.db.require_stakeholder(stakeholder_id).await.map_err(|e| match e {
            CampusEventsError::NotFound { .. } => {
                CampusEventsError::InvalidInput(format!("Unknown assignee stakeholder {}", stakeholder_id))
            }
            other => other,
        })?;
        if stakeholder.event_id != event_id {
            return Err(CampusEventsError::InvalidInput(
                "Assignee must be a stakeholder of the same event".to_string(),
            ));
        }
    }
    Ok(())
}

pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
) -> Result<Json<Vec<EventTask>>> {
    managed_event(&state, &user, event_id).await?;
    Ok(Json(state.db.tasks.list_for_event(event_id).await?))
}

pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
    ApiJson(request): ApiJson<CreateTaskRequest>,
) -> Result<(StatusCode, Json<EventTask>)> {
    managed_event(&state, &user, event_id).await?;
    request.validate()?;
    check_assignee(&state, event_id, request.assignee_stakeholder_id).await?;
    Ok((StatusCode::CREATED, Json(state.db.tasks.create(event_id, request).await?)))
}

/// Seed the standard planning checklist; refused once the event has tasks
pub async fn generate_checklist(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
) -> Result<(StatusCode, Json<Vec<EventTask>>)> {
    let event = managed_event(&state, &user, event_id).await?;
    if !state.db.tasks.list_for_event(event_id).await?.is_empty() {
        return Err(CampusEventsError::Conflict("Event already has a task checklist".to_string()));
    }

    let tasks = state.db.tasks.create_many(event_id, default_checklist(&event)).await?;
    info!(event_id = event_id, tasks = tasks.len(), "Default checklist generated");
    log_event_action(event_id, "checklist_generated", user.id, None);
    Ok((StatusCode::CREATED, Json(tasks)))
}

pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<UpdateTaskRequest>,
) -> Result<Json<EventTask>> {
    let task = managed_task(&state, &user, id).await?;
    request.validate()?;
    check_assignee(&state, task.event_id, request.assignee_stakeholder_id).await?;
    Ok(Json(state.db.tasks.update(id, task.status(), request).await?))
}

pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    managed_task(&state, &user, id).await?;
    state.db.tasks.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
