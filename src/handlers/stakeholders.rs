//! Stakeholder management

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde_json::json;
use tracing::info;
use crate::handlers::{managed_event, ApiJson};
use crate::middleware::AuthUser;
use crate::models::{
    CreateStakeholderRequest, ImportResult, ImportStakeholdersRequest, Stakeholder, StakeholderQuery,
    UpdateStakeholderRequest,
};
use crate::services::export::{csv_response, stakeholder_rows};
use crate::services::AuthService;
use crate::utils::errors::{CampusEventsError, Result};
use crate::utils::logging::log_event_action;
use crate::AppState;

pub const MAX_IMPORT_ROWS: usize = 1000;

pub async fn list_stakeholders(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
    Query(query): Query<StakeholderQuery>,
) -> Result<Json<Vec<Stakeholder>>> {
    managed_event(&state, &user, event_id).await?;
    Ok(Json(state.db.stakeholders.list_for_event(event_id, query.role).await?))
}

pub async fn add_stakeholder(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
    ApiJson(request): ApiJson<CreateStakeholderRequest>,
) -> Result<(StatusCode, Json<Stakeholder>)> {
    managed_event(&state, &user, event_id).await?;
    request.validate()?;

    let role = request.role;
    let stakeholder = state.db.stakeholders.create(event_id, request).await?.ok_or_else(|| {
        CampusEventsError::Conflict(format!("This person is already a {} of the event", role))
    })?;
    log_event_action(event_id, "stakeholder_added", user.id, Some(role.as_str()));
    Ok((StatusCode::CREATED, Json(stakeholder)))
}

/// Bulk add; invalid rows are reported and duplicates skipped
pub async fn import_stakeholders(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
    ApiJson(request): ApiJson<ImportStakeholdersRequest>,
) -> Result<Json<ImportResult>> {
    managed_event(&state, &user, event_id).await?;
    if request.stakeholders.len() > MAX_IMPORT_ROWS {
        return Err(CampusEventsError::InvalidInput(format!(
            "At most {} stakeholders can be imported at once",
            MAX_IMPORT_ROWS
        )));
    }

    let mut result = ImportResult::default();
    for (row, entry) in request.stakeholders.into_iter().enumerate() {
        if let Err(e) = entry.validate() {
            result.errors.push(format!("Row {}: {}", row + 1, e));
            continue;
        }
        match state.db.stakeholders.create(event_id, entry).await? {
            Some(_) => result.created += 1,
            None => result.skipped += 1,
        }
    }

    info!(
        event_id = event_id,
        created = result.created,
        skipped = result.skipped,
        errors = result.errors.len(),
        "Stakeholders imported"
    );
    Ok(Json(result))
}

/// Turn checked-in ticket holders into attendee stakeholders
pub async fn sync_attendees(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    managed_event(&state, &user, event_id).await?;
    let created = state.db.stakeholders.sync_checked_in_attendees(event_id).await?;
    log_event_action(event_id, "attendees_synced", user.id, Some(&created.to_string()));
    Ok(Json(json!({ "created": created })))
}

pub async fn export_stakeholders(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
    Query(query): Query<StakeholderQuery>,
) -> Result<Response> {
    let event = managed_event(&state, &user, event_id).await?;
    let stakeholders = state.db.stakeholders.list_for_event(event_id, query.role).await?;
    Ok(csv_response(&format!("{} stakeholders", event.title), stakeholder_rows(stakeholders)))
}

/// Load a stakeholder whose event the caller manages
async fn managed_stakeholder(state: &AppState, user: &crate::models::User, id: i64) -> Result<Stakeholder> {
    let stakeholder = state.db.require_stakeholder(id).await?;
    let event = state.db.require_event(stakeholder.event_id).await?;
    AuthService::require_event_manager(user, &event)?;
    Ok(stakeholder)
}

pub async fn update_stakeholder(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<UpdateStakeholderRequest>,
) -> Result<Json<Stakeholder>> {
    managed_stakeholder(&state, &user, id).await?;
    if matches!(request.name, Some(ref name) if name.trim().is_empty()) {
        return Err(CampusEventsError::InvalidInput("Stakeholder name is required".to_string()));
    }
    Ok(Json(state.db.stakeholders.update(id, request).await?))
}

pub async fn remove_stakeholder(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    let stakeholder = managed_stakeholder(&state, &user, id).await?;
    state.db.stakeholders.delete(id).await?;
    log_event_action(stakeholder.event_id, "stakeholder_removed", user.id, Some(&stakeholder.email));
    Ok(StatusCode::NO_CONTENT)
}
