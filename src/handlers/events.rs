//! Event handlers: discovery, detail and lifecycle

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use tracing::{debug, info};
use crate::handlers::{managed_event, ApiJson};
use crate::middleware::{AuthUser, OptionalAuthUser};
use crate::models::{CreateEventRequest, Event, EventDetail, EventQuery, EventStatus, UpdateEventRequest, User};
use crate::services::{AuthService, CacheService, Permission};
use crate::utils::errors::{CampusEventsError, Result};
use crate::utils::logging::log_event_action;
use crate::AppState;

const RELATED_LIMIT: i64 = 5;

/// Drafts and other unpublished events are only listed for admins, or for
/// an organizer filtering on their own events
fn lists_unpublished(viewer: Option<&User>, query: &EventQuery) -> bool {
    match viewer {
        Some(user) if user.is_admin() => true,
        Some(user) => query.organizer_id == Some(user.id),
        None => false,
    }
}

/// Event by id through the cache
async fn load_event(state: &AppState, event_id: i64) -> Result<Event> {
    let key = CacheService::event_key(event_id);
    if let Some(event) = state.services.cache_service.fetch::<Event>(&key).await {
        debug!(event_id = event_id, "Event served from cache");
        return Ok(event);
    }
    let event = state.db.require_event(event_id).await?;
    state.services.cache_service.store(&key, &event).await;
    Ok(event)
}

pub(crate) async fn invalidate_event(state: &AppState, event_id: i64) {
    state.services.cache_service.invalidate(&CacheService::event_key(event_id)).await;
}

pub async fn list_events(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Query(query): Query<EventQuery>,
) -> Result<Json<Vec<Event>>> {
    let include_unpublished = lists_unpublished(viewer.as_ref(), &query);
    Ok(Json(state.db.events.search(&query, include_unpublished).await?))
}

pub async fn create_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(request): ApiJson<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>)> {
    state.services.auth_service.require_permission(&user, Permission::CreateEvents)?;
    request.validate()?;

    let event = state.db.events.create(user.id, request).await?;
    log_event_action(event.id, "created", user.id, Some(&event.title));
    Ok((StatusCode::CREATED, Json(event)))
}

/// Detail with availability; unpublished events look missing to non-managers
pub async fn get_event(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Path(event_id): Path<i64>,
) -> Result<Json<EventDetail>> {
    let event = load_event(&state, event_id).await?;
    let can_manage = viewer
        .as_ref()
        .map(|user| AuthService::can_manage_event(user, &event))
        .unwrap_or(false);

    if event.status() == EventStatus::Draft && !can_manage {
        return Err(CampusEventsError::EventNotFound { event_id });
    }
    Ok(Json(EventDetail::new(event, can_manage, Utc::now())))
}

pub async fn update_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
    ApiJson(request): ApiJson<UpdateEventRequest>,
) -> Result<Json<Event>> {
    managed_event(&state, &user, event_id).await?;
    let updated = state.db.tickets.update_event(event_id, request, Utc::now()).await?;

    invalidate_event(&state, event_id).await;
    log_event_action(event_id, "updated", user.id, None);
    Ok(Json(updated))
}

pub async fn delete_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
) -> Result<StatusCode> {
    managed_event(&state, &user, event_id).await?;
    state.db.events.delete(event_id).await?;

    invalidate_event(&state, event_id).await;
    log_event_action(event_id, "deleted", user.id, None);
    Ok(StatusCode::NO_CONTENT)
}

async fn transition(state: &AppState, user: &User, event_id: i64, to: EventStatus) -> Result<Json<Event>> {
    let event = managed_event(state, user, event_id).await?;
    let updated = state.db.events.set_status(event_id, event.status(), to).await?;

    invalidate_event(state, event_id).await;
    log_event_action(event_id, to.as_str(), user.id, Some(&event.status));
    Ok(Json(updated))
}

pub async fn publish_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
) -> Result<Json<Event>> {
    transition(&state, &user, event_id, EventStatus::Published).await
}

pub async fn complete_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
) -> Result<Json<Event>> {
    transition(&state, &user, event_id, EventStatus::Completed).await
}

/// Cancel the event and refund every unused ticket
pub async fn cancel_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
) -> Result<Json<Event>> {
    let event = state.db.require_event(event_id).await?;
    let cancelled = state.services.ticketing_service.cancel_event(&user, &event).await?;

    invalidate_event(&state, event_id).await;
    info!(event_id = event_id, user_id = user.id, "Event cancelled");
    Ok(Json(cancelled))
}

/// Upcoming published events in the same category
pub async fn related_events(State(state): State<AppState>, Path(event_id): Path<i64>) -> Result<Json<Vec<Event>>> {
    let event = load_event(&state, event_id).await?;
    Ok(Json(state.db.events.related(&event, RELATED_LIMIT).await?))
}
