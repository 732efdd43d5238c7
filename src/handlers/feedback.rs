//! Feedback forms, responses and summaries

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::info;
use crate::handlers::{managed_event, ApiJson};
use crate::middleware::{AuthUser, OptionalAuthUser};
use crate::models::{
    CreateFeedbackFormRequest, EventStatus, FeedbackForm, FeedbackResponse, FeedbackSummary, SubmitFeedbackRequest,
};
use crate::services::feedback::{summarize, validate_answers, validate_questions};
use crate::services::AuthService;
use crate::utils::errors::{CampusEventsError, Result};
use crate::AppState;

/// Managers see every form, everyone else only open ones
pub async fn list_forms(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Path(event_id): Path<i64>,
) -> Result<Json<Vec<FeedbackForm>>> {
    let event = state.db.require_event(event_id).await?;
    let can_manage = viewer.as_ref().is_some_and(|user| AuthService::can_manage_event(user, &event));
    if event.status() == EventStatus::Draft && !can_manage {
        return Err(CampusEventsError::EventNotFound { event_id });
    }

    let forms = state.db.feedback.list_forms(event_id).await?;
    Ok(Json(forms.into_iter().filter(|f| can_manage || f.is_open).collect()))
}

pub async fn create_form(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
    ApiJson(request): ApiJson<CreateFeedbackFormRequest>,
) -> Result<(StatusCode, Json<FeedbackForm>)> {
    managed_event(&state, &user, event_id).await?;
    validate_questions(&request.title, &request.questions)?;

    let form = state.db.feedback.create_form(event_id, request.title.trim(), request.questions).await?;
    info!(event_id = event_id, form_id = form.id, questions = form.questions.len(), "Feedback form created");
    Ok((StatusCode::CREATED, Json(form)))
}

pub async fn close_form(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<FeedbackForm>> {
    let form = state.db.require_form(id).await?;
    managed_event(&state, &user, form.event_id).await?;
    Ok(Json(state.db.feedback.set_open(id, false).await?))
}

/// One response per user, from ticket holders and stakeholders only
pub async fn submit_response(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<SubmitFeedbackRequest>,
) -> Result<(StatusCode, Json<FeedbackResponse>)> {
    let form = state.db.require_form(id).await?;
    if !form.is_open {
        return Err(CampusEventsError::Conflict("Feedback form is closed".to_string()));
    }
    if !state.db.is_event_participant(form.event_id, &user).await? {
        return Err(CampusEventsError::PermissionDenied(
            "Only attendees and stakeholders can give feedback".to_string(),
        ));
    }
    validate_answers(&form.questions, &request.answers)?;

    let response = state.db.feedback.submit(id, user.id, request.answers).await?;
    info!(form_id = id, user_id = user.id, "Feedback submitted");
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn form_summary(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<FeedbackSummary>> {
    let form = state.db.require_form(id).await?;
    managed_event(&state, &user, form.event_id).await?;
    let responses = state.db.feedback.list_responses(id).await?;
    Ok(Json(summarize(form.id, &form.questions, &responses)))
}
