//! Certificate templates, generation and public verification

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use crate::handlers::{managed_event, require_feature, ApiJson};
use crate::middleware::AuthUser;
use crate::models::{
    Certificate, CertificateTemplate, CertificateVerification, CreateTemplateRequest, GenerationSummary, User,
    UpdateTemplateRequest,
};
use crate::services::AuthService;
use crate::utils::errors::{CampusEventsError, Result};
use crate::utils::logging::log_event_action;
use crate::AppState;

fn certificates_enabled(state: &AppState) -> Result<()> {
    require_feature(state.settings.features.certificates, "Certificates")
}

async fn managed_template(state: &AppState, user: &User, id: i64) -> Result<CertificateTemplate> {
    let template = state.db.require_template(id).await?;
    let event = state.db.require_event(template.event_id).await?;
    AuthService::require_event_manager(user, &event)?;
    Ok(template)
}

pub async fn list_templates(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
) -> Result<Json<Vec<CertificateTemplate>>> {
    certificates_enabled(&state)?;
    managed_event(&state, &user, event_id).await?;
    Ok(Json(state.db.certificates.list_templates(event_id).await?))
}

pub async fn create_template(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
    ApiJson(request): ApiJson<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<CertificateTemplate>)> {
    certificates_enabled(&state)?;
    managed_event(&state, &user, event_id).await?;
    request.validate()?;

    let template = state.db.certificates.create_template(event_id, request).await?;
    log_event_action(event_id, "certificate_template_created", user.id, Some(&template.name));
    Ok((StatusCode::CREATED, Json(template)))
}

pub async fn update_template(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<UpdateTemplateRequest>,
) -> Result<Json<CertificateTemplate>> {
    certificates_enabled(&state)?;
    managed_template(&state, &user, id).await?;
    if matches!(request.name, Some(ref name) if name.trim().is_empty()) {
        return Err(CampusEventsError::InvalidInput("Template name is required".to_string()));
    }
    if let Some(ref layout) = request.layout {
        layout.validate()?;
    }
    Ok(Json(state.db.certificates.update_template(id, request).await?))
}

pub async fn delete_template(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    certificates_enabled(&state)?;
    managed_template(&state, &user, id).await?;
    state.db.certificates.delete_template(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Issue certificates to every matching stakeholder that has none yet
pub async fn generate(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<GenerationSummary>> {
    certificates_enabled(&state)?;
    let template = managed_template(&state, &user, id).await?;
    let summary = state.services.certificate_service.generate_for_event(template.id).await?;
    log_event_action(template.event_id, "certificates_generated", user.id, Some(&summary.issued.to_string()));
    Ok(Json(summary))
}

pub async fn list_certificates(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
) -> Result<Json<Vec<Certificate>>> {
    certificates_enabled(&state)?;
    managed_event(&state, &user, event_id).await?;
    Ok(Json(state.db.certificates.list_for_event(event_id).await?))
}

/// Public lookup by serial; exposes only what is printed on the certificate
pub async fn verify(State(state): State<AppState>, Path(serial): Path<String>) -> Result<Json<CertificateVerification>> {
    let serial = serial.trim().to_uppercase();
    state
        .db
        .certificates
        .verify(&serial)
        .await?
        .map(Json)
        .ok_or_else(|| CampusEventsError::not_found("Certificate", serial))
}
