//! Photo galleries

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use crate::handlers::{managed_event, require_feature, ApiJson};
use crate::middleware::{AuthUser, OptionalAuthUser};
use crate::models::{
    AddPhotoRequest, CreateGalleryRequest, EventStatus, GalleryPhoto, GalleryWithPhotos, PhotoGallery,
    UpdateGalleryRequest, User,
};
use crate::services::AuthService;
use crate::utils::errors::{CampusEventsError, Result};
use crate::AppState;

fn galleries_enabled(state: &AppState) -> Result<()> {
    require_feature(state.settings.features.galleries, "Galleries")
}

async fn managed_gallery(state: &AppState, user: &User, id: i64) -> Result<PhotoGallery> {
    let gallery = state.db.require_gallery(id).await?;
    let event = state.db.require_event(gallery.event_id).await?;
    AuthService::require_event_manager(user, &event)?;
    Ok(gallery)
}

/// Public galleries for everyone, private ones too for managers
pub async fn list_galleries(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Path(event_id): Path<i64>,
) -> Result<Json<Vec<PhotoGallery>>> {
    galleries_enabled(&state)?;
    let event = state.db.require_event(event_id).await?;
    let can_manage = viewer.as_ref().is_some_and(|user| AuthService::can_manage_event(user, &event));
    if event.status() == EventStatus::Draft && !can_manage {
        return Err(CampusEventsError::EventNotFound { event_id });
    }
    Ok(Json(state.db.galleries.list_for_event(event_id, can_manage).await?))
}

pub async fn create_gallery(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
    ApiJson(request): ApiJson<CreateGalleryRequest>,
) -> Result<(StatusCode, Json<PhotoGallery>)> {
    galleries_enabled(&state)?;
    managed_event(&state, &user, event_id).await?;
    request.validate()?;
    let gallery = state.db.galleries.create(event_id, user.id, request).await?;
    Ok((StatusCode::CREATED, Json(gallery)))
}

/// Gallery with its photos; private galleries look missing to non-managers
pub async fn get_gallery(
    State(state): State<AppState>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Path(id): Path<i64>,
) -> Result<Json<GalleryWithPhotos>> {
    galleries_enabled(&state)?;
    let gallery = state.db.require_gallery(id).await?;
    if !gallery.is_public {
        let event = state.db.require_event(gallery.event_id).await?;
        let can_manage = viewer.as_ref().is_some_and(|user| AuthService::can_manage_event(user, &event));
        if !can_manage {
            return Err(CampusEventsError::not_found("Gallery", id));
        }
    }

    let photos = state.db.galleries.list_photos(id).await?;
    Ok(Json(GalleryWithPhotos { gallery, photos }))
}

pub async fn update_gallery(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<UpdateGalleryRequest>,
) -> Result<Json<PhotoGallery>> {
    galleries_enabled(&state)?;
    managed_gallery(&state, &user, id).await?;
    if matches!(request.title, Some(ref title) if title.trim().is_empty()) {
        return Err(CampusEventsError::InvalidInput("Gallery title is required".to_string()));
    }
    Ok(Json(state.db.galleries.update(id, request).await?))
}

pub async fn delete_gallery(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    galleries_enabled(&state)?;
    managed_gallery(&state, &user, id).await?;
    state.db.galleries.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_photo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<AddPhotoRequest>,
) -> Result<(StatusCode, Json<GalleryPhoto>)> {
    galleries_enabled(&state)?;
    managed_gallery(&state, &user, id).await?;
    request.validate()?;
    let photo = state.db.galleries.add_photo(id, user.id, request).await?;
    Ok((StatusCode::CREATED, Json(photo)))
}

pub async fn remove_photo(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(photo_id): Path<i64>,
) -> Result<StatusCode> {
    galleries_enabled(&state)?;
    let photo = state
        .db
        .galleries
        .find_photo(photo_id)
        .await?
        .ok_or_else(|| CampusEventsError::not_found("Photo", photo_id))?;
    managed_gallery(&state, &user, photo.gallery_id).await?;
    state.db.galleries.remove_photo(photo.gallery_id, photo_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
