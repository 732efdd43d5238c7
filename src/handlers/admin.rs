//! Admin endpoints

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;
use crate::handlers::ApiJson;
use crate::middleware::AuthUser;
use crate::models::{UpdateRoleRequest, User};
use crate::services::Permission;
use crate::utils::errors::{CampusEventsError, Result};
use crate::utils::helpers::Pagination;
use crate::utils::logging::log_admin_action;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UserPage {
    pub users: Vec<User>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

pub async fn stats(State(state): State<AppState>, AuthUser(user): AuthUser) -> Result<Json<serde_json::Value>> {
    state.services.auth_service.require_permission(&user, Permission::ManageUsers)?;
    Ok(Json(state.db.get_system_stats().await?))
}

pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<UserPage>> {
    state.services.auth_service.require_permission(&user, Permission::ManageUsers)?;
    let pagination = pagination.normalized();
    let users = state.db.users.list(pagination.limit(), pagination.offset()).await?;
    let total = state.db.users.count().await?;
    Ok(Json(UserPage {
        users,
        total,
        page: pagination.page,
        per_page: pagination.per_page,
    }))
}

pub async fn change_role(
    State(state): State<AppState>,
    AuthUser(admin): AuthUser,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<UpdateRoleRequest>,
) -> Result<Json<User>> {
    state.services.auth_service.require_permission(&admin, Permission::ManageUsers)?;
    if id == admin.id {
        return Err(CampusEventsError::InvalidInput("Admins cannot change their own role".to_string()));
    }

    let target = state.db.require_user(id).await?;
    let updated = state.db.users.set_role(id, request.role).await?;
    log_admin_action(
        admin.id,
        "change_role",
        Some(&target.email),
        Some(&format!("{} -> {}", target.role, updated.role)),
    );
    Ok(Json(updated))
}
