//! Current user endpoints

use axum::extract::State;
use axum::Json;
use tracing::info;
use crate::handlers::ApiJson;
use crate::middleware::AuthUser;
use crate::models::{Certificate, Order, TicketWithEvent, UpdateUserRequest, User};
use crate::utils::errors::Result;
use crate::AppState;

pub async fn get_me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> Result<Json<User>> {
    request.validate()?;
    let updated = state.db.users.update(user.id, request).await?;
    info!(user_id = user.id, "Profile updated");
    Ok(Json(updated))
}

/// Tickets, organized events and certificates in one response
pub async fn dashboard(State(state): State<AppState>, AuthUser(user): AuthUser) -> Result<Json<serde_json::Value>> {
    Ok(Json(state.db.get_user_dashboard(user.id).await?))
}

pub async fn my_tickets(State(state): State<AppState>, AuthUser(user): AuthUser) -> Result<Json<Vec<TicketWithEvent>>> {
    Ok(Json(state.db.tickets.get_user_tickets(user.id).await?))
}

pub async fn my_orders(State(state): State<AppState>, AuthUser(user): AuthUser) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.db.tickets.get_user_orders(user.id).await?))
}

/// Certificates issued to the caller's email
pub async fn my_certificates(State(state): State<AppState>, AuthUser(user): AuthUser) -> Result<Json<Vec<Certificate>>> {
    Ok(Json(state.db.certificates.list_for_email(&user.email).await?))
}
