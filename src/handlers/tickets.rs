//! Orders, tickets and door scanning

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use crate::handlers::events::invalidate_event;
use crate::handlers::{managed_event, ApiJson};
use crate::middleware::AuthUser;
use crate::models::{CreateOrderRequest, Order, OrderWithTickets, QrPayloadResponse, ScanRequest, ScanResult, Ticket, TicketStatus};
use crate::services::export::{attendee_rows, csv_response};
use crate::utils::errors::Result;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AttendeeQuery {
    pub status: Option<TicketStatus>,
}

/// Buy tickets; capacity is decremented atomically with the order
pub async fn purchase(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
    ApiJson(request): ApiJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderWithTickets>)> {
    let order = state.services.ticketing_service.purchase(event_id, &user, request).await?;
    invalidate_event(&state, event_id).await;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
) -> Result<Json<Vec<Order>>> {
    managed_event(&state, &user, event_id).await?;
    Ok(Json(state.db.tickets.get_event_orders(event_id).await?))
}

/// Cancel an order and return its unused tickets to the pool
pub async fn cancel_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(order_id): Path<i64>,
) -> Result<Json<OrderWithTickets>> {
    let cancelled = state.services.ticketing_service.cancel_order(&user, order_id).await?;
    invalidate_event(&state, cancelled.order.event_id).await;
    Ok(Json(cancelled))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(ticket_id): Path<i64>,
) -> Result<Json<Ticket>> {
    Ok(Json(state.services.ticketing_service.ticket_for(&user, ticket_id).await?))
}

pub async fn ticket_qr(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(ticket_id): Path<i64>,
) -> Result<Json<QrPayloadResponse>> {
    Ok(Json(state.services.ticketing_service.qr_for_ticket(&user, ticket_id).await?))
}

/// Verify a QR payload or manual entry code and check the ticket in
pub async fn scan(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
    ApiJson(request): ApiJson<ScanRequest>,
) -> Result<Json<ScanResult>> {
    let event = state.db.require_event(event_id).await?;
    Ok(Json(state.services.ticketing_service.scan(&user, &event, request).await?))
}

pub async fn attendees(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
    Query(query): Query<AttendeeQuery>,
) -> Result<Json<Vec<Ticket>>> {
    managed_event(&state, &user, event_id).await?;
    Ok(Json(state.db.tickets.get_event_tickets(event_id, query.status).await?))
}

/// Attendee list as a CSV download
pub async fn export_attendees(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(event_id): Path<i64>,
) -> Result<Response> {
    let event = managed_event(&state, &user, event_id).await?;
    let tickets = state.db.tickets.get_event_tickets(event_id, None).await?;
    Ok(csv_response(&format!("{} attendees", event.title), attendee_rows(tickets)))
}
