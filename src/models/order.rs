//! Order and ticket models

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use crate::utils::errors::{CampusEventsError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub quantity: i32,
    pub total_cents: i64,
    pub currency: String,
    pub status: String,
    pub buyer_name: String,
    pub buyer_email: String,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn status(&self) -> OrderStatus {
        self.status.parse().unwrap_or(OrderStatus::Confirmed)
    }
}

text_enum! {
    OrderStatus {
        Confirmed => "confirmed",
        Cancelled => "cancelled",
    }
}

/// An entry credential; the QR code encodes a signed reference to it
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: i64,
    pub order_id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub entry_code: String,
    pub holder_name: String,
    pub status: String,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub checked_in_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    pub fn status(&self) -> TicketStatus {
        self.status.parse().unwrap_or(TicketStatus::Cancelled)
    }
}

text_enum! {
    TicketStatus {
        Valid => "valid",
        CheckedIn => "checked_in",
        Cancelled => "cancelled",
    }
}

impl TicketStatus {
    pub fn can_transition_to(&self, next: TicketStatus) -> bool {
        matches!(
            (self, next),
            (TicketStatus::Valid, TicketStatus::CheckedIn) | (TicketStatus::Valid, TicketStatus::Cancelled)
        )
    }

    /// Counts against capacity
    pub fn is_active(&self) -> bool {
        !matches!(self, TicketStatus::Cancelled)
    }
}

/// Ticket joined with the event it admits to
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketWithEvent {
    pub id: i64,
    pub order_id: i64,
    pub event_id: i64,
    pub entry_code: String,
    pub holder_name: String,
    pub status: String,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub event_title: String,
    pub event_starts_at: DateTime<Utc>,
    pub event_ends_at: DateTime<Utc>,
    pub event_venue: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderWithTickets {
    #[serde(flatten)]
    pub order: Order,
    pub tickets: Vec<Ticket>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub quantity: i32,
    /// One name per ticket; missing names default to the buyer
    #[serde(default)]
    pub holder_names: Vec<String>,
    pub payment_reference: Option<String>,
}

impl CreateOrderRequest {
    pub fn validate(&self, max_per_order: i32) -> Result<()> {
        if self.quantity < 1 {
            return Err(CampusEventsError::InvalidInput(
                "Quantity must be at least 1".to_string(),
            ));
        }
        if self.quantity > max_per_order {
            return Err(CampusEventsError::InvalidInput(format!(
                "At most {} tickets per order",
                max_per_order
            )));
        }
        if self.holder_names.len() > self.quantity as usize {
            return Err(CampusEventsError::InvalidInput(
                "More holder names than tickets".to_string(),
            ));
        }
        Ok(())
    }

    /// Holder name for every ticket in the order
    pub fn holder_names_for(&self, buyer_name: &str) -> Vec<String> {
        (0..self.quantity as usize)
            .map(|i| {
                self.holder_names
                    .get(i)
                    .map(|n| n.trim())
                    .filter(|n| !n.is_empty())
                    .unwrap_or(buyer_name)
                    .to_string()
            })
            .collect()
    }
}

/// Scanned QR payload or a manually typed entry code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    pub payload: Option<String>,
    pub entry_code: Option<String>,
}

/// Result of validating a ticket at the door
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    Admitted,
    AlreadyCheckedIn,
    Cancelled,
    WrongEvent,
    NotFound,
    OutsideWindow,
    InvalidPayload,
}

impl ScanOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanOutcome::Admitted => "admitted",
            ScanOutcome::AlreadyCheckedIn => "already_checked_in",
            ScanOutcome::Cancelled => "cancelled",
            ScanOutcome::WrongEvent => "wrong_event",
            ScanOutcome::NotFound => "not_found",
            ScanOutcome::OutsideWindow => "outside_window",
            ScanOutcome::InvalidPayload => "invalid_payload",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ScanOutcome::Admitted => "Ticket valid, enjoy the event",
            ScanOutcome::AlreadyCheckedIn => "Ticket was already used",
            ScanOutcome::Cancelled => "Ticket has been cancelled",
            ScanOutcome::WrongEvent => "Ticket belongs to a different event",
            ScanOutcome::NotFound => "No ticket matches this code",
            ScanOutcome::OutsideWindow => "Check-in is not open for this event",
            ScanOutcome::InvalidPayload => "QR code could not be read",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub outcome: ScanOutcome,
    pub admitted: bool,
    pub message: String,
    pub ticket_id: Option<i64>,
    pub holder_name: Option<String>,
    pub checked_in_at: Option<DateTime<Utc>>,
}

impl ScanResult {
    pub fn new(outcome: ScanOutcome, ticket: Option<&Ticket>) -> Self {
        Self {
            outcome,
            admitted: outcome == ScanOutcome::Admitted,
            message: outcome.message().to_string(),
            ticket_id: ticket.map(|t| t.id),
            holder_name: ticket.map(|t| t.holder_name.clone()),
            checked_in_at: ticket.and_then(|t| t.checked_in_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrPayloadResponse {
    pub ticket_id: i64,
    pub payload: String,
    pub verify_url: String,
    pub expires_at: DateTime<Utc>,
}
