//! Ticketing service implementation
//!
//! Orchestrates ticket purchase, order cancellation, QR payload issuance and
//! door scanning on top of the ticket repository.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use crate::config::settings::TicketingConfig;
use crate::database::DatabaseService;
use crate::database::repositories::NewOrder;
use crate::models::{
    CreateOrderRequest, Event, EventStatus, OrderWithTickets, QrPayloadResponse, ScanOutcome, ScanRequest,
    ScanResult, Ticket, TicketStatus, User,
};
use crate::services::auth::AuthService;
use crate::services::qr::QrService;
use crate::utils::errors::{CampusEventsError, Result};
use crate::utils::helpers::{is_valid_entry_code, normalize_entry_code};
use crate::utils::logging::{log_order_action, log_ticket_scan};

/// Period during which tickets for an event can be checked in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckInWindow {
    pub opens_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
}

impl CheckInWindow {
    pub fn for_event(event: &Event, opens_minutes: i64, grace_minutes: i64) -> Self {
        Self {
            opens_at: event.starts_at - Duration::minutes(opens_minutes),
            closes_at: event.ends_at + Duration::minutes(grace_minutes),
        }
    }

    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        now >= self.opens_at && now <= self.closes_at
    }
}

/// Entry code resolved from a scan request
#[derive(Debug, Clone, PartialEq, Eq)]
enum ScannedCode {
    Code(String),
    Rejected(ScanOutcome),
}

#[derive(Clone, Debug)]
pub struct TicketingService {
    db: DatabaseService,
    qr: QrService,
    config: TicketingConfig,
}

impl TicketingService {
    pub fn new(db: DatabaseService, qr: QrService, config: TicketingConfig) -> Self {
        Self { db, qr, config }
    }

    pub fn check_in_window(&self, event: &Event) -> CheckInWindow {
        CheckInWindow::for_event(event, self.config.check_in_opens_minutes, self.config.check_in_grace_minutes)
    }

    /// Buy tickets for an event
    pub async fn purchase(&self, event_id: i64, buyer: &User, request: CreateOrderRequest) -> Result<OrderWithTickets> {
        request.validate(self.config.max_tickets_per_order)?;

        let event = self.db.require_event(event_id).await?;
        let payment_reference = request
            .payment_reference
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        if !event.is_free() && payment_reference.is_none() {
            return Err(CampusEventsError::InvalidInput(
                "A payment reference is required for paid events".to_string(),
            ));
        }

        let new_order = NewOrder {
            event_id,
            user_id: buyer.id,
            buyer_name: buyer.full_name.clone(),
            buyer_email: buyer.email.clone(),
            holder_names: request.holder_names_for(&buyer.full_name),
            payment_reference,
            entry_code_length: self.config.entry_code_length,
        };

        let order = self.db.tickets.create_order(new_order, Utc::now()).await?;
        log_order_action(order.order.id, event_id, "purchased", order.order.quantity);
        Ok(order)
    }

    /// Cancel an order as its owner or an event manager
    pub async fn cancel_order(&self, actor: &User, order_id: i64) -> Result<OrderWithTickets> {
        let order = self.db.require_order(order_id).await?;
        if order.user_id != actor.id {
            let event = self.db.require_event(order.event_id).await?;
            AuthService::require_event_manager(actor, &event)?;
        }

        let cancelled = self.db.tickets.cancel_order(order_id, Utc::now()).await?;
        log_order_action(order_id, order.event_id, "cancelled", cancelled.order.quantity);
        Ok(cancelled)
    }

    /// Cancel an event and release every unused ticket
    pub async fn cancel_event(&self, actor: &User, event: &Event) -> Result<Event> {
        AuthService::require_event_manager(actor, event)?;
        let (event, released) = self.db.tickets.cancel_event(event.id, Utc::now()).await?;
        info!(event_id = event.id, released = released, "Event cancelled, tickets released");
        Ok(event)
    }

    /// Ticket detail for its owner or an event manager
    pub async fn ticket_for(&self, viewer: &User, ticket_id: i64) -> Result<Ticket> {
        let ticket = self.db.require_ticket(ticket_id).await?;
        if ticket.user_id != viewer.id {
            let event = self.db.require_event(ticket.event_id).await?;
            AuthService::require_event_manager(viewer, &event)?;
        }
        Ok(ticket)
    }

    /// Signed QR payload for a ticket, owner only
    pub async fn qr_for_ticket(&self, owner: &User, ticket_id: i64) -> Result<QrPayloadResponse> {
        let ticket = self.db.require_ticket(ticket_id).await?;
        if ticket.user_id != owner.id {
            return Err(CampusEventsError::PermissionDenied(
                "Only the ticket holder can display its QR code".to_string(),
            ));
        }
        if ticket.status() == TicketStatus::Cancelled {
            return Err(CampusEventsError::Conflict("Ticket has been cancelled".to_string()));
        }

        let event = self.db.require_event(ticket.event_id).await?;
        self.qr.sign(&ticket, &event)
    }

    /// Validate a scanned ticket at the door and check it in
    pub async fn scan(&self, scanner: &User, event: &Event, request: ScanRequest) -> Result<ScanResult> {
        let roles = self.db.stakeholders.roles_for_user(event.id, scanner.id, &scanner.email).await?;
        if !AuthService::can_scan(scanner, event, &roles) {
            return Err(CampusEventsError::PermissionDenied(format!(
                "User {} cannot scan tickets for event {}",
                scanner.id, event.id
            )));
        }

        let now = Utc::now();
        let (outcome, ticket) = match self.resolve_code(event, &request) {
            ScannedCode::Rejected(outcome) => (outcome, None),
            ScannedCode::Code(_) if !self.is_checking_in(event, now) => (ScanOutcome::OutsideWindow, None),
            ScannedCode::Code(code) => self.db.tickets.check_in(event.id, &code, scanner.id, now).await?,
        };

        log_ticket_scan(event.id, scanner.id, outcome.as_str(), ticket.as_ref().map(|t| t.id));
        if outcome != ScanOutcome::Admitted {
            warn!(event_id = event.id, outcome = outcome.as_str(), "Ticket refused at the door");
        }
        Ok(ScanResult::new(outcome, ticket.as_ref()))
    }

    fn is_checking_in(&self, event: &Event, now: DateTime<Utc>) -> bool {
        event.status() == EventStatus::Published && self.check_in_window(event).contains(now)
    }

    fn resolve_code(&self, event: &Event, request: &ScanRequest) -> ScannedCode {
        if let Some(payload) = request.payload.as_deref().filter(|p| !p.trim().is_empty()) {
            return match self.qr.verify(payload) {
                Ok(claims) if claims.eid != event.id => ScannedCode::Rejected(ScanOutcome::WrongEvent),
                Ok(claims) => ScannedCode::Code(claims.code),
                Err(_) => ScannedCode::Rejected(ScanOutcome::InvalidPayload),
            };
        }

        match request.entry_code.as_deref() {
            Some(raw) => {
                let code = normalize_entry_code(raw);
                if is_valid_entry_code(&code, self.config.entry_code_length) {
                    ScannedCode::Code(code)
                } else {
                    ScannedCode::Rejected(ScanOutcome::InvalidPayload)
                }
            }
            None => ScannedCode::Rejected(ScanOutcome::InvalidPayload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::tests::sample_event;

    fn service() -> TicketingService {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgresql://localhost/campus_events_test")
            .unwrap();
        let config = TicketingConfig {
            qr_secret: "qr-signing-secret-that-is-long-enough-123".to_string(),
            ..TicketingConfig::default()
        };
        TicketingService::new(DatabaseService::new(pool), QrService::new(&config), config)
    }

    fn ticket(event_id: i64, code: &str) -> Ticket {
        Ticket {
            id: 3,
            order_id: 2,
            event_id,
            user_id: 1,
            entry_code: code.to_string(),
            holder_name: "Sam".to_string(),
            status: "valid".to_string(),
            checked_in_at: None,
            checked_in_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_check_in_window() {
        let event = sample_event();
        let window = CheckInWindow::for_event(&event, 60, 30);
        assert!(!window.contains(event.starts_at - Duration::minutes(61)));
        assert!(window.contains(event.starts_at - Duration::minutes(60)));
        assert!(window.contains(event.ends_at + Duration::minutes(30)));
        assert!(!window.contains(event.ends_at + Duration::minutes(31)));
    }

    #[tokio::test]
    async fn test_only_published_events_check_in() {
        let service = service();
        let mut event = sample_event();
        let during = event.starts_at + Duration::minutes(5);
        assert!(service.is_checking_in(&event, during));

        event.status = "cancelled".to_string();
        assert!(!service.is_checking_in(&event, during));
    }

    #[tokio::test]
    async fn test_resolve_manual_entry_codes() {
        let service = service();
        let event = sample_event();

        let request = ScanRequest { payload: None, entry_code: Some(" abcd-efgh23 ".to_string()) };
        assert_eq!(service.resolve_code(&event, &request), ScannedCode::Code("ABCDEFGH23".to_string()));

        let request = ScanRequest { payload: None, entry_code: Some("SHORT".to_string()) };
        assert_eq!(service.resolve_code(&event, &request), ScannedCode::Rejected(ScanOutcome::InvalidPayload));

        let request = ScanRequest { payload: None, entry_code: None };
        assert_eq!(service.resolve_code(&event, &request), ScannedCode::Rejected(ScanOutcome::InvalidPayload));
    }

    #[tokio::test]
    async fn test_resolve_qr_payloads() {
        let service = service();
        let event = sample_event();
        let signed = service.qr.sign(&ticket(event.id, "ABCDEFGH23"), &event).unwrap();

        let request = ScanRequest { payload: Some(signed.payload.clone()), entry_code: None };
        assert_eq!(service.resolve_code(&event, &request), ScannedCode::Code("ABCDEFGH23".to_string()));

        let mut other_event = sample_event();
        other_event.id = 2;
        assert_eq!(
            service.resolve_code(&other_event, &request),
            ScannedCode::Rejected(ScanOutcome::WrongEvent)
        );

        let request = ScanRequest { payload: Some("garbage".to_string()), entry_code: Some("ABCDEFGH23".to_string()) };
        assert_eq!(service.resolve_code(&event, &request), ScannedCode::Rejected(ScanOutcome::InvalidPayload));
    }
}
