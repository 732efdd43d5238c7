//! Order and ticket repository implementation
//!
//! Capacity is kept consistent by locking the event row (`FOR UPDATE`) in
//! every transaction that changes `tickets_remaining`. The lock order is
//! always event first, then orders and tickets.

use sqlx::{PgPool, Postgres, Transaction};
use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::database::repositories::event::{EventRepository, EVENT_COLUMNS};
use crate::models::event::{Event, EventStatus, UpdateEventRequest};
use crate::models::order::{Order, OrderWithTickets, Ticket, TicketStatus, TicketWithEvent, ScanOutcome};
use crate::utils::errors::CampusEventsError;
use crate::utils::helpers::generate_entry_code;

const ORDER_COLUMNS: &str = "id, event_id, user_id, quantity, total_cents, currency, status, buyer_name, buyer_email, payment_reference, created_at, cancelled_at";
const TICKET_COLUMNS: &str = "id, order_id, event_id, user_id, entry_code, holder_name, status, checked_in_at, checked_in_by, created_at";

/// Attempts to find an unused entry code before giving up
const ENTRY_CODE_ATTEMPTS: usize = 5;

/// Everything needed to write an order
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub event_id: i64,
    pub user_id: i64,
    pub buyer_name: String,
    pub buyer_email: String,
    pub holder_names: Vec<String>,
    pub payment_reference: Option<String>,
    pub entry_code_length: usize,
}

/// Aggregated ticket numbers for one event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct TicketStats {
    pub orders_confirmed: i64,
    pub orders_cancelled: i64,
    pub tickets_valid: i64,
    pub tickets_checked_in: i64,
    pub tickets_cancelled: i64,
    pub revenue_cents: i64,
}

impl TicketStats {
    pub fn tickets_issued(&self) -> i64 {
        self.tickets_valid + self.tickets_checked_in
    }

    /// Share of issued tickets that were checked in
    pub fn attendance_rate(&self) -> Option<f64> {
        let issued = self.tickets_issued();
        if issued == 0 {
            None
        } else {
            Some(self.tickets_checked_in as f64 / issued as f64)
        }
    }
}

#[derive(Clone)]
#[derive(Debug)]
pub struct TicketRepository {
    pool: PgPool,
}

impl TicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_event(tx: &mut Transaction<'_, Postgres>, event_id: i64) -> Result<Event, CampusEventsError> {
        sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE"))
            .bind(event_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(CampusEventsError::EventNotFound { event_id })
    }

    async fn order_tickets(tx: &mut Transaction<'_, Postgres>, order_id: i64) -> Result<Vec<Ticket>, CampusEventsError> {
        let tickets = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(&mut **tx)
        .await?;

        Ok(tickets)
    }

    /// Reserve capacity, write the order and issue one ticket per holder
    pub async fn create_order(&self, new_order: NewOrder, now: DateTime<Utc>) -> Result<OrderWithTickets, CampusEventsError> {
        let quantity = new_order.holder_names.len() as i32;
        let mut tx = self.pool.begin().await?;

        let event = Self::lock_event(&mut tx, new_order.event_id).await?;

        if event.status() != EventStatus::Published {
            return Err(CampusEventsError::Conflict(format!(
                "Event {} is not open for ticket sales ({})",
                event.id, event.status
            )));
        }
        if event.has_ended(now) {
            return Err(CampusEventsError::Conflict(format!("Event {} has already ended", event.id)));
        }
        if event.price_cents > 0 && new_order.payment_reference.is_none() {
            return Err(CampusEventsError::InvalidInput(
                "A payment reference is required for paid events".to_string(),
            ));
        }

        if let Some(remaining) = event.tickets_remaining {
            if remaining < quantity {
                return Err(CampusEventsError::SoldOut {
                    event_id: event.id,
                    requested: quantity,
                    remaining,
                });
            }

            sqlx::query("UPDATE events SET tickets_remaining = tickets_remaining - $2, updated_at = $3 WHERE id = $1")
                .bind(event.id)
                .bind(quantity)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders (event_id, user_id, quantity, total_cents, currency, status, buyer_name, buyer_email, payment_reference, created_at)
            VALUES ($1, $2, $3, $4, $5, 'confirmed', $6, $7, $8, $9)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(event.id)
        .bind(new_order.user_id)
        .bind(quantity)
        .bind(event.price_cents * quantity as i64)
        .bind(&event.currency)
        .bind(&new_order.buyer_name)
        .bind(&new_order.buyer_email)
        .bind(&new_order.payment_reference)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let mut tickets = Vec::with_capacity(new_order.holder_names.len());
        for holder_name in &new_order.holder_names {
            let ticket = Self::insert_ticket(&mut tx, &order, holder_name, new_order.entry_code_length, now).await?;
            tickets.push(ticket);
        }

        tx.commit().await?;

        Ok(OrderWithTickets { order, tickets })
    }

    async fn insert_ticket(
        tx: &mut Transaction<'_, Postgres>,
        order: &Order,
        holder_name: &str,
        code_length: usize,
        now: DateTime<Utc>,
    ) -> Result<Ticket, CampusEventsError> {
        for _ in 0..ENTRY_CODE_ATTEMPTS {
            let ticket = sqlx::query_as::<_, Ticket>(&format!(
                r#"
                INSERT INTO tickets (order_id, event_id, user_id, entry_code, holder_name, status, created_at)
                VALUES ($1, $2, $3, $4, $5, 'valid', $6)
                ON CONFLICT (entry_code) DO NOTHING
                RETURNING {TICKET_COLUMNS}
                "#
            ))
            .bind(order.id)
            .bind(order.event_id)
            .bind(order.user_id)
            .bind(generate_entry_code(code_length))
            .bind(holder_name)
            .bind(now)
            .fetch_optional(&mut **tx)
            .await?;

            if let Some(ticket) = ticket {
                return Ok(ticket);
            }
            tracing::warn!(order_id = order.id, "Entry code collision, regenerating");
        }

        Err(CampusEventsError::ServiceUnavailable(
            "Could not allocate a unique entry code".to_string(),
        ))
    }

    /// Cancel an order and give its seats back. Refused once any ticket was used.
    pub async fn cancel_order(&self, order_id: i64, now: DateTime<Utc>) -> Result<OrderWithTickets, CampusEventsError> {
        let event_id = self
            .find_order(order_id)
            .await?
            .ok_or(CampusEventsError::OrderNotFound { order_id })?
            .event_id;

        let mut tx = self.pool.begin().await?;
        Self::lock_event(&mut tx, event_id).await?;

        let order = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"))
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(CampusEventsError::OrderNotFound { order_id })?;

        if order.status == "cancelled" {
            let tickets = Self::order_tickets(&mut tx, order_id).await?;
            tx.commit().await?;
            return Ok(OrderWithTickets { order, tickets });
        }

        let checked_in: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM tickets WHERE order_id = $1 AND status = 'checked_in'"
        )
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        if checked_in.0 > 0 {
            return Err(CampusEventsError::Conflict(format!(
                "Order {} has {} checked-in ticket(s) and cannot be cancelled",
                order_id, checked_in.0
            )));
        }

        let released = sqlx::query("UPDATE tickets SET status = 'cancelled' WHERE order_id = $1 AND status = 'valid'")
            .bind(order_id)
            .execute(&mut *tx)
            .await?
            .rows_affected() as i32;

        sqlx::query(
            "UPDATE events SET tickets_remaining = tickets_remaining + $2, updated_at = $3 WHERE id = $1 AND capacity IS NOT NULL"
        )
        .bind(event_id)
        .bind(released)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let order = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET status = 'cancelled', cancelled_at = $2 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let tickets = Self::order_tickets(&mut tx, order_id).await?;
        tx.commit().await?;

        Ok(OrderWithTickets { order, tickets })
    }

    /// Cancel an event together with every unused ticket and untouched order.
    /// Returns the updated event and the number of tickets released.
    pub async fn cancel_event(&self, event_id: i64, now: DateTime<Utc>) -> Result<(Event, i64), CampusEventsError> {
        let mut tx = self.pool.begin().await?;
        let event = Self::lock_event(&mut tx, event_id).await?;
        event.status().transition_to(EventStatus::Cancelled)?;

        let released = sqlx::query("UPDATE tickets SET status = 'cancelled' WHERE event_id = $1 AND status = 'valid'")
            .bind(event_id)
            .execute(&mut *tx)
            .await?
            .rows_affected() as i64;

        sqlx::query(
            r#"
            UPDATE orders SET status = 'cancelled', cancelled_at = $2
            WHERE event_id = $1 AND status = 'confirmed'
              AND NOT EXISTS (SELECT 1 FROM tickets t WHERE t.order_id = orders.id AND t.status = 'checked_in')
            "#
        )
        .bind(event_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events
            SET status = 'cancelled',
                tickets_remaining = CASE WHEN capacity IS NULL THEN NULL ELSE tickets_remaining + $2 END,
                updated_at = $3
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(event_id)
        .bind(released as i32)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((event, released))
    }

    /// Edit an event under its row lock. Capacity, the price lock and the
    /// descriptive fields are checked against the ticket count and written in
    /// one transaction, so a concurrent sale cannot slip in between.
    pub async fn update_event(
        &self,
        event_id: i64,
        mut request: UpdateEventRequest,
        now: DateTime<Utc>,
    ) -> Result<Event, CampusEventsError> {
        let mut tx = self.pool.begin().await?;
        let event = Self::lock_event(&mut tx, event_id).await?;

        if matches!(event.status(), EventStatus::Cancelled | EventStatus::Completed) {
            return Err(CampusEventsError::Conflict(format!("A {} event cannot be edited", event.status)));
        }

        let issued = Self::count_issued(&mut tx, event_id).await?;
        request.validate_against(&event, issued)?;

        if let Some(capacity) = request.capacity.take() {
            Self::update_capacity(&mut tx, event_id, capacity, issued, now).await?;
        }
        let updated = EventRepository::apply_update(&mut tx, event_id, request, now).await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn count_issued(tx: &mut Transaction<'_, Postgres>, event_id: i64) -> Result<i64, CampusEventsError> {
        let issued: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM tickets WHERE event_id = $1 AND status <> 'cancelled'"
        )
        .bind(event_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(issued.0)
    }

    /// Set a new capacity; the event must already be locked by `tx`
    async fn update_capacity(
        tx: &mut Transaction<'_, Postgres>,
        event_id: i64,
        capacity: i32,
        issued: i64,
        now: DateTime<Utc>,
    ) -> Result<(), CampusEventsError> {
        if (capacity as i64) < issued {
            return Err(CampusEventsError::Conflict(format!(
                "Capacity {} is below the {} tickets already issued",
                capacity, issued
            )));
        }

        sqlx::query("UPDATE events SET capacity = $2, tickets_remaining = $3, updated_at = $4 WHERE id = $1")
            .bind(event_id)
            .bind(capacity)
            .bind(capacity - issued as i32)
            .bind(now)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Validate an entry code at the door and check the ticket in.
    /// The conditional update guarantees a ticket is admitted at most once.
    pub async fn check_in(
        &self,
        event_id: i64,
        entry_code: &str,
        scanner_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(ScanOutcome, Option<Ticket>), CampusEventsError> {
        let ticket = match self.find_by_entry_code(entry_code).await? {
            Some(ticket) => ticket,
            None => return Ok((ScanOutcome::NotFound, None)),
        };

        if ticket.event_id != event_id {
            return Ok((ScanOutcome::WrongEvent, None));
        }

        match ticket.status() {
            TicketStatus::CheckedIn => return Ok((ScanOutcome::AlreadyCheckedIn, Some(ticket))),
            TicketStatus::Cancelled => return Ok((ScanOutcome::Cancelled, Some(ticket))),
            TicketStatus::Valid => {}
        }

        let admitted = sqlx::query_as::<_, Ticket>(&format!(
            r#"
            UPDATE tickets
            SET status = 'checked_in', checked_in_at = $2, checked_in_by = $3
            WHERE id = $1 AND status = 'valid'
            RETURNING {TICKET_COLUMNS}
            "#
        ))
        .bind(ticket.id)
        .bind(now)
        .bind(scanner_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(ticket) = admitted {
            return Ok((ScanOutcome::Admitted, Some(ticket)));
        }

        // Lost a race with another scanner or a cancellation
        let current = self
            .find_by_id(ticket.id)
            .await?
            .ok_or(CampusEventsError::TicketNotFound { ticket_id: ticket.id })?;
        let outcome = match current.status() {
            TicketStatus::Cancelled => ScanOutcome::Cancelled,
            _ => ScanOutcome::AlreadyCheckedIn,
        };
        Ok((outcome, Some(current)))
    }

    /// Find order by ID
    pub async fn find_order(&self, id: i64) -> Result<Option<Order>, CampusEventsError> {
        let order = sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Find ticket by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Ticket>, CampusEventsError> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ticket)
    }

    /// Find ticket by entry code
    pub async fn find_by_entry_code(&self, entry_code: &str) -> Result<Option<Ticket>, CampusEventsError> {
        let ticket = sqlx::query_as::<_, Ticket>(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE entry_code = $1"))
            .bind(entry_code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ticket)
    }

    /// Tickets belonging to an order
    pub async fn get_order_tickets(&self, order_id: i64) -> Result<Vec<Ticket>, CampusEventsError> {
        let tickets = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tickets)
    }

    /// All tickets of an event, optionally only one status
    pub async fn get_event_tickets(&self, event_id: i64, status: Option<TicketStatus>) -> Result<Vec<Ticket>, CampusEventsError> {
        let tickets = sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE event_id = $1 AND ($2::TEXT IS NULL OR status = $2) ORDER BY holder_name, id"
        ))
        .bind(event_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        Ok(tickets)
    }

    /// Orders placed for an event
    pub async fn get_event_orders(&self, event_id: i64) -> Result<Vec<Order>, CampusEventsError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE event_id = $1 ORDER BY created_at DESC"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Orders placed by a user
    pub async fn get_user_orders(&self, user_id: i64) -> Result<Vec<Order>, CampusEventsError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Tickets held by a user with event details
    pub async fn get_user_tickets(&self, user_id: i64) -> Result<Vec<TicketWithEvent>, CampusEventsError> {
        let tickets = sqlx::query_as::<_, TicketWithEvent>(
            r#"
            SELECT t.id, t.order_id, t.event_id, t.entry_code, t.holder_name, t.status, t.checked_in_at,
                   e.title AS event_title, e.starts_at AS event_starts_at, e.ends_at AS event_ends_at,
                   e.venue AS event_venue
            FROM tickets t
            INNER JOIN events e ON e.id = t.event_id
            WHERE t.user_id = $1
            ORDER BY e.starts_at ASC, t.id ASC
            "#
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tickets)
    }

    /// Whether the user holds a non-cancelled ticket for the event
    pub async fn has_active_ticket(&self, event_id: i64, user_id: i64) -> Result<bool, CampusEventsError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM tickets WHERE event_id = $1 AND user_id = $2 AND status <> 'cancelled'"
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0 > 0)
    }

    /// Sales and attendance numbers for an event
    pub async fn get_stats(&self, event_id: i64) -> Result<TicketStats, CampusEventsError> {
        let stats = sqlx::query_as::<_, TicketStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM orders WHERE event_id = $1 AND status = 'confirmed') AS orders_confirmed,
                (SELECT COUNT(*) FROM orders WHERE event_id = $1 AND status = 'cancelled') AS orders_cancelled,
                (SELECT COUNT(*) FROM tickets WHERE event_id = $1 AND status = 'valid') AS tickets_valid,
                (SELECT COUNT(*) FROM tickets WHERE event_id = $1 AND status = 'checked_in') AS tickets_checked_in,
                (SELECT COUNT(*) FROM tickets WHERE event_id = $1 AND status = 'cancelled') AS tickets_cancelled,
                (SELECT COALESCE(SUM(total_cents), 0)::BIGINT FROM orders WHERE event_id = $1 AND status = 'confirmed') AS revenue_cents
            "#
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attendance_rate() {
        let stats = TicketStats {
            tickets_valid: 30,
            tickets_checked_in: 70,
            ..Default::default()
        };
        assert_eq!(stats.tickets_issued(), 100);
        assert_eq!(stats.attendance_rate(), Some(0.7));
        assert_eq!(TicketStats::default().attendance_rate(), None);
    }
}
