//! Event repository implementation

use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use chrono::{DateTime, Utc};
use crate::models::event::{Event, EventStatus, EventQuery, CreateEventRequest, UpdateEventRequest, normalize_tags};
use crate::utils::errors::CampusEventsError;

pub(crate) const EVENT_COLUMNS: &str = "id, title, description, category, venue, is_online, online_url, starts_at, ends_at, capacity, tickets_remaining, price_cents, currency, organizer_id, status, tags, cover_image_url, created_at, updated_at";

#[derive(Clone)]
#[derive(Debug)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event in draft status
    pub async fn create(&self, organizer_id: i64, request: CreateEventRequest) -> Result<Event, CampusEventsError> {
        let tags = request.normalized_tags();
        let now = Utc::now();
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (title, description, category, venue, is_online, online_url, starts_at, ends_at,
                                capacity, tickets_remaining, price_cents, currency, organizer_id, status, tags,
                                cover_image_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9, $10, $11, $12, 'draft', $13, $14, $15, $15)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(request.title.trim())
        .bind(request.description)
        .bind(request.category.trim().to_lowercase())
        .bind(request.venue)
        .bind(request.is_online)
        .bind(request.online_url)
        .bind(request.starts_at)
        .bind(request.ends_at)
        .bind(request.capacity)
        .bind(request.price_cents)
        .bind(request.currency)
        .bind(organizer_id)
        .bind(tags)
        .bind(request.cover_image_url)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Find event by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Event>, CampusEventsError> {
        let event = sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(event)
    }

    /// Find event by ID or fail with `EventNotFound`
    pub async fn get(&self, id: i64) -> Result<Event, CampusEventsError> {
        self.find_by_id(id)
            .await?
            .ok_or(CampusEventsError::EventNotFound { event_id: id })
    }

    /// Write descriptive fields inside the caller's transaction.
    /// Capacity is applied separately by the ticket repository, which holds the event lock.
    pub(crate) async fn apply_update(
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
        request: UpdateEventRequest,
        now: DateTime<Utc>,
    ) -> Result<Event, CampusEventsError> {
        let tags = request.tags.as_deref().map(normalize_tags);
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                venue = COALESCE($5, venue),
                is_online = COALESCE($6, is_online),
                online_url = COALESCE($7, online_url),
                starts_at = COALESCE($8, starts_at),
                ends_at = COALESCE($9, ends_at),
                price_cents = COALESCE($10, price_cents),
                currency = COALESCE($11, currency),
                tags = COALESCE($12, tags),
                cover_image_url = COALESCE($13, cover_image_url),
                updated_at = $14
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.title.map(|t| t.trim().to_string()))
        .bind(request.description)
        .bind(request.category.map(|c| c.trim().to_lowercase()))
        .bind(request.venue)
        .bind(request.is_online)
        .bind(request.online_url)
        .bind(request.starts_at)
        .bind(request.ends_at)
        .bind(request.price_cents)
        .bind(request.currency)
        .bind(tags)
        .bind(request.cover_image_url)
        .bind(now)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(CampusEventsError::EventNotFound { event_id: id })?;

        Ok(event)
    }

    /// Move an event to a new status if it is still in `from`
    pub async fn set_status(&self, id: i64, from: EventStatus, to: EventStatus) -> Result<Event, CampusEventsError> {
        from.transition_to(to)?;

        let event = sqlx::query_as::<_, Event>(&format!(
            "UPDATE events SET status = $3, updated_at = $4 WHERE id = $1 AND status = $2 RETURNING {EVENT_COLUMNS}"
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match event {
            Some(event) => Ok(event),
            None => {
                let current = self.get(id).await?;
                Err(CampusEventsError::InvalidStateTransition {
                    from: current.status,
                    to: to.to_string(),
                })
            }
        }
    }

    /// Delete an event that has no active tickets
    pub async fn delete(&self, id: i64) -> Result<(), CampusEventsError> {
        let result = sqlx::query(
            r#"
            DELETE FROM events
            WHERE id = $1
              AND NOT EXISTS (SELECT 1 FROM tickets WHERE event_id = $1 AND status <> 'cancelled')
            "#
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            self.get(id).await?;
            return Err(CampusEventsError::Conflict(
                "Event has active tickets; cancel it instead".to_string(),
            ));
        }

        Ok(())
    }

    /// Discover events with filters
    pub async fn search(&self, query: &EventQuery, include_unpublished: bool) -> Result<Vec<Event>, CampusEventsError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {EVENT_COLUMNS} FROM events WHERE TRUE"));

        match query.status {
            Some(status) if include_unpublished || status != EventStatus::Draft => {
                builder.push(" AND status = ").push_bind(status.as_str());
            }
            _ if include_unpublished => {}
            _ => {
                builder.push(" AND status = 'published'");
            }
        }

        if let Some(pattern) = query.search_pattern() {
            builder
                .push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR venue ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(ref category) = query.category {
            builder.push(" AND category = ").push_bind(category.trim().to_lowercase());
        }
        if let Some(online) = query.online {
            builder.push(" AND is_online = ").push_bind(online);
        }
        match query.free {
            Some(true) => {
                builder.push(" AND price_cents = 0");
            }
            Some(false) => {
                builder.push(" AND price_cents > 0");
            }
            None => {}
        }
        if query.upcoming.unwrap_or(false) {
            builder.push(" AND ends_at > NOW()");
        }
        if let Some(organizer_id) = query.organizer_id {
            builder.push(" AND organizer_id = ").push_bind(organizer_id);
        }

        let pagination = query.pagination();
        builder
            .push(" ORDER BY starts_at ASC, id ASC LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let events = builder
            .build_query_as::<Event>()
            .fetch_all(&self.pool)
            .await?;

        Ok(events)
    }

    /// Upcoming published events in the same category
    pub async fn related(&self, event: &Event, limit: i64) -> Result<Vec<Event>, CampusEventsError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM events
            WHERE category = $1 AND id <> $2 AND status = 'published' AND ends_at > NOW()
            ORDER BY starts_at ASC
            LIMIT $3
            "#
        ))
        .bind(&event.category)
        .bind(event.id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Get events created by user
    pub async fn get_organizer_events(&self, organizer_id: i64) -> Result<Vec<Event>, CampusEventsError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE organizer_id = $1 ORDER BY starts_at ASC"
        ))
        .bind(organizer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Count total events
    pub async fn count(&self) -> Result<i64, CampusEventsError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
