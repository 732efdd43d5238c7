//! Event model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use crate::utils::errors::{CampusEventsError, Result};
use crate::utils::helpers::{validate_http_url, Pagination};

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_TAGS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub venue: Option<String>,
    pub is_online: bool,
    pub online_url: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: Option<i32>,
    pub tickets_remaining: Option<i32>,
    pub price_cents: i64,
    pub currency: String,
    pub organizer_id: i64,
    pub status: String,
    pub tags: Vec<String>,
    pub cover_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn status(&self) -> EventStatus {
        self.status.parse().unwrap_or(EventStatus::Draft)
    }

    pub fn is_free(&self) -> bool {
        self.price_cents == 0
    }

    /// Tickets issued and not cancelled, `None` for unlimited events
    pub fn tickets_sold(&self) -> Option<i32> {
        match (self.capacity, self.tickets_remaining) {
            (Some(capacity), Some(remaining)) => Some(capacity - remaining),
            _ => None,
        }
    }

    pub fn is_sold_out(&self) -> bool {
        matches!(self.tickets_remaining, Some(remaining) if remaining <= 0)
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.ends_at <= now
    }

    /// Whether tickets can currently be ordered
    pub fn is_on_sale(&self, now: DateTime<Utc>) -> bool {
        self.status() == EventStatus::Published && !self.has_ended(now) && !self.is_sold_out()
    }
}

text_enum! {
    /// Event lifecycle
    EventStatus {
        Draft => "draft",
        Published => "published",
        Cancelled => "cancelled",
        Completed => "completed",
    }
}

impl EventStatus {
    pub fn can_transition_to(&self, next: EventStatus) -> bool {
        matches!(
            (self, next),
            (EventStatus::Draft, EventStatus::Published)
                | (EventStatus::Draft, EventStatus::Cancelled)
                | (EventStatus::Published, EventStatus::Cancelled)
                | (EventStatus::Published, EventStatus::Completed)
        )
    }

    pub fn transition_to(&self, next: EventStatus) -> Result<EventStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CampusEventsError::InvalidStateTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

/// Event with derived availability, as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    pub tickets_sold: Option<i32>,
    pub is_sold_out: bool,
    pub is_on_sale: bool,
    pub can_manage: bool,
}

impl EventDetail {
    pub fn new(event: Event, can_manage: bool, now: DateTime<Utc>) -> Self {
        Self {
            tickets_sold: event.tickets_sold(),
            is_sold_out: event.is_sold_out(),
            is_on_sale: event.is_on_sale(now),
            can_manage,
            event,
        }
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub venue: Option<String>,
    #[serde(default)]
    pub is_online: bool,
    pub online_url: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: Option<i32>,
    #[serde(default)]
    pub price_cents: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub cover_image_url: Option<String>,
}

impl CreateEventRequest {
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        validate_category(&self.category)?;
        validate_schedule(self.starts_at, self.ends_at)?;
        validate_location(self.is_online, self.venue.as_deref(), self.online_url.as_deref())?;
        validate_capacity(self.capacity)?;
        validate_pricing(self.price_cents, &self.currency)?;
        validate_tags(&self.tags)?;
        if let Some(ref url) = self.cover_image_url {
            validate_http_url(url)?;
        }
        Ok(())
    }

    /// Tags trimmed, lowercased and deduplicated
    pub fn normalized_tags(&self) -> Vec<String> {
        normalize_tags(&self.tags)
    }
}

/// Partial update; `capacity` goes through the capacity check in the repository
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub venue: Option<String>,
    pub is_online: Option<bool>,
    pub online_url: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub capacity: Option<i32>,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub tags: Option<Vec<String>>,
    pub cover_image_url: Option<String>,
}

impl UpdateEventRequest {
    /// Validate the update as applied on top of the current event, which has
    /// `tickets_issued` active tickets
    pub fn validate_against(&self, current: &Event, tickets_issued: i64) -> Result<()> {
        if let Some(ref title) = self.title {
            validate_title(title)?;
        }
        if let Some(ref category) = self.category {
            validate_category(category)?;
        }

        let starts_at = self.starts_at.unwrap_or(current.starts_at);
        let ends_at = self.ends_at.unwrap_or(current.ends_at);
        validate_schedule(starts_at, ends_at)?;

        let is_online = self.is_online.unwrap_or(current.is_online);
        let venue = self.venue.as_deref().or(current.venue.as_deref());
        let online_url = self.online_url.as_deref().or(current.online_url.as_deref());
        validate_location(is_online, venue, online_url)?;

        validate_capacity(self.capacity)?;

        let price = self.price_cents.unwrap_or(current.price_cents);
        let currency = self.currency.as_deref().unwrap_or(&current.currency);
        validate_pricing(price, currency)?;

        if price != current.price_cents && tickets_issued > 0 {
            return Err(CampusEventsError::Conflict(
                "Price cannot change after tickets have been sold".to_string(),
            ));
        }

        if let Some(ref tags) = self.tags {
            validate_tags(tags)?;
        }
        if let Some(ref url) = self.cover_image_url {
            validate_http_url(url)?;
        }
        Ok(())
    }
}

/// Discovery filters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub online: Option<bool>,
    pub free: Option<bool>,
    pub upcoming: Option<bool>,
    pub organizer_id: Option<i64>,
    pub status: Option<EventStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl EventQuery {
    pub fn pagination(&self) -> Pagination {
        let defaults = Pagination::default();
        Pagination {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
        .normalized()
    }

    /// `%term%` pattern for ILIKE search with wildcards escaped
    pub fn search_pattern(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| {
                let escaped = q.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
                format!("%{}%", escaped)
            })
    }
}

fn validate_title(title: &str) -> Result<()> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(CampusEventsError::InvalidInput("Event title is required".to_string()));
    }
    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        return Err(CampusEventsError::InvalidInput(format!(
            "Event title must be at most {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(())
}

fn validate_category(category: &str) -> Result<()> {
    if category.trim().is_empty() {
        return Err(CampusEventsError::InvalidInput("Event category is required".to_string()));
    }
    Ok(())
}

fn validate_schedule(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<()> {
    if ends_at <= starts_at {
        return Err(CampusEventsError::InvalidInput(
            "Event must end after it starts".to_string(),
        ));
    }
    Ok(())
}

fn validate_location(is_online: bool, venue: Option<&str>, online_url: Option<&str>) -> Result<()> {
    if is_online {
        match online_url {
            Some(url) => {
                validate_http_url(url)?;
            }
            None => {
                return Err(CampusEventsError::InvalidInput(
                    "Online events need an online_url".to_string(),
                ))
            }
        }
    } else if venue.map(str::trim).unwrap_or_default().is_empty() {
        return Err(CampusEventsError::InvalidInput(
            "In-person events need a venue".to_string(),
        ));
    }
    Ok(())
}

fn validate_capacity(capacity: Option<i32>) -> Result<()> {
    if let Some(capacity) = capacity {
        if capacity < 1 {
            return Err(CampusEventsError::InvalidInput(
                "Capacity must be at least 1".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_pricing(price_cents: i64, currency: &str) -> Result<()> {
    if price_cents < 0 {
        return Err(CampusEventsError::InvalidInput("Price cannot be negative".to_string()));
    }
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(CampusEventsError::InvalidInput(format!(
            "Currency must be a 3-letter ISO code, got {}",
            currency
        )));
    }
    Ok(())
}

fn validate_tags(tags: &[String]) -> Result<()> {
    if tags.len() > MAX_TAGS {
        return Err(CampusEventsError::InvalidInput(format!(
            "At most {} tags are allowed",
            MAX_TAGS
        )));
    }
    Ok(())
}

pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) fn sample_event() -> Event {
        let now = Utc::now();
        Event {
            id: 1,
            title: "Rust Meetup".to_string(),
            description: Some("Talks and pizza".to_string()),
            category: "tech".to_string(),
            venue: Some("Hall B".to_string()),
            is_online: false,
            online_url: None,
            starts_at: now + Duration::days(7),
            ends_at: now + Duration::days(7) + Duration::hours(3),
            capacity: Some(100),
            tickets_remaining: Some(60),
            price_cents: 0,
            currency: "USD".to_string(),
            organizer_id: 10,
            status: "published".to_string(),
            tags: vec!["rust".to_string()],
            cover_image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_request() -> CreateEventRequest {
        let now = Utc::now();
        CreateEventRequest {
            title: "Spring Hackathon".to_string(),
            description: None,
            category: "tech".to_string(),
            venue: Some("Library".to_string()),
            is_online: false,
            online_url: None,
            starts_at: now + Duration::days(1),
            ends_at: now + Duration::days(2),
            capacity: Some(50),
            price_cents: 500,
            currency: "USD".to_string(),
            tags: vec![" Rust ".to_string(), "rust".to_string(), "AI".to_string()],
            cover_image_url: None,
        }
    }

    #[test]
    fn test_status_transitions() {
        assert!(EventStatus::Draft.can_transition_to(EventStatus::Published));
        assert!(EventStatus::Published.can_transition_to(EventStatus::Cancelled));
        assert!(EventStatus::Published.can_transition_to(EventStatus::Completed));
        assert!(!EventStatus::Draft.can_transition_to(EventStatus::Completed));
        assert!(!EventStatus::Cancelled.can_transition_to(EventStatus::Published));
        assert!(!EventStatus::Completed.can_transition_to(EventStatus::Cancelled));
        assert!(EventStatus::Cancelled.transition_to(EventStatus::Draft).is_err());
    }

    #[test]
    fn test_availability() {
        let mut event = sample_event();
        assert_eq!(event.tickets_sold(), Some(40));
        assert!(!event.is_sold_out());
        assert!(event.is_on_sale(Utc::now()));

        event.tickets_remaining = Some(0);
        assert!(event.is_sold_out());
        assert!(!event.is_on_sale(Utc::now()));

        event.capacity = None;
        event.tickets_remaining = None;
        assert_eq!(event.tickets_sold(), None);
        assert!(!event.is_sold_out());
    }

    #[test]
    fn test_drafts_are_not_on_sale() {
        let mut event = sample_event();
        event.status = "draft".to_string();
        assert!(!event.is_on_sale(Utc::now()));
    }

    #[test]
    fn test_create_request_validation() {
        assert!(sample_request().validate().is_ok());

        let mut req = sample_request();
        req.ends_at = req.starts_at;
        assert!(req.validate().is_err());

        let mut req = sample_request();
        req.title = "   ".to_string();
        assert!(req.validate().is_err());

        let mut req = sample_request();
        req.capacity = Some(0);
        assert!(req.validate().is_err());

        let mut req = sample_request();
        req.currency = "usd".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_online_events_need_url() {
        let mut req = sample_request();
        req.is_online = true;
        req.venue = None;
        assert!(req.validate().is_err());

        req.online_url = Some("https://meet.campus.edu/room".to_string());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_normalized_tags() {
        assert_eq!(sample_request().normalized_tags(), vec!["rust", "ai"]);
    }

    #[test]
    fn test_update_cannot_reprice_sold_event() {
        let event = sample_event();
        let update = UpdateEventRequest {
            price_cents: Some(1000),
            ..Default::default()
        };
        assert!(matches!(update.validate_against(&event, 40), Err(CampusEventsError::Conflict(_))));
        assert!(update.validate_against(&event, 0).is_ok());
    }

    #[test]
    fn test_update_schedule_checked_against_current() {
        let event = sample_event();
        let update = UpdateEventRequest {
            ends_at: Some(event.starts_at - Duration::hours(1)),
            ..Default::default()
        };
        assert!(update.validate_against(&event, 0).is_err());
    }

    #[test]
    fn test_search_pattern_escapes_wildcards() {
        let query = EventQuery {
            q: Some(" 100%_fun ".to_string()),
            ..Default::default()
        };
        assert_eq!(query.search_pattern().unwrap(), "%100\\%\\_fun%");
        assert!(EventQuery::default().search_pattern().is_none());
    }
}
