//! Error handling for CampusEvents
//!
//! This module defines the main error type used throughout the application
//! and how it is turned into an HTTP response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Main error type for CampusEvents application
#[derive(Error, Debug)]
pub enum CampusEventsError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: i64 },

    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: i64 },

    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: i64 },

    #[error("Ticket not found: {ticket_id}")]
    TicketNotFound { ticket_id: i64 },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Not enough tickets left for event {event_id}: requested {requested}, remaining {remaining}")]
    SoldOut { event_id: i64, requested: i32, remaining: i32 },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Result type alias for CampusEvents operations
pub type Result<T> = std::result::Result<T, CampusEventsError>;

impl CampusEventsError {
    /// Shorthand for a generic missing record
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CampusEventsError::NotFound { entity, id: id.to_string() }
    }

    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            CampusEventsError::Database(_) => false,
            CampusEventsError::Migration(_) => false,
            CampusEventsError::Config(_) => false,
            CampusEventsError::PermissionDenied(_) => false,
            CampusEventsError::Authentication(_) => false,
            CampusEventsError::Token(_) => false,
            CampusEventsError::UserNotFound { .. } => false,
            CampusEventsError::EventNotFound { .. } => false,
            CampusEventsError::OrderNotFound { .. } => false,
            CampusEventsError::TicketNotFound { .. } => false,
            CampusEventsError::NotFound { .. } => false,
            CampusEventsError::InvalidStateTransition { .. } => false,
            CampusEventsError::SoldOut { .. } => false,
            CampusEventsError::Conflict(_) => false,
            CampusEventsError::Redis(_) => true,
            CampusEventsError::Serialization(_) => false,
            CampusEventsError::Io(_) => true,
            CampusEventsError::UrlParse(_) => false,
            CampusEventsError::RateLimitExceeded => true,
            CampusEventsError::InvalidInput(_) => false,
            CampusEventsError::ServiceUnavailable(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CampusEventsError::Database(_) => ErrorSeverity::Critical,
            CampusEventsError::Migration(_) => ErrorSeverity::Critical,
            CampusEventsError::Config(_) => ErrorSeverity::Critical,
            CampusEventsError::PermissionDenied(_) => ErrorSeverity::Warning,
            CampusEventsError::Authentication(_) => ErrorSeverity::Warning,
            CampusEventsError::Token(_) => ErrorSeverity::Warning,
            CampusEventsError::RateLimitExceeded => ErrorSeverity::Warning,
            CampusEventsError::InvalidInput(_) => ErrorSeverity::Info,
            CampusEventsError::UserNotFound { .. }
            | CampusEventsError::EventNotFound { .. }
            | CampusEventsError::OrderNotFound { .. }
            | CampusEventsError::TicketNotFound { .. }
            | CampusEventsError::NotFound { .. }
            | CampusEventsError::InvalidStateTransition { .. }
            | CampusEventsError::SoldOut { .. }
            | CampusEventsError::Conflict(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// HTTP status returned to the client
    pub fn status_code(&self) -> StatusCode {
        match self {
            CampusEventsError::UserNotFound { .. }
            | CampusEventsError::EventNotFound { .. }
            | CampusEventsError::OrderNotFound { .. }
            | CampusEventsError::TicketNotFound { .. }
            | CampusEventsError::NotFound { .. } => StatusCode::NOT_FOUND,
            CampusEventsError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            CampusEventsError::Authentication(_) | CampusEventsError::Token(_) => StatusCode::UNAUTHORIZED,
            CampusEventsError::InvalidInput(_)
            | CampusEventsError::UrlParse(_)
            | CampusEventsError::Serialization(_) => StatusCode::BAD_REQUEST,
            CampusEventsError::InvalidStateTransition { .. }
            | CampusEventsError::SoldOut { .. }
            | CampusEventsError::Conflict(_) => StatusCode::CONFLICT,
            CampusEventsError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            CampusEventsError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine readable error code
    pub fn code(&self) -> &'static str {
        match self {
            CampusEventsError::Database(_) | CampusEventsError::Migration(_) => "database_error",
            CampusEventsError::Config(_) => "config_error",
            CampusEventsError::PermissionDenied(_) => "permission_denied",
            CampusEventsError::Authentication(_) | CampusEventsError::Token(_) => "unauthenticated",
            CampusEventsError::UserNotFound { .. }
            | CampusEventsError::EventNotFound { .. }
            | CampusEventsError::OrderNotFound { .. }
            | CampusEventsError::TicketNotFound { .. }
            | CampusEventsError::NotFound { .. } => "not_found",
            CampusEventsError::InvalidStateTransition { .. } => "invalid_state_transition",
            CampusEventsError::SoldOut { .. } => "sold_out",
            CampusEventsError::Conflict(_) => "conflict",
            CampusEventsError::RateLimitExceeded => "rate_limited",
            CampusEventsError::InvalidInput(_)
            | CampusEventsError::UrlParse(_)
            | CampusEventsError::Serialization(_) => "invalid_input",
            CampusEventsError::ServiceUnavailable(_) => "service_unavailable",
            CampusEventsError::Redis(_) | CampusEventsError::Io(_) => "internal_error",
        }
    }
}

impl IntoResponse for CampusEventsError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, severity = %self.severity(), "Request failed");
            match self {
                CampusEventsError::ServiceUnavailable(ref reason) => format!("Service unavailable: {}", reason),
                _ => "Internal server error".to_string(),
            }
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
            self.to_string()
        };

        let body = serde_json::json!({
            "error": message,
            "code": self.code(),
        });

        (status, Json(body)).into_response()
    }
}

impl From<axum::extract::rejection::JsonRejection> for CampusEventsError {
    fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
        CampusEventsError::InvalidInput(rejection.body_text())
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_not_found_variants_map_to_404() {
        assert_eq!(CampusEventsError::EventNotFound { event_id: 1 }.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(CampusEventsError::not_found("Gallery", 7).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(CampusEventsError::not_found("Gallery", 7).to_string(), "Gallery not found: 7");
    }

    #[test]
    fn test_conflict_family_maps_to_409() {
        let sold_out = CampusEventsError::SoldOut { event_id: 3, requested: 2, remaining: 1 };
        assert_eq!(sold_out.status_code(), StatusCode::CONFLICT);
        assert_eq!(sold_out.code(), "sold_out");

        let transition = CampusEventsError::InvalidStateTransition {
            from: "cancelled".to_string(),
            to: "published".to_string(),
        };
        assert_eq!(transition.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_auth_errors() {
        assert_eq!(CampusEventsError::Authentication("missing".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(CampusEventsError::PermissionDenied("nope".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(CampusEventsError::PermissionDenied("nope".into()).severity(), ErrorSeverity::Warning);
    }

    #[test]
    fn test_recoverability() {
        assert!(CampusEventsError::RateLimitExceeded.is_recoverable());
        assert!(CampusEventsError::ServiceUnavailable("redis".into()).is_recoverable());
        assert!(!CampusEventsError::InvalidInput("bad".into()).is_recoverable());
        assert_eq!(CampusEventsError::Config("x".into()).severity(), ErrorSeverity::Critical);
    }

    #[tokio::test]
    async fn test_internal_errors_are_not_leaked() {
        let err = CampusEventsError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
        assert_eq!(json["code"], "internal_error");
    }

    #[tokio::test]
    async fn test_client_errors_keep_message() {
        let response = CampusEventsError::InvalidInput("title is required".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Invalid input: title is required");
        assert_eq!(json["code"], "invalid_input");
    }
}
