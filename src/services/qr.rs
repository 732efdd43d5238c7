//! QR ticket payloads
//!
//! A QR code encodes a verify URL whose `t` parameter is a compact HS256 token
//! naming the ticket, its event and its entry code. Door staff scan it and the
//! payload is validated before the entry code is checked in.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use crate::config::settings::TicketingConfig;
use crate::models::{Event, QrPayloadResponse, Ticket};
use crate::utils::errors::{CampusEventsError, Result};

/// Claims signed into a ticket QR payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrClaims {
    /// Ticket id
    pub tid: i64,
    /// Event id
    pub eid: i64,
    pub code: String,
    pub exp: i64,
}

#[derive(Clone)]
pub struct QrService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    verify_base_url: String,
    grace: Duration,
}

impl std::fmt::Debug for QrService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QrService")
            .field("verify_base_url", &self.verify_base_url)
            .field("grace", &self.grace)
            .finish()
    }
}

impl QrService {
    pub fn new(config: &TicketingConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.qr_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.qr_secret.as_bytes()),
            verify_base_url: config.verify_base_url.clone(),
            grace: Duration::minutes(config.check_in_grace_minutes),
        }
    }

    /// Payloads stop verifying once check-in has closed for the event
    pub fn expires_at(&self, event: &Event) -> DateTime<Utc> {
        event.ends_at + self.grace
    }

    /// Sign a ticket into a QR payload
    pub fn sign(&self, ticket: &Ticket, event: &Event) -> Result<QrPayloadResponse> {
        let expires_at = self.expires_at(event);
        let claims = QrClaims {
            tid: ticket.id,
            eid: ticket.event_id,
            code: ticket.entry_code.clone(),
            exp: expires_at.timestamp(),
        };
        let payload = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(QrPayloadResponse {
            ticket_id: ticket.id,
            verify_url: self.verify_url(&payload),
            payload,
            expires_at: Utc.timestamp_opt(claims.exp, 0).single().unwrap_or(expires_at),
        })
    }

    /// Decode and validate a scanned payload
    pub fn verify(&self, payload: &str) -> Result<QrClaims> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<QrClaims>(payload.trim(), &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!(error = %e, "QR payload rejected");
            CampusEventsError::InvalidInput("QR payload is invalid or expired".to_string())
        })?;
        Ok(data.claims)
    }

    /// URL the QR image encodes
    pub fn verify_url(&self, payload: &str) -> String {
        let separator = if self.verify_base_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}t={}",
            self.verify_base_url,
            separator,
            urlencoding::encode(payload)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::tests::sample_event;

    fn config() -> TicketingConfig {
        TicketingConfig {
            qr_secret: "qr-signing-secret-that-is-long-enough-123".to_string(),
            verify_base_url: "https://events.campus.edu/verify".to_string(),
            ..TicketingConfig::default()
        }
    }

    fn ticket(event: &Event) -> Ticket {
        Ticket {
            id: 42,
            order_id: 7,
            event_id: event.id,
            user_id: 5,
            entry_code: "ABCDEFGH23".to_string(),
            holder_name: "Sam".to_string(),
            status: "valid".to_string(),
            checked_in_at: None,
            checked_in_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let qr = QrService::new(&config());
        let event = sample_event();
        let signed = qr.sign(&ticket(&event), &event).unwrap();

        assert!(signed.verify_url.starts_with("https://events.campus.edu/verify?t="));
        assert_eq!(signed.expires_at.timestamp(), qr.expires_at(&event).timestamp());

        let claims = qr.verify(&signed.payload).unwrap();
        assert_eq!(claims.tid, 42);
        assert_eq!(claims.eid, event.id);
        assert_eq!(claims.code, "ABCDEFGH23");
    }

    #[test]
    fn test_rejects_tampered_and_expired_payloads() {
        let qr = QrService::new(&config());
        let mut event = sample_event();
        let signed = qr.sign(&ticket(&event), &event).unwrap();

        let mut tampered = signed.payload.clone();
        tampered.push('x');
        assert!(qr.verify(&tampered).is_err());

        let other = QrService::new(&TicketingConfig {
            qr_secret: "another-secret-another-secret-another-1".to_string(),
            ..config()
        });
        assert!(other.verify(&signed.payload).is_err());

        event.starts_at = Utc::now() - Duration::days(3);
        event.ends_at = Utc::now() - Duration::days(2);
        let stale = qr.sign(&ticket(&event), &event).unwrap();
        assert!(qr.verify(&stale.payload).is_err());
    }

    #[test]
    fn test_verify_url_keeps_existing_query() {
        let qr = QrService::new(&TicketingConfig {
            verify_base_url: "https://campus.edu/verify?lang=en".to_string(),
            ..config()
        });
        assert_eq!(qr.verify_url("a.b+c"), "https://campus.edu/verify?lang=en&t=a.b%2Bc");
    }
}
