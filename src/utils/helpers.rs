//! Helper functions and utilities
//!
//! This module contains common helper functions used throughout the application.

use chrono::{DateTime, Utc};
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use crate::utils::errors::{CampusEventsError, Result};

/// Characters used for entry codes and serials. Excludes 0/O, 1/I/L.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Generate a random entry code of the given length
pub fn generate_entry_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Check that a code only uses the entry code alphabet and has the expected length
pub fn is_valid_entry_code(code: &str, length: usize) -> bool {
    code.len() == length && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

/// Uppercase and strip separators a scanner or a human may have added
pub fn normalize_entry_code(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// Generate a certificate serial such as `CERT-2026-7KQ2M9XA`
pub fn generate_serial(issued_at: DateTime<Utc>) -> String {
    format!("CERT-{}-{}", issued_at.format("%Y"), generate_entry_code(8))
}

/// Generate a new UUID v4
pub fn generate_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Format a timestamp for display
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Format an amount in minor units, e.g. `1250` + `EUR` -> `12.50 EUR`
pub fn format_price(amount_cents: i64, currency: &str) -> String {
    if amount_cents == 0 {
        return "Free".to_string();
    }
    let sign = if amount_cents < 0 { "-" } else { "" };
    let abs = amount_cents.unsigned_abs();
    format!("{}{}.{:02} {}", sign, abs / 100, abs % 100, currency)
}

/// Truncate text to a maximum number of characters with ellipsis
pub fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_length.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Lowercase, ASCII-only slug with single dashes
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_dash = true;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Quote a CSV field when it contains separators, quotes or newlines
pub fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Join fields into one CSV line terminated by `\n`
pub fn csv_line(fields: &[&str]) -> String {
    let mut line = fields.iter().map(|f| csv_escape(f)).collect::<Vec<_>>().join(",");
    line.push('\n');
    line
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("static email regex")
    })
}

/// Validate email format
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// Parse and require an http(s) URL
pub fn validate_http_url(raw: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(raw)?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(CampusEventsError::InvalidInput(format!("Unsupported URL scheme: {}", other))),
    }
}

/// Page/per-page query parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default = "Pagination::default_page")]
    pub page: i64,
    #[serde(default = "Pagination::default_per_page")]
    pub per_page: i64,
}

impl Pagination {
    pub const MAX_PER_PAGE: i64 = 100;
    pub const MAX_PAGE: i64 = 100_000;

    fn default_page() -> i64 {
        1
    }

    fn default_per_page() -> i64 {
        20
    }

    /// Clamp into valid bounds
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.clamp(1, Self::MAX_PAGE),
            per_page: self.per_page.clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn limit(&self) -> i64 {
        self.normalized().per_page
    }

    pub fn offset(&self) -> i64 {
        let p = self.normalized();
        (p.page - 1).saturating_mul(p.per_page)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: Self::default_page(),
            per_page: Self::default_per_page(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn test_entry_code_uses_alphabet() {
        let code = generate_entry_code(10);
        assert_eq!(code.len(), 10);
        assert!(is_valid_entry_code(&code, 10));
        assert!(!code.contains('O'));
        assert!(!code.contains('0'));
    }

    #[test]
    fn test_entry_code_rejects_ambiguous_characters() {
        assert!(!is_valid_entry_code("ABCDEFGH0J", 10));
        assert!(!is_valid_entry_code("ABCDEFGHIJ", 10));
        assert!(!is_valid_entry_code("ABC", 10));
    }

    #[test]
    fn test_normalize_entry_code() {
        assert_eq!(normalize_entry_code(" abcd-efgh 23 "), "ABCDEFGH23");
    }

    #[test]
    fn test_serial_format() {
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap();
        let serial = generate_serial(at);
        assert!(serial.starts_with("CERT-2026-"));
        assert_eq!(serial.len(), "CERT-2026-".len() + 8);
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0, "EUR"), "Free");
        assert_eq!(format_price(1250, "EUR"), "12.50 EUR");
        assert_eq!(format_price(5, "USD"), "0.05 USD");
        assert_eq!(format_price(-300, "USD"), "-3.00 USD");
    }

    #[test]
    fn test_truncate_text_is_char_aware() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("ééééééééééé", 6), "ééé...");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Spring Hackathon 2026!"), "spring-hackathon-2026");
        assert_eq!(slugify("  --Rust  & Coffee-- "), "rust-coffee");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("Doe, Jane"), "\"Doe, Jane\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_line(&["a", "b,c"]), "a,\"b,c\"\n");
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("ada@campus.edu"));
        assert!(is_valid_email("first.last+events@cs.uni.ac.uk"));
        assert!(!is_valid_email("ada@campus"));
        assert!(!is_valid_email("not an email"));
    }

    #[test]
    fn test_validate_http_url() {
        assert!(validate_http_url("https://cdn.campus.edu/p/1.jpg").is_ok());
        assert!(validate_http_url("ftp://cdn.campus.edu/p/1.jpg").is_err());
        assert!(validate_http_url("nope").is_err());
    }

    #[test]
    fn test_pagination_clamps() {
        let p = Pagination { page: 0, per_page: 1000 };
        assert_eq!(p.limit(), 100);
        assert_eq!(p.offset(), 0);

        let p = Pagination { page: 3, per_page: 20 };
        assert_eq!(p.offset(), 40);
    }

    #[test]
    fn test_pagination_huge_page_stays_in_range() {
        let p = Pagination { page: i64::MAX, per_page: 100 };
        assert_eq!(p.normalized().page, Pagination::MAX_PAGE);
        assert_eq!(p.offset(), (Pagination::MAX_PAGE - 1) * 100);
        assert!(p.offset() >= 0);

        let p = Pagination { page: i64::MIN, per_page: i64::MIN };
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 1);
    }

    proptest! {
        #[test]
        fn prop_generated_codes_are_valid(len in 6usize..=32) {
            let code = generate_entry_code(len);
            prop_assert!(is_valid_entry_code(&code, len));
            prop_assert_eq!(normalize_entry_code(&code), code);
        }

        #[test]
        fn prop_slug_has_no_edge_or_double_dashes(text in ".{0,64}") {
            let slug = slugify(&text);
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        }
    }
}
