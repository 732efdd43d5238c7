//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub ticketing: TicketingConfig,
    pub rate_limit: RateLimitSettings,
    pub logging: LoggingConfig,
    pub features: FeaturesConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    pub url: String,
    pub prefix: String,
    pub ttl_seconds: u64,
}

/// Bearer token verification
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub token_ttl_seconds: i64,
    pub admin_emails: Vec<String>,
}

/// Ticket issuance and door scanning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TicketingConfig {
    pub entry_code_length: usize,
    pub max_tickets_per_order: i32,
    pub check_in_opens_minutes: i64,
    pub check_in_grace_minutes: i64,
    pub qr_secret: String,
    pub verify_base_url: String,
}

/// Request rate limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitSettings {
    pub requests_per_minute: u32,
    pub burst: u32,
    pub scan_requests_per_minute: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
    pub json: bool,
}

/// Feature flags configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeaturesConfig {
    pub redis_cache: bool,
    pub certificates: bool,
    pub galleries: bool,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("CAMPUS_EVENTS")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("auth.admin_emails")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Parse settings from a TOML document, missing sections take defaults
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::CampusEventsError> {
        super::validation::validate_settings(self)
    }

    /// Socket address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Whether the given email belongs to a configured administrator
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.auth
            .admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            redis: RedisConfig::default(),
            auth: AuthConfig::default(),
            ticketing: TicketingConfig::default(),
            rate_limit: RateLimitSettings::default(),
            logging: LoggingConfig::default(),
            features: FeaturesConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/campus_events".to_string(),
            max_connections: 10,
            min_connections: 1,
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            prefix: "campus_events:".to_string(),
            ttl_seconds: 300,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_issuer: "campus-events".to_string(),
            token_ttl_seconds: 3600,
            admin_emails: vec![],
        }
    }
}

impl Default for TicketingConfig {
    fn default() -> Self {
        Self {
            entry_code_length: 10,
            max_tickets_per_order: 10,
            check_in_opens_minutes: 24 * 60,
            check_in_grace_minutes: 120,
            qr_secret: String::new(),
            verify_base_url: "http://localhost:3000/verify".to_string(),
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests_per_minute: 300,
            burst: 50,
            scan_requests_per_minute: 120,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: "logs".to_string(),
            json: false,
        }
    }
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            redis_cache: false,
            certificates: true,
            galleries: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000
            cors_origins = []

            [auth]
            jwt_secret = "0123456789abcdef0123456789abcdef"
            jwt_issuer = "campus"
            token_ttl_seconds = 60
            admin_emails = ["Dean@Campus.edu"]
            "#,
        )
        .unwrap();

        assert_eq!(settings.bind_address(), "127.0.0.1:9000");
        assert_eq!(settings.ticketing.entry_code_length, 10);
        assert_eq!(settings.database.max_connections, 10);
        assert!(settings.is_admin_email("dean@campus.edu"));
        assert!(!settings.is_admin_email("student@campus.edu"));
    }

    #[test]
    fn test_default_settings_disable_cache() {
        let settings = Settings::default();
        assert!(!settings.features.redis_cache);
        assert!(settings.redis.prefix.ends_with(':'));
    }
}
