//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{CampusEventsError, Result};
use super::Settings;

/// Minimum length of signing secrets in bytes
const MIN_SECRET_LENGTH: usize = 32;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_server_config(&settings.server)?;
    validate_database_config(&settings.database)?;
    validate_auth_config(&settings.auth)?;
    validate_ticketing_config(&settings.ticketing)?;
    validate_rate_limit_config(&settings.rate_limit)?;
    validate_logging_config(&settings.logging)?;

    if settings.features.redis_cache {
        validate_redis_config(&settings.redis)?;
    }

    Ok(())
}

/// Validate server configuration
fn validate_server_config(config: &super::ServerConfig) -> Result<()> {
    if config.host.is_empty() {
        return Err(CampusEventsError::Config(
            "Server host is required".to_string()
        ));
    }

    if config.port == 0 {
        return Err(CampusEventsError::Config(
            "Server port must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(CampusEventsError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(CampusEventsError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(CampusEventsError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate Redis configuration
fn validate_redis_config(config: &super::RedisConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(CampusEventsError::Config(
            "Redis URL is required when the cache is enabled".to_string()
        ));
    }

    if config.ttl_seconds == 0 {
        return Err(CampusEventsError::Config(
            "Redis TTL must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate token settings
fn validate_auth_config(config: &super::AuthConfig) -> Result<()> {
    if config.jwt_secret.len() < MIN_SECRET_LENGTH {
        return Err(CampusEventsError::Config(
            format!("JWT secret must be at least {} bytes", MIN_SECRET_LENGTH)
        ));
    }

    if config.jwt_issuer.is_empty() {
        return Err(CampusEventsError::Config(
            "JWT issuer is required".to_string()
        ));
    }

    if config.token_ttl_seconds <= 0 {
        return Err(CampusEventsError::Config(
            "Token TTL must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate ticketing configuration
fn validate_ticketing_config(config: &super::TicketingConfig) -> Result<()> {
    if !(6..=32).contains(&config.entry_code_length) {
        return Err(CampusEventsError::Config(
            format!("Entry code length must be between 6 and 32, got {}", config.entry_code_length)
        ));
    }

    if config.max_tickets_per_order <= 0 {
        return Err(CampusEventsError::Config(
            "Max tickets per order must be greater than 0".to_string()
        ));
    }

    if config.check_in_opens_minutes < 0 || config.check_in_grace_minutes < 0 {
        return Err(CampusEventsError::Config(
            "Check-in window offsets cannot be negative".to_string()
        ));
    }

    if config.qr_secret.len() < MIN_SECRET_LENGTH {
        return Err(CampusEventsError::Config(
            format!("QR secret must be at least {} bytes", MIN_SECRET_LENGTH)
        ));
    }

    url::Url::parse(&config.verify_base_url).map_err(|e| {
        CampusEventsError::Config(format!("Invalid verify base URL: {}", e))
    })?;

    Ok(())
}

/// Validate rate limit configuration
fn validate_rate_limit_config(config: &super::RateLimitSettings) -> Result<()> {
    if config.requests_per_minute == 0 || config.scan_requests_per_minute == 0 {
        return Err(CampusEventsError::Config(
            "Rate limits must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(CampusEventsError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(CampusEventsError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.auth.jwt_secret = "a".repeat(32);
        settings.ticketing.qr_secret = "b".repeat(32);
        settings
    }

    #[test]
    fn test_valid_settings_pass() {
        assert!(validate_settings(&valid_settings()).is_ok());
    }

    #[test]
    fn test_default_settings_need_secrets() {
        let err = validate_settings(&Settings::default()).unwrap_err();
        assert!(err.to_string().contains("JWT secret"));
    }

    #[test]
    fn test_database_connection_bounds() {
        let mut settings = valid_settings();
        settings.database.min_connections = 20;
        assert!(validate_settings(&settings).is_err());

        settings.database.min_connections = 1;
        settings.database.max_connections = 0;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_entry_code_length_bounds() {
        let mut settings = valid_settings();
        settings.ticketing.entry_code_length = 4;
        assert!(validate_settings(&settings).is_err());

        settings.ticketing.entry_code_length = 33;
        assert!(validate_settings(&settings).is_err());

        settings.ticketing.entry_code_length = 6;
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut settings = valid_settings();
        settings.logging.level = "verbose".to_string();
        let err = validate_settings(&settings).unwrap_err();
        assert!(err.to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_redis_only_checked_when_enabled() {
        let mut settings = valid_settings();
        settings.redis.url = String::new();
        assert!(validate_settings(&settings).is_ok());

        settings.features.redis_cache = true;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_verify_base_url_must_parse() {
        let mut settings = valid_settings();
        settings.ticketing.verify_base_url = "not a url".to_string();
        assert!(validate_settings(&settings).is_err());
    }
}
