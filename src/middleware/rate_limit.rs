//! Rate limiting middleware
//!
//! Requests are limited per client IP with `governor` keyed limiters. Ticket
//! scanning gets its own, stricter limiter on top of the API-wide one.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::{debug, warn};
use crate::config::settings::RateLimitSettings;
use crate::utils::errors::{CampusEventsError, Result};
use crate::AppState;

/// Rate limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Sustained requests per minute for the whole API
    pub requests_per_minute: NonZeroU32,
    /// Requests allowed in a single burst
    pub burst: NonZeroU32,
    /// Sustained scan requests per minute
    pub scan_requests_per_minute: NonZeroU32,
}

impl RateLimitConfig {
    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self {
            requests_per_minute: NonZeroU32::new(settings.requests_per_minute).unwrap_or(NonZeroU32::MIN),
            burst: NonZeroU32::new(settings.burst).unwrap_or(NonZeroU32::MIN),
            scan_requests_per_minute: NonZeroU32::new(settings.scan_requests_per_minute).unwrap_or(NonZeroU32::MIN),
        }
    }

    fn api_quota(&self) -> Quota {
        Quota::per_minute(self.requests_per_minute).allow_burst(self.burst)
    }

    fn scan_quota(&self) -> Quota {
        Quota::per_minute(self.scan_requests_per_minute)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::from_settings(&RateLimitSettings::default())
    }
}

/// Keyed limiters shared by every request
pub struct RateLimiters {
    api: DefaultKeyedRateLimiter<IpAddr>,
    scan: DefaultKeyedRateLimiter<IpAddr>,
}

impl RateLimiters {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            api: RateLimiter::keyed(config.api_quota()),
            scan: RateLimiter::keyed(config.scan_quota()),
        }
    }

    /// Check a request from `ip`; scan requests also count against the scan limiter
    pub fn check(&self, ip: IpAddr, is_scan: bool) -> Result<()> {
        if self.api.check_key(&ip).is_err() {
            warn!(client_ip = %ip, "API rate limit exceeded");
            return Err(CampusEventsError::RateLimitExceeded);
        }
        if is_scan && self.scan.check_key(&ip).is_err() {
            warn!(client_ip = %ip, "Scan rate limit exceeded");
            return Err(CampusEventsError::RateLimitExceeded);
        }
        Ok(())
    }

    /// Drop state for clients that are back at full quota
    pub fn cleanup(&self) {
        self.api.retain_recent();
        self.scan.retain_recent();
        debug!(tracked_clients = self.api.len(), "Cleaned up rate limit entries");
    }
}

/// Client address from the first `x-forwarded-for` hop, else the peer address
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> IpAddr {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok())
        .or_else(|| peer.map(|addr| addr.ip()))
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn is_scan_path(path: &str) -> bool {
    path.starts_with("/api/events/") && path.ends_with("/scan")
}

/// Reject requests over quota with 429
pub async fn rate_limit_middleware(State(state): State<AppState>, request: Request<Body>, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(request.headers(), peer);

    match state.rate_limiters.check(ip, is_scan_path(request.uri().path())) {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn config(per_minute: u32, burst: u32, scan: u32) -> RateLimitConfig {
        RateLimitConfig::from_settings(&RateLimitSettings {
            requests_per_minute: per_minute,
            burst,
            scan_requests_per_minute: scan,
        })
    }

    #[test]
    fn test_burst_then_limited() {
        let limiters = RateLimiters::new(config(60, 3, 60));
        let ip: IpAddr = "10.0.0.1".parse().unwrap();

        assert!(limiters.check(ip, false).is_ok());
        assert!(limiters.check(ip, false).is_ok());
        assert!(limiters.check(ip, false).is_ok());
        assert!(matches!(limiters.check(ip, false), Err(CampusEventsError::RateLimitExceeded)));

        // Other clients have their own bucket
        assert!(limiters.check("10.0.0.2".parse().unwrap(), false).is_ok());
    }

    #[test]
    fn test_scan_limiter_is_stricter() {
        let limiters = RateLimiters::new(config(600, 100, 1));
        let ip: IpAddr = "10.0.0.3".parse().unwrap();

        assert!(limiters.check(ip, true).is_ok());
        assert!(limiters.check(ip, true).is_err());
        assert!(limiters.check(ip, false).is_ok());
    }

    #[test]
    fn test_zero_settings_fall_back_to_one() {
        let config = config(0, 0, 0);
        assert_eq!(config.requests_per_minute.get(), 1);
        assert_eq!(config.burst.get(), 1);
    }

    #[test]
    fn test_client_ip() {
        let peer: SocketAddr = "192.168.1.5:4000".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some(peer)), "192.168.1.5".parse::<IpAddr>().unwrap());
        assert_eq!(client_ip(&headers, None), IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_ip(&headers, Some(peer)), "203.0.113.7".parse::<IpAddr>().unwrap());

        headers.insert("x-forwarded-for", HeaderValue::from_static("garbage"));
        assert_eq!(client_ip(&headers, Some(peer)), "192.168.1.5".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_scan_path_detection() {
        assert!(is_scan_path("/api/events/4/scan"));
        assert!(!is_scan_path("/api/events/4/orders"));
        assert!(!is_scan_path("/health"));
    }
}
