//! Logging middleware
//!
//! Every request runs inside an `http.request` span carrying a request id,
//! and is logged with its status and duration once the response is ready.

use std::time::{Duration, Instant};
use axum::body::Body;
use axum::http::{HeaderValue, Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, error, info, warn, Instrument};
use crate::utils::helpers::generate_uuid;

/// Requests slower than this are logged as warnings
pub const SLOW_REQUEST_THRESHOLD: Duration = Duration::from_millis(500);

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// How a finished request should be logged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestLogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Server errors and slow requests stand out; health probes stay quiet
pub fn request_log_level(path: &str, status: StatusCode, elapsed: Duration) -> RequestLogLevel {
    if status.is_server_error() {
        RequestLogLevel::Error
    } else if elapsed > SLOW_REQUEST_THRESHOLD {
        RequestLogLevel::Warn
    } else if path == "/health" {
        RequestLogLevel::Debug
    } else {
        RequestLogLevel::Info
    }
}

/// Log method, path, status and duration for each request
pub async fn request_logging_middleware(request: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(generate_uuid);

    let span = tracing::info_span!(
        "http.request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    let mut response = next.run(request).instrument(span.clone()).await;
    let elapsed = started.elapsed();
    let status = response.status();
    let duration_ms = elapsed.as_millis() as u64;

    let _entered = span.enter();
    match request_log_level(&path, status, elapsed) {
        RequestLogLevel::Error => error!(status = status.as_u16(), duration_ms, "Request failed"),
        RequestLogLevel::Warn => warn!(status = status.as_u16(), duration_ms, "Slow request"),
        RequestLogLevel::Info => info!(status = status.as_u16(), duration_ms, "Request completed"),
        RequestLogLevel::Debug => debug!(status = status.as_u16(), duration_ms, "Request completed"),
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_log_level() {
        let fast = Duration::from_millis(20);
        let slow = Duration::from_millis(750);

        assert_eq!(request_log_level("/api/events", StatusCode::OK, fast), RequestLogLevel::Info);
        assert_eq!(request_log_level("/api/events", StatusCode::OK, slow), RequestLogLevel::Warn);
        assert_eq!(request_log_level("/health", StatusCode::OK, fast), RequestLogLevel::Debug);
        assert_eq!(request_log_level("/health", StatusCode::SERVICE_UNAVAILABLE, fast), RequestLogLevel::Error);
        assert_eq!(request_log_level("/api/me", StatusCode::UNAUTHORIZED, fast), RequestLogLevel::Info);
    }
}
