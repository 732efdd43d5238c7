//! HTTP handlers module
//!
//! One module per resource. `router` wires every route together with the
//! middleware stack.

pub mod admin;
pub mod certificates;
pub mod events;
pub mod feedback;
pub mod galleries;
pub mod health;
pub mod issues;
pub mod me;
pub mod reports;
pub mod stakeholders;
pub mod tasks;
pub mod tickets;

use axum::extract::FromRequest;
use axum::http::{header, HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use crate::middleware::{rate_limit_middleware, request_logging_middleware};
use crate::models::{Event, User};
use crate::services::AuthService;
use crate::utils::errors::{CampusEventsError, Result};
use crate::AppState;

/// JSON body extractor whose rejections use the API error shape
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(CampusEventsError))]
pub struct ApiJson<T>(pub T);

/// Load an event the caller is allowed to manage
pub(crate) async fn managed_event(state: &AppState, user: &User, event_id: i64) -> Result<Event> {
    let event = state.db.require_event(event_id).await?;
    AuthService::require_event_manager(user, &event)?;
    Ok(event)
}

/// Fail with 503 when an optional feature is switched off
pub(crate) fn require_feature(enabled: bool, feature: &str) -> Result<()> {
    if enabled {
        Ok(())
    } else {
        Err(CampusEventsError::ServiceUnavailable(format!("{} are disabled", feature)))
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        // Current user
        .route("/me", get(me::get_me).put(me::update_me))
        .route("/me/dashboard", get(me::dashboard))
        .route("/me/tickets", get(me::my_tickets))
        .route("/me/orders", get(me::my_orders))
        .route("/me/certificates", get(me::my_certificates))
        // Events
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/:id",
            get(events::get_event).put(events::update_event).delete(events::delete_event),
        )
        .route("/events/:id/publish", post(events::publish_event))
        .route("/events/:id/cancel", post(events::cancel_event))
        .route("/events/:id/complete", post(events::complete_event))
        .route("/events/:id/related", get(events::related_events))
        // Orders, tickets and check-in
        .route("/events/:id/orders", get(tickets::list_orders).post(tickets::purchase))
        .route("/orders/:id/cancel", post(tickets::cancel_order))
        .route("/tickets/:id", get(tickets::get_ticket))
        .route("/tickets/:id/qr", get(tickets::ticket_qr))
        .route("/events/:id/scan", post(tickets::scan))
        .route("/events/:id/attendees", get(tickets::attendees))
        .route("/events/:id/attendees/export", get(tickets::export_attendees))
        // Stakeholders
        .route(
            "/events/:id/stakeholders",
            get(stakeholders::list_stakeholders).post(stakeholders::add_stakeholder),
        )
        .route("/events/:id/stakeholders/import", post(stakeholders::import_stakeholders))
        .route("/events/:id/stakeholders/sync-attendees", post(stakeholders::sync_attendees))
        .route("/events/:id/stakeholders/export", get(stakeholders::export_stakeholders))
        .route(
            "/stakeholders/:id",
            put(stakeholders::update_stakeholder).delete(stakeholders::remove_stakeholder),
        )
        // Certificates
        .route(
            "/events/:id/certificate-templates",
            get(certificates::list_templates).post(certificates::create_template),
        )
        .route(
            "/certificate-templates/:id",
            put(certificates::update_template).delete(certificates::delete_template),
        )
        .route("/certificate-templates/:id/generate", post(certificates::generate))
        .route("/events/:id/certificates", get(certificates::list_certificates))
        .route("/certificates/verify/:serial", get(certificates::verify))
        // Galleries
        .route(
            "/events/:id/galleries",
            get(galleries::list_galleries).post(galleries::create_gallery),
        )
        .route(
            "/galleries/:id",
            get(galleries::get_gallery).put(galleries::update_gallery).delete(galleries::delete_gallery),
        )
        .route("/galleries/:id/photos", post(galleries::add_photo))
        .route("/photos/:id", axum::routing::delete(galleries::remove_photo))
        // Issues
        .route("/events/:id/issues", get(issues::list_issues).post(issues::report_issue))
        .route("/issues/:id/status", put(issues::update_status))
        // Feedback
        .route(
            "/events/:id/feedback-forms",
            get(feedback::list_forms).post(feedback::create_form),
        )
        .route("/feedback-forms/:id/close", post(feedback::close_form))
        .route("/feedback-forms/:id/responses", post(feedback::submit_response))
        .route("/feedback-forms/:id/summary", get(feedback::form_summary))
        // Tasks
        .route("/events/:id/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/events/:id/tasks/generate", post(tasks::generate_checklist))
        .route("/tasks/:id", put(tasks::update_task).delete(tasks::delete_task))
        // Reports
        .route("/events/:id/report", get(reports::json_report))
        .route("/events/:id/report.md", get(reports::markdown_report))
        // Administration
        .route("/admin/stats", get(admin::stats))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/:id/role", put(admin::change_role));

    let cors = cors_layer(&state.settings.server.cors_origins);

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api)
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_feature() {
        assert!(require_feature(true, "Galleries").is_ok());
        let err = require_feature(false, "Galleries").unwrap_err();
        assert_eq!(err.to_string(), "Service unavailable: Galleries are disabled");
    }

    #[test]
    fn test_cors_layer_accepts_wildcard_and_lists() {
        let _ = cors_layer(&["*".to_string()]);
        let _ = cors_layer(&["http://localhost:3000".to_string(), "not a header\n".to_string()]);
    }
}
