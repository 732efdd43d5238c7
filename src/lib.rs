//! CampusEvents
//!
//! A JSON-over-HTTP backend for campus event management: event discovery,
//! ticketing with QR check-in, stakeholders, certificates, galleries,
//! issues, feedback, task checklists and reports.

#![allow(non_snake_case)]

pub mod config;
pub mod handlers;
pub mod services;
pub mod models;
pub mod database;
pub mod utils;
pub mod middleware;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use axum::Router;
use tracing::info;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{CampusEventsError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use services::ServiceFactory;
use middleware::{RateLimitConfig, RateLimiters};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub db: DatabaseService,
    pub services: ServiceFactory,
    pub rate_limiters: Arc<RateLimiters>,
}

impl AppState {
    pub fn new(settings: Settings, db: DatabaseService) -> Result<Self> {
        let services = ServiceFactory::new(&settings, db.clone())?;
        let rate_limiters = Arc::new(RateLimiters::new(RateLimitConfig::from_settings(&settings.rate_limit)));

        Ok(Self {
            settings: Arc::new(settings),
            db,
            services,
            rate_limiters,
        })
    }
}

/// Build the application router
pub fn build_app(state: AppState) -> Router {
    handlers::router(state)
}

/// Serve the API until Ctrl+C or SIGTERM
pub async fn serve(state: AppState) -> Result<()> {
    let address = state.settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(address = %address, "{} listening", info());

    let limiters = state.rate_limiters.clone();
    let cleanup = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            limiters.cleanup();
        }
    });

    let app = build_app(state);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cleanup.abort();
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
