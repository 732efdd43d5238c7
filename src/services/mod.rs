//! Services module
//!
//! This module contains business logic services

pub mod auth;
pub mod cache;
pub mod certificate;
pub mod export;
pub mod feedback;
pub mod qr;
pub mod report;
pub mod tasks;
pub mod ticketing;

// Re-export commonly used services
pub use auth::{AuthService, AuthContext, Claims, Permission};
pub use cache::CacheService;
pub use certificate::CertificateService;
pub use qr::{QrService, QrClaims};
pub use report::{EventReport, ReportService, TaskProgress};
pub use ticketing::{CheckInWindow, TicketingService};

use serde::Serialize;
use crate::config::settings::Settings;
use crate::database::DatabaseService;
use crate::utils::errors::Result;

/// Service factory for creating and managing all services
#[derive(Clone, Debug)]
pub struct ServiceFactory {
    pub auth_service: AuthService,
    pub qr_service: QrService,
    pub ticketing_service: TicketingService,
    pub certificate_service: CertificateService,
    pub report_service: ReportService,
    pub cache_service: CacheService,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(settings: &Settings, db: DatabaseService) -> Result<Self> {
        let auth_service = AuthService::new(settings.auth.clone());
        let qr_service = QrService::new(&settings.ticketing);
        let ticketing_service = TicketingService::new(db.clone(), qr_service.clone(), settings.ticketing.clone());
        let certificate_service = CertificateService::new(db.clone());
        let report_service = ReportService::new(db);
        let cache_service = CacheService::new(settings)?;

        Ok(Self {
            auth_service,
            qr_service,
            ticketing_service,
            certificate_service,
            report_service,
            cache_service,
        })
    }

    /// Health check for all services
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let cache_enabled = self.cache_service.is_enabled();
        let cache_healthy = match self.cache_service.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                tracing::warn!(error = %e, "Cache health check failed");
                false
            }
        };

        ServiceHealthStatus { cache_enabled, cache_healthy }
    }
}

/// Health status for optional services
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealthStatus {
    pub cache_enabled: bool,
    pub cache_healthy: bool,
}

impl ServiceHealthStatus {
    /// The cache only matters when it is enabled
    pub fn is_healthy(&self) -> bool {
        !self.cache_enabled || self.cache_healthy
    }

    /// Get list of unhealthy services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.cache_enabled && !self.cache_healthy {
            issues.push("Redis connection failed".to_string());
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status() {
        let status = ServiceHealthStatus { cache_enabled: false, cache_healthy: false };
        assert!(status.is_healthy());
        assert!(status.get_issues().is_empty());

        let status = ServiceHealthStatus { cache_enabled: true, cache_healthy: false };
        assert!(!status.is_healthy());
        assert_eq!(status.get_issues(), vec!["Redis connection failed".to_string()]);
    }
}
