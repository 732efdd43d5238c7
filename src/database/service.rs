//! Database service layer
//!
//! This module provides a high-level interface to database operations

use crate::database::{
    DatabasePool, UserRepository, EventRepository, TicketRepository, StakeholderRepository, CertificateRepository,
    GalleryRepository, IssueRepository, FeedbackRepository, TaskRepository, AdminRepository,
};
use crate::models::*;
use crate::utils::errors::CampusEventsError;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub users: UserRepository,
    pub events: EventRepository,
    pub tickets: TicketRepository,
    pub stakeholders: StakeholderRepository,
    pub certificates: CertificateRepository,
    pub galleries: GalleryRepository,
    pub issues: IssueRepository,
    pub feedback: FeedbackRepository,
    pub tasks: TaskRepository,
    pub admin: AdminRepository,
    pool: DatabasePool,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            tickets: TicketRepository::new(pool.clone()),
            stakeholders: StakeholderRepository::new(pool.clone()),
            certificates: CertificateRepository::new(pool.clone()),
            galleries: GalleryRepository::new(pool.clone()),
            issues: IssueRepository::new(pool.clone()),
            feedback: FeedbackRepository::new(pool.clone()),
            tasks: TaskRepository::new(pool.clone()),
            admin: AdminRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Load an event or fail with `EventNotFound`
    pub async fn require_event(&self, event_id: i64) -> Result<Event, CampusEventsError> {
        self.events.get(event_id).await
    }

    /// Load a user or fail with `UserNotFound`
    pub async fn require_user(&self, user_id: i64) -> Result<User, CampusEventsError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(CampusEventsError::UserNotFound { user_id })
    }

    /// Load a stakeholder or fail with `NotFound`
    pub async fn require_stakeholder(&self, id: i64) -> Result<Stakeholder, CampusEventsError> {
        self.stakeholders
            .find_by_id(id)
            .await?
            .ok_or_else(|| CampusEventsError::not_found("Stakeholder", id))
    }

    /// Load a certificate template or fail with `NotFound`
    pub async fn require_template(&self, id: i64) -> Result<CertificateTemplate, CampusEventsError> {
        self.certificates
            .find_template(id)
            .await?
            .ok_or_else(|| CampusEventsError::not_found("Certificate template", id))
    }

    /// Load a gallery or fail with `NotFound`
    pub async fn require_gallery(&self, id: i64) -> Result<PhotoGallery, CampusEventsError> {
        self.galleries
            .find_by_id(id)
            .await?
            .ok_or_else(|| CampusEventsError::not_found("Gallery", id))
    }

    /// Load an issue or fail with `NotFound`
    pub async fn require_issue(&self, id: i64) -> Result<Issue, CampusEventsError> {
        self.issues
            .find_by_id(id)
            .await?
            .ok_or_else(|| CampusEventsError::not_found("Issue", id))
    }

    /// Load a feedback form or fail with `NotFound`
    pub async fn require_form(&self, id: i64) -> Result<FeedbackForm, CampusEventsError> {
        self.feedback
            .find_form(id)
            .await?
            .ok_or_else(|| CampusEventsError::not_found("Feedback form", id))
    }

    /// Load a task or fail with `NotFound`
    pub async fn require_task(&self, id: i64) -> Result<EventTask, CampusEventsError> {
        self.tasks
            .find_by_id(id)
            .await?
            .ok_or_else(|| CampusEventsError::not_found("Task", id))
    }

    /// Load an order or fail with `OrderNotFound`
    pub async fn require_order(&self, order_id: i64) -> Result<Order, CampusEventsError> {
        self.tickets
            .find_order(order_id)
            .await?
            .ok_or(CampusEventsError::OrderNotFound { order_id })
    }

    /// Load a ticket or fail with `TicketNotFound`
    pub async fn require_ticket(&self, ticket_id: i64) -> Result<Ticket, CampusEventsError> {
        self.tickets
            .find_by_id(ticket_id)
            .await?
            .ok_or(CampusEventsError::TicketNotFound { ticket_id })
    }

    /// Whether a user may respond to feedback for an event: a ticket holder or a stakeholder
    pub async fn is_event_participant(&self, event_id: i64, user: &User) -> Result<bool, CampusEventsError> {
        if self.tickets.has_active_ticket(event_id, user.id).await? {
            return Ok(true);
        }
        let roles = self.stakeholders.roles_for_user(event_id, user.id, &user.email).await?;
        Ok(!roles.is_empty())
    }

    /// Get user's dashboard data
    pub async fn get_user_dashboard(&self, user_id: i64) -> Result<serde_json::Value, CampusEventsError> {
        let user = self.require_user(user_id).await?;
        let tickets = self.tickets.get_user_tickets(user_id).await?;
        let organized_events = self.events.get_organizer_events(user_id).await?;
        let certificates = self.certificates.list_for_email(&user.email).await?;

        let dashboard = serde_json::json!({
            "user": user,
            "tickets": tickets,
            "organized_events": organized_events,
            "certificates": certificates
        });

        Ok(dashboard)
    }

    /// Get system statistics
    pub async fn get_system_stats(&self) -> Result<serde_json::Value, CampusEventsError> {
        self.admin.get_stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_service_creation() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgresql://localhost/campus_events_test")
            .unwrap();
        let service = DatabaseService::new(pool);
        assert_eq!(service.pool().size(), 0);
    }
}
