//! Admin repository implementation

use sqlx::PgPool;
use crate::utils::errors::CampusEventsError;

#[derive(Clone)]
#[derive(Debug)]
pub struct AdminRepository {
    pool: PgPool,
}

impl AdminRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get statistics
    pub async fn get_stats(&self) -> Result<serde_json::Value, CampusEventsError> {
        let users: Vec<(String, i64)> = sqlx::query_as("SELECT role, COUNT(*) FROM users GROUP BY role")
            .fetch_all(&self.pool)
            .await?;

        let events: Vec<(String, i64)> = sqlx::query_as("SELECT status, COUNT(*) FROM events GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let upcoming_events: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM events WHERE status = 'published' AND starts_at > NOW()"
        )
        .fetch_one(&self.pool)
        .await?;

        let tickets: Vec<(String, i64)> = sqlx::query_as("SELECT status, COUNT(*) FROM tickets GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let revenue: (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(total_cents), 0)::BIGINT FROM orders WHERE status = 'confirmed'"
        )
        .fetch_one(&self.pool)
        .await?;

        let certificates: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM certificates")
            .fetch_one(&self.pool)
            .await?;

        let open_issues: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM issues WHERE status IN ('open', 'in_progress')"
        )
        .fetch_one(&self.pool)
        .await?;

        let stats = serde_json::json!({
            "users": {
                "total": users.iter().map(|(_, n)| n).sum::<i64>(),
                "by_role": group_counts(users)
            },
            "events": {
                "total": events.iter().map(|(_, n)| n).sum::<i64>(),
                "upcoming": upcoming_events.0,
                "by_status": group_counts(events)
            },
            "tickets": {
                "total": tickets.iter().map(|(_, n)| n).sum::<i64>(),
                "by_status": group_counts(tickets)
            },
            "revenue_cents": revenue.0,
            "certificates": {
                "total": certificates.0
            },
            "issues": {
                "open": open_issues.0
            }
        });

        Ok(stats)
    }
}

fn group_counts(rows: Vec<(String, i64)>) -> serde_json::Map<String, serde_json::Value> {
    rows.into_iter()
        .map(|(key, count)| (key, serde_json::Value::from(count)))
        .collect()
}
