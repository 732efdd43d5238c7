//! Issue repository implementation

use sqlx::PgPool;
use chrono::{DateTime, Utc};
use crate::models::issue::{Issue, IssueStatus, CreateIssueRequest};
use crate::utils::errors::CampusEventsError;

const ISSUE_COLUMNS: &str = "id, event_id, reported_by, title, description, severity, status, resolution_note, created_at, updated_at, resolved_at";

#[derive(Clone)]
#[derive(Debug)]
pub struct IssueRepository {
    pool: PgPool,
}

impl IssueRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Report an issue
    pub async fn create(&self, event_id: i64, reported_by: i64, request: CreateIssueRequest) -> Result<Issue, CampusEventsError> {
        let issue = sqlx::query_as::<_, Issue>(&format!(
            r#"
            INSERT INTO issues (event_id, reported_by, title, description, severity, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'open', $6, $6)
            RETURNING {ISSUE_COLUMNS}
            "#
        ))
        .bind(event_id)
        .bind(reported_by)
        .bind(request.title.trim())
        .bind(request.description)
        .bind(request.severity.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(issue)
    }

    /// Find issue by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Issue>, CampusEventsError> {
        let issue = sqlx::query_as::<_, Issue>(&format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(issue)
    }

    /// Move an issue to `to` if it is still in `from`.
    /// Entering a resolution status stamps `resolved_at`; reopening clears it.
    pub async fn update_status(
        &self,
        id: i64,
        from: IssueStatus,
        to: IssueStatus,
        resolution_note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Issue, CampusEventsError> {
        from.transition_to(to)?;

        let issue = sqlx::query_as::<_, Issue>(&format!(
            r#"
            UPDATE issues
            SET status = $3,
                resolution_note = COALESCE($4, resolution_note),
                resolved_at = CASE
                    WHEN $5 THEN COALESCE(resolved_at, $6)
                    ELSE NULL
                END,
                updated_at = $6
            WHERE id = $1 AND status = $2
            RETURNING {ISSUE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(resolution_note)
        .bind(to.is_resolution())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        match issue {
            Some(issue) => Ok(issue),
            None => {
                let current = self
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| CampusEventsError::not_found("Issue", id))?;
                Err(CampusEventsError::InvalidStateTransition {
                    from: current.status,
                    to: to.to_string(),
                })
            }
        }
    }

    /// Issues of an event, optionally filtered by status, most severe first
    pub async fn list_for_event(&self, event_id: i64, status: Option<IssueStatus>) -> Result<Vec<Issue>, CampusEventsError> {
        let issues = sqlx::query_as::<_, Issue>(&format!(
            r#"
            SELECT {ISSUE_COLUMNS} FROM issues
            WHERE event_id = $1 AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY CASE severity
                         WHEN 'critical' THEN 0
                         WHEN 'high' THEN 1
                         WHEN 'medium' THEN 2
                         ELSE 3
                     END,
                     created_at DESC
            "#
        ))
        .bind(event_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        Ok(issues)
    }

    /// Issue counts per status
    pub async fn count_by_status(&self, event_id: i64) -> Result<Vec<(String, i64)>, CampusEventsError> {
        let counts: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM issues WHERE event_id = $1 GROUP BY status ORDER BY status"
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }
}
