//! Stakeholder repository implementation

use sqlx::PgPool;
use chrono::Utc;
use crate::models::stakeholder::{Stakeholder, StakeholderRole, CreateStakeholderRequest, UpdateStakeholderRequest};
use crate::utils::errors::CampusEventsError;

const STAKEHOLDER_COLUMNS: &str = "id, event_id, user_id, name, email, role, organization, created_at, updated_at";

#[derive(Clone)]
#[derive(Debug)]
pub struct StakeholderRepository {
    pool: PgPool,
}

impl StakeholderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Add a stakeholder; returns `None` when the same email already holds that role
    pub async fn create(&self, event_id: i64, request: CreateStakeholderRequest) -> Result<Option<Stakeholder>, CampusEventsError> {
        let request = request.normalized();
        let now = Utc::now();
        let stakeholder = sqlx::query_as::<_, Stakeholder>(&format!(
            r#"
            INSERT INTO stakeholders (event_id, user_id, name, email, role, organization, created_at, updated_at)
            VALUES ($1, COALESCE($2, (SELECT id FROM users WHERE email = $4)), $3, $4, $5, $6, $7, $7)
            ON CONFLICT (event_id, email, role) DO NOTHING
            RETURNING {STAKEHOLDER_COLUMNS}
            "#
        ))
        .bind(event_id)
        .bind(request.user_id)
        .bind(request.name)
        .bind(request.email)
        .bind(request.role.as_str())
        .bind(request.organization)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stakeholder)
    }

    /// Find stakeholder by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Stakeholder>, CampusEventsError> {
        let stakeholder = sqlx::query_as::<_, Stakeholder>(&format!(
            "SELECT {STAKEHOLDER_COLUMNS} FROM stakeholders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stakeholder)
    }

    /// Update stakeholder
    pub async fn update(&self, id: i64, request: UpdateStakeholderRequest) -> Result<Stakeholder, CampusEventsError> {
        let stakeholder = sqlx::query_as::<_, Stakeholder>(&format!(
            r#"
            UPDATE stakeholders
            SET name = COALESCE($2, name),
                role = COALESCE($3, role),
                organization = COALESCE($4, organization),
                updated_at = $5
            WHERE id = $1
            RETURNING {STAKEHOLDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.name.map(|n| n.trim().to_string()))
        .bind(request.role.map(|r| r.as_str()))
        .bind(request.organization)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                CampusEventsError::Conflict("Stakeholder already holds that role".to_string())
            }
            other => CampusEventsError::Database(other),
        })?
        .ok_or_else(|| CampusEventsError::not_found("Stakeholder", id))?;

        Ok(stakeholder)
    }

    /// Delete stakeholder
    pub async fn delete(&self, id: i64) -> Result<(), CampusEventsError> {
        let result = sqlx::query("DELETE FROM stakeholders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CampusEventsError::not_found("Stakeholder", id));
        }
        Ok(())
    }

    /// Stakeholders of an event, optionally filtered by role
    pub async fn list_for_event(&self, event_id: i64, role: Option<StakeholderRole>) -> Result<Vec<Stakeholder>, CampusEventsError> {
        let stakeholders = sqlx::query_as::<_, Stakeholder>(&format!(
            r#"
            SELECT {STAKEHOLDER_COLUMNS} FROM stakeholders
            WHERE event_id = $1 AND ($2::TEXT IS NULL OR role = $2)
            ORDER BY role, name
            "#
        ))
        .bind(event_id)
        .bind(role.map(|r| r.as_str()))
        .fetch_all(&self.pool)
        .await?;

        Ok(stakeholders)
    }

    /// Roles a user holds for an event, matched by user id or email
    pub async fn roles_for_user(&self, event_id: i64, user_id: i64, email: &str) -> Result<Vec<StakeholderRole>, CampusEventsError> {
        let roles: Vec<(String,)> = sqlx::query_as(
            "SELECT role FROM stakeholders WHERE event_id = $1 AND (user_id = $2 OR email = $3)"
        )
        .bind(event_id)
        .bind(user_id)
        .bind(email.to_lowercase())
        .fetch_all(&self.pool)
        .await?;

        Ok(roles.into_iter().filter_map(|(role,)| role.parse().ok()).collect())
    }

    /// Create attendee stakeholders for every user with a checked-in ticket.
    /// Returns the number of stakeholders created.
    pub async fn sync_checked_in_attendees(&self, event_id: i64) -> Result<u64, CampusEventsError> {
        let result = sqlx::query(
            r#"
            INSERT INTO stakeholders (event_id, user_id, name, email, role, created_at, updated_at)
            SELECT DISTINCT ON (u.id) $1, u.id, u.full_name, u.email, 'attendee', NOW(), NOW()
            FROM tickets t
            INNER JOIN users u ON u.id = t.user_id
            WHERE t.event_id = $1 AND t.status = 'checked_in'
            ON CONFLICT (event_id, email, role) DO NOTHING
            "#
        )
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Stakeholder counts per role
    pub async fn count_by_role(&self, event_id: i64) -> Result<Vec<(String, i64)>, CampusEventsError> {
        let counts: Vec<(String, i64)> = sqlx::query_as(
            "SELECT role, COUNT(*) FROM stakeholders WHERE event_id = $1 GROUP BY role ORDER BY role"
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }
}
