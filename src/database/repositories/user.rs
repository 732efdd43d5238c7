//! User repository implementation

use sqlx::PgPool;
use chrono::Utc;
use crate::models::user::{User, UserRole, UpsertUserRequest, UpdateUserRequest};
use crate::utils::errors::CampusEventsError;

const USER_COLUMNS: &str = "id, auth_subject, email, full_name, role, department, created_at, updated_at";

#[derive(Clone)]
#[derive(Debug)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a user on first sight of their token subject, refresh identity fields otherwise.
    /// An admin role from configuration is applied; other stored roles are kept.
    pub async fn upsert(&self, request: UpsertUserRequest) -> Result<User, CampusEventsError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (auth_subject, email, full_name, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT (auth_subject) DO UPDATE
            SET email = EXCLUDED.email,
                full_name = CASE WHEN users.full_name = '' THEN EXCLUDED.full_name ELSE users.full_name END,
                role = CASE WHEN EXCLUDED.role = 'admin' THEN 'admin' ELSE users.role END,
                updated_at = EXCLUDED.updated_at
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(request.auth_subject)
        .bind(request.email.to_lowercase())
        .bind(request.full_name)
        .bind(request.role.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                CampusEventsError::Conflict("Email is already linked to another account".to_string())
            }
            other => CampusEventsError::Database(other),
        })?;

        Ok(user)
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, CampusEventsError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Find user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, CampusEventsError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email.to_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Update profile fields
    pub async fn update(&self, id: i64, request: UpdateUserRequest) -> Result<User, CampusEventsError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET full_name = COALESCE($2, full_name),
                department = COALESCE($3, department),
                updated_at = $4
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.full_name.map(|n| n.trim().to_string()))
        .bind(request.department)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CampusEventsError::UserNotFound { user_id: id })?;

        Ok(user)
    }

    /// Change the global role of a user
    pub async fn set_role(&self, id: i64, role: UserRole) -> Result<User, CampusEventsError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2, updated_at = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role.as_str())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(CampusEventsError::UserNotFound { user_id: id })?;

        Ok(user)
    }

    /// List users with pagination
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, CampusEventsError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Count total users
    pub async fn count(&self) -> Result<i64, CampusEventsError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
