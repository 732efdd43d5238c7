//! Event task repository implementation

use sqlx::PgPool;
use chrono::Utc;
use crate::models::task::{EventTask, CreateTaskRequest, TaskStatus, UpdateTaskRequest};
use crate::utils::errors::CampusEventsError;

const TASK_COLUMNS: &str = "id, event_id, title, description, assignee_stakeholder_id, status, due_at, position, created_at, updated_at";

#[derive(Clone)]
#[derive(Debug)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append a task at the end of the event checklist
    pub async fn create(&self, event_id: i64, request: CreateTaskRequest) -> Result<EventTask, CampusEventsError> {
        let task = sqlx::query_as::<_, EventTask>(&format!(
            r#"
            INSERT INTO event_tasks (event_id, title, description, assignee_stakeholder_id, status, due_at, position, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 'todo', $5,
                    (SELECT COALESCE(MAX(position) + 1, 0) FROM event_tasks WHERE event_id = $1),
                    $6, $6)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(event_id)
        .bind(request.title.trim())
        .bind(request.description)
        .bind(request.assignee_stakeholder_id)
        .bind(request.due_at)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(task)
    }

    /// Append several tasks in one transaction
    pub async fn create_many(&self, event_id: i64, requests: Vec<CreateTaskRequest>) -> Result<Vec<EventTask>, CampusEventsError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let (next_position,): (i32,) = sqlx::query_as(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM event_tasks WHERE event_id = $1"
        )
        .bind(event_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut tasks = Vec::with_capacity(requests.len());
        for (offset, request) in requests.into_iter().enumerate() {
            let task = sqlx::query_as::<_, EventTask>(&format!(
                r#"
                INSERT INTO event_tasks (event_id, title, description, assignee_stakeholder_id, status, due_at, position, created_at, updated_at)
                VALUES ($1, $2, $3, $4, 'todo', $5, $6, $7, $7)
                RETURNING {TASK_COLUMNS}
                "#
            ))
            .bind(event_id)
            .bind(request.title.trim())
            .bind(request.description)
            .bind(request.assignee_stakeholder_id)
            .bind(request.due_at)
            .bind(next_position + offset as i32)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
            tasks.push(task);
        }

        tx.commit().await?;
        Ok(tasks)
    }

    /// Find task by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<EventTask>, CampusEventsError> {
        let task = sqlx::query_as::<_, EventTask>(&format!("SELECT {TASK_COLUMNS} FROM event_tasks WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(task)
    }

    /// Update task. A status change only applies while the task is still in `from`.
    pub async fn update(&self, id: i64, from: TaskStatus, request: UpdateTaskRequest) -> Result<EventTask, CampusEventsError> {
        let to = request.status;
        if let Some(to) = to {
            from.transition_to(to)?;
        }

        let task = sqlx::query_as::<_, EventTask>(&format!(
            r#"
            UPDATE event_tasks
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                assignee_stakeholder_id = COALESCE($4, assignee_stakeholder_id),
                status = COALESCE($5, status),
                due_at = COALESCE($6, due_at),
                position = COALESCE($7, position),
                updated_at = $8
            WHERE id = $1 AND ($5::TEXT IS NULL OR status = $9)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.title.map(|t| t.trim().to_string()))
        .bind(request.description)
        .bind(request.assignee_stakeholder_id)
        .bind(to.map(|s| s.as_str()))
        .bind(request.due_at)
        .bind(request.position)
        .bind(Utc::now())
        .bind(from.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match task {
            Some(task) => Ok(task),
            None => {
                let current = self
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| CampusEventsError::not_found("Task", id))?;
                Err(CampusEventsError::InvalidStateTransition {
                    from: current.status,
                    to: to.map(|s| s.to_string()).unwrap_or_default(),
                })
            }
        }
    }

    /// Delete task
    pub async fn delete(&self, id: i64) -> Result<(), CampusEventsError> {
        let result = sqlx::query("DELETE FROM event_tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CampusEventsError::not_found("Task", id));
        }
        Ok(())
    }

    /// Checklist of an event in display order
    pub async fn list_for_event(&self, event_id: i64) -> Result<Vec<EventTask>, CampusEventsError> {
        let tasks = sqlx::query_as::<_, EventTask>(&format!(
            "SELECT {TASK_COLUMNS} FROM event_tasks WHERE event_id = $1 ORDER BY position, id"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    /// Task counts per status
    pub async fn count_by_status(&self, event_id: i64) -> Result<Vec<(String, i64)>, CampusEventsError> {
        let counts: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM event_tasks WHERE event_id = $1 GROUP BY status ORDER BY status"
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }
}
