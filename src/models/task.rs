//! Event task model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use crate::utils::errors::{CampusEventsError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventTask {
    pub id: i64,
    pub event_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub assignee_stakeholder_id: Option<i64>,
    pub status: String,
    pub due_at: Option<DateTime<Utc>>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventTask {
    pub fn status(&self) -> TaskStatus {
        self.status.parse().unwrap_or(TaskStatus::Todo)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status() != TaskStatus::Done && matches!(self.due_at, Some(due) if due < now)
    }
}

text_enum! {
    TaskStatus {
        Todo => "todo",
        InProgress => "in_progress",
        Done => "done",
    }
}

impl TaskStatus {
    /// Tasks move freely between statuses; only a no-op change is rejected
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        *self != next
    }

    pub fn transition_to(&self, next: TaskStatus) -> Result<TaskStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CampusEventsError::InvalidStateTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub assignee_stakeholder_id: Option<i64>,
    pub due_at: Option<DateTime<Utc>>,
}

impl CreateTaskRequest {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(CampusEventsError::InvalidInput("Task title is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee_stakeholder_id: Option<i64>,
    pub status: Option<TaskStatus>,
    pub due_at: Option<DateTime<Utc>>,
    pub position: Option<i32>,
}

impl UpdateTaskRequest {
    pub fn validate(&self) -> Result<()> {
        if let Some(ref title) = self.title {
            if title.trim().is_empty() {
                return Err(CampusEventsError::InvalidInput("Task title cannot be empty".to_string()));
            }
        }
        if matches!(self.position, Some(p) if p < 0) {
            return Err(CampusEventsError::InvalidInput("Task position cannot be negative".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_overdue() {
        let now = Utc::now();
        let mut task = EventTask {
            id: 1,
            event_id: 1,
            title: "Book room".into(),
            description: None,
            assignee_stakeholder_id: None,
            status: "todo".into(),
            due_at: Some(now - Duration::hours(1)),
            position: 0,
            created_at: now,
            updated_at: now,
        };
        assert!(task.is_overdue(now));

        task.status = "done".into();
        assert!(!task.is_overdue(now));

        task.status = "in_progress".into();
        task.due_at = None;
        assert!(!task.is_overdue(now));
    }

    #[test]
    fn test_status_transitions() {
        for from in TaskStatus::ALL {
            for to in TaskStatus::ALL {
                assert_eq!(from.can_transition_to(*to), from != to);
            }
        }
        assert_eq!(TaskStatus::Done.transition_to(TaskStatus::Todo).unwrap(), TaskStatus::Todo);
        assert!(matches!(
            TaskStatus::Todo.transition_to(TaskStatus::Todo),
            Err(CampusEventsError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_update_validation() {
        let update = UpdateTaskRequest { position: Some(-1), ..Default::default() };
        assert!(update.validate().is_err());

        let update = UpdateTaskRequest { title: Some(" ".into()), ..Default::default() };
        assert!(update.validate().is_err());
    }
}
