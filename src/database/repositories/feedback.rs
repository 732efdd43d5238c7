//! Feedback form and response repository implementation

use std::collections::BTreeMap;
use sqlx::PgPool;
use sqlx::types::Json;
use chrono::Utc;
use crate::models::feedback::{AnswerValue, FeedbackForm, FeedbackQuestion, FeedbackResponse};
use crate::utils::errors::CampusEventsError;

const FORM_COLUMNS: &str = "id, event_id, title, questions, is_open, created_at";
const RESPONSE_COLUMNS: &str = "id, form_id, user_id, answers, submitted_at";

#[derive(Clone)]
#[derive(Debug)]
pub struct FeedbackRepository {
    pool: PgPool,
}

impl FeedbackRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an open form
    pub async fn create_form(&self, event_id: i64, title: &str, questions: Vec<FeedbackQuestion>) -> Result<FeedbackForm, CampusEventsError> {
        let form = sqlx::query_as::<_, FeedbackForm>(&format!(
            r#"
            INSERT INTO feedback_forms (event_id, title, questions, is_open, created_at)
            VALUES ($1, $2, $3, TRUE, $4)
            RETURNING {FORM_COLUMNS}
            "#
        ))
        .bind(event_id)
        .bind(title.trim())
        .bind(Json(questions))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(form)
    }

    /// Find form by ID
    pub async fn find_form(&self, id: i64) -> Result<Option<FeedbackForm>, CampusEventsError> {
        let form = sqlx::query_as::<_, FeedbackForm>(&format!(
            "SELECT {FORM_COLUMNS} FROM feedback_forms WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(form)
    }

    /// Forms of an event
    pub async fn list_forms(&self, event_id: i64) -> Result<Vec<FeedbackForm>, CampusEventsError> {
        let forms = sqlx::query_as::<_, FeedbackForm>(&format!(
            "SELECT {FORM_COLUMNS} FROM feedback_forms WHERE event_id = $1 ORDER BY created_at DESC"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(forms)
    }

    /// Open or close a form for submissions
    pub async fn set_open(&self, id: i64, is_open: bool) -> Result<FeedbackForm, CampusEventsError> {
        let form = sqlx::query_as::<_, FeedbackForm>(&format!(
            "UPDATE feedback_forms SET is_open = $2 WHERE id = $1 RETURNING {FORM_COLUMNS}"
        ))
        .bind(id)
        .bind(is_open)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CampusEventsError::not_found("Feedback form", id))?;

        Ok(form)
    }

    /// Store a response; one per user and form
    pub async fn submit(&self, form_id: i64, user_id: i64, answers: BTreeMap<String, AnswerValue>) -> Result<FeedbackResponse, CampusEventsError> {
        let response = sqlx::query_as::<_, FeedbackResponse>(&format!(
            r#"
            INSERT INTO feedback_responses (form_id, user_id, answers, submitted_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {RESPONSE_COLUMNS}
            "#
        ))
        .bind(form_id)
        .bind(user_id)
        .bind(Json(answers))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                CampusEventsError::Conflict("Feedback already submitted for this form".to_string())
            }
            other => CampusEventsError::Database(other),
        })?;

        Ok(response)
    }

    /// All responses of a form
    pub async fn list_responses(&self, form_id: i64) -> Result<Vec<FeedbackResponse>, CampusEventsError> {
        let responses = sqlx::query_as::<_, FeedbackResponse>(&format!(
            "SELECT {RESPONSE_COLUMNS} FROM feedback_responses WHERE form_id = $1 ORDER BY submitted_at"
        ))
        .bind(form_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(responses)
    }
}
