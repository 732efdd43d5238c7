//! Feedback form and response models

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeedbackForm {
    pub id: i64,
    pub event_id: i64,
    pub title: String,
    pub questions: Json<Vec<FeedbackQuestion>>,
    pub is_open: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    /// Integer score from 1 to 5
    Rating,
    Text,
    /// One of `options`
    Choice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackQuestion {
    pub id: String,
    pub prompt: String,
    pub kind: QuestionKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeedbackResponse {
    pub id: i64,
    pub form_id: i64,
    pub user_id: i64,
    pub answers: Json<BTreeMap<String, AnswerValue>>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFeedbackFormRequest {
    pub title: String,
    pub questions: Vec<FeedbackQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitFeedbackRequest {
    pub answers: BTreeMap<String, AnswerValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSummary {
    pub form_id: i64,
    pub responses: usize,
    pub questions: Vec<QuestionSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionSummary {
    Rating {
        question_id: String,
        prompt: String,
        answered: usize,
        average: Option<f64>,
        /// Count of scores 1..=5 at index score - 1
        distribution: [usize; 5],
    },
    Choice {
        question_id: String,
        prompt: String,
        answered: usize,
        counts: BTreeMap<String, usize>,
    },
    Text {
        question_id: String,
        prompt: String,
        answered: usize,
        answers: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_values_are_untagged() {
        let answers: BTreeMap<String, AnswerValue> =
            serde_json::from_str(r#"{"q1": 4, "q2": "Great venue"}"#).unwrap();
        assert_eq!(answers["q1"], AnswerValue::Number(4));
        assert_eq!(answers["q2"], AnswerValue::Text("Great venue".to_string()));
    }

    #[test]
    fn test_question_defaults() {
        let q: FeedbackQuestion =
            serde_json::from_str(r#"{"id":"overall","prompt":"Overall?","kind":"rating"}"#).unwrap();
        assert!(!q.required);
        assert!(q.options.is_empty());
        assert_eq!(q.kind, QuestionKind::Rating);
    }
}
