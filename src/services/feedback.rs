//! Feedback form validation and response summaries

use std::collections::{BTreeMap, HashSet};
use crate::models::{AnswerValue, FeedbackQuestion, FeedbackResponse, FeedbackSummary, QuestionKind, QuestionSummary};
use crate::utils::errors::{CampusEventsError, Result};

pub const MAX_QUESTIONS: usize = 50;
pub const MAX_TEXT_ANSWER: usize = 2000;

/// Check a question list before a form is created
pub fn validate_questions(title: &str, questions: &[FeedbackQuestion]) -> Result<()> {
    if title.trim().is_empty() {
        return Err(CampusEventsError::InvalidInput("Form title is required".to_string()));
    }
    if questions.is_empty() {
        return Err(CampusEventsError::InvalidInput("A form needs at least one question".to_string()));
    }
    if questions.len() > MAX_QUESTIONS {
        return Err(CampusEventsError::InvalidInput(format!(
            "A form has at most {} questions",
            MAX_QUESTIONS
        )));
    }

    let mut seen = HashSet::new();
    for question in questions {
        if question.id.trim().is_empty() || question.prompt.trim().is_empty() {
            return Err(CampusEventsError::InvalidInput("Questions need an id and a prompt".to_string()));
        }
        if !seen.insert(question.id.as_str()) {
            return Err(CampusEventsError::InvalidInput(format!("Duplicate question id: {}", question.id)));
        }
        if question.kind == QuestionKind::Choice {
            let distinct: HashSet<&str> = question.options.iter().map(|o| o.trim()).filter(|o| !o.is_empty()).collect();
            if distinct.len() < 2 {
                return Err(CampusEventsError::InvalidInput(format!(
                    "Choice question {} needs at least two distinct options",
                    question.id
                )));
            }
        }
    }
    Ok(())
}

/// Check a submission against the form's questions
pub fn validate_answers(questions: &[FeedbackQuestion], answers: &BTreeMap<String, AnswerValue>) -> Result<()> {
    for id in answers.keys() {
        if !questions.iter().any(|q| &q.id == id) {
            return Err(CampusEventsError::InvalidInput(format!("Unknown question: {}", id)));
        }
    }

    for question in questions {
        let answer = match answers.get(&question.id) {
            Some(answer) => answer,
            None if question.required => {
                return Err(CampusEventsError::InvalidInput(format!(
                    "Question {} requires an answer",
                    question.id
                )))
            }
            None => continue,
        };

        match (question.kind, answer) {
            (QuestionKind::Rating, AnswerValue::Number(score)) if (1..=5).contains(score) => {}
            (QuestionKind::Rating, _) => {
                return Err(CampusEventsError::InvalidInput(format!(
                    "Question {} expects a rating from 1 to 5",
                    question.id
                )))
            }
            (QuestionKind::Choice, AnswerValue::Text(choice)) if question.options.iter().any(|o| o == choice) => {}
            (QuestionKind::Choice, _) => {
                return Err(CampusEventsError::InvalidInput(format!(
                    "Question {} expects one of: {}",
                    question.id,
                    question.options.join(", ")
                )))
            }
            (QuestionKind::Text, AnswerValue::Text(text)) => {
                if question.required && text.trim().is_empty() {
                    return Err(CampusEventsError::InvalidInput(format!(
                        "Question {} requires an answer",
                        question.id
                    )));
                }
                if text.chars().count() > MAX_TEXT_ANSWER {
                    return Err(CampusEventsError::InvalidInput(format!(
                        "Answers are limited to {} characters",
                        MAX_TEXT_ANSWER
                    )));
                }
            }
            (QuestionKind::Text, AnswerValue::Number(_)) => {
                return Err(CampusEventsError::InvalidInput(format!(
                    "Question {} expects a text answer",
                    question.id
                )))
            }
        }
    }
    Ok(())
}

/// Aggregate responses per question
pub fn summarize(form_id: i64, questions: &[FeedbackQuestion], responses: &[FeedbackResponse]) -> FeedbackSummary {
    let summaries = questions
        .iter()
        .map(|question| {
            let answers = responses.iter().filter_map(|r| r.answers.get(&question.id));
            match question.kind {
                QuestionKind::Rating => {
                    let mut distribution = [0usize; 5];
                    let mut total = 0i64;
                    let mut answered = 0usize;
                    for answer in answers {
                        if let AnswerValue::Number(score @ 1..=5) = answer {
                            distribution[(*score - 1) as usize] += 1;
                            total += score;
                            answered += 1;
                        }
                    }
                    QuestionSummary::Rating {
                        question_id: question.id.clone(),
                        prompt: question.prompt.clone(),
                        answered,
                        average: (answered > 0).then(|| total as f64 / answered as f64),
                        distribution,
                    }
                }
                QuestionKind::Choice => {
                    let mut counts: BTreeMap<String, usize> =
                        question.options.iter().map(|o| (o.clone(), 0)).collect();
                    let mut answered = 0usize;
                    for answer in answers {
                        if let AnswerValue::Text(choice) = answer {
                            *counts.entry(choice.clone()).or_insert(0) += 1;
                            answered += 1;
                        }
                    }
                    QuestionSummary::Choice {
                        question_id: question.id.clone(),
                        prompt: question.prompt.clone(),
                        answered,
                        counts,
                    }
                }
                QuestionKind::Text => {
                    let texts: Vec<String> = answers
                        .filter_map(|a| match a {
                            AnswerValue::Text(t) if !t.trim().is_empty() => Some(t.trim().to_string()),
                            _ => None,
                        })
                        .collect();
                    QuestionSummary::Text {
                        question_id: question.id.clone(),
                        prompt: question.prompt.clone(),
                        answered: texts.len(),
                        answers: texts,
                    }
                }
            }
        })
        .collect();

    FeedbackSummary {
        form_id,
        responses: responses.len(),
        questions: summaries,
    }
}
