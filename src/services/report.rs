//! Event reports aggregated from tickets, stakeholders, feedback, issues and tasks

use std::collections::BTreeMap;
use std::fmt::Write as _;
use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::database::DatabaseService;
use crate::database::repositories::TicketStats;
use crate::models::{Event, EventTask, FeedbackSummary, QuestionSummary, TaskStatus};
use crate::services::feedback::summarize;
use crate::utils::errors::Result;
use crate::utils::helpers::{format_price, format_timestamp};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskProgress {
    pub total: usize,
    pub done: usize,
    pub in_progress: usize,
    pub overdue: usize,
}

impl TaskProgress {
    pub fn from_tasks(tasks: &[EventTask], now: DateTime<Utc>) -> Self {
        Self {
            total: tasks.len(),
            done: tasks.iter().filter(|t| t.status() == TaskStatus::Done).count(),
            in_progress: tasks.iter().filter(|t| t.status() == TaskStatus::InProgress).count(),
            overdue: tasks.iter().filter(|t| t.is_overdue(now)).count(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventReport {
    pub event_id: i64,
    pub title: String,
    pub status: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: Option<i32>,
    pub currency: String,
    pub tickets: TicketStats,
    pub attendance_rate: Option<f64>,
    pub stakeholders_by_role: BTreeMap<String, i64>,
    pub certificates_issued: usize,
    pub photos: i64,
    pub feedback: Vec<FeedbackSummary>,
    pub issues_by_status: BTreeMap<String, i64>,
    pub tasks: TaskProgress,
    pub generated_at: DateTime<Utc>,
}

impl EventReport {
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {}", self.title);
        let _ = writeln!(out);
        let _ = writeln!(out, "- Status: {}", self.status);
        let _ = writeln!(
            out,
            "- Schedule: {} to {}",
            format_timestamp(self.starts_at),
            format_timestamp(self.ends_at)
        );
        match self.capacity {
            Some(capacity) => {
                let _ = writeln!(out, "- Capacity: {}", capacity);
            }
            None => {
                let _ = writeln!(out, "- Capacity: unlimited");
            }
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "## Tickets");
        let _ = writeln!(out);
        let _ = writeln!(out, "| Metric | Value |");
        let _ = writeln!(out, "|---|---|");
        let _ = writeln!(out, "| Tickets issued | {} |", self.tickets.tickets_issued());
        let _ = writeln!(out, "| Checked in | {} |", self.tickets.tickets_checked_in);
        let _ = writeln!(out, "| Cancelled | {} |", self.tickets.tickets_cancelled);
        let _ = writeln!(out, "| Confirmed orders | {} |", self.tickets.orders_confirmed);
        let _ = writeln!(out, "| Revenue | {} |", format_price(self.tickets.revenue_cents, &self.currency));
        let rate = self
            .attendance_rate
            .map(|r| format!("{:.1}%", r * 100.0))
            .unwrap_or_else(|| "n/a".to_string());
        let _ = writeln!(out, "| Attendance rate | {} |", rate);
        let _ = writeln!(out);

        let _ = writeln!(out, "## Stakeholders");
        let _ = writeln!(out);
        if self.stakeholders_by_role.is_empty() {
            let _ = writeln!(out, "No stakeholders recorded.");
        } else {
            for (role, count) in &self.stakeholders_by_role {
                let _ = writeln!(out, "- {}: {}", role, count);
            }
        }
        let _ = writeln!(out, "- Certificates issued: {}", self.certificates_issued);
        let _ = writeln!(out, "- Photos: {}", self.photos);
        let _ = writeln!(out);

        let _ = writeln!(out, "## Feedback");
        let _ = writeln!(out);
        if self.feedback.is_empty() {
            let _ = writeln!(out, "No feedback forms.");
        }
        for form in &self.feedback {
            let _ = writeln!(out, "### Form {} ({} responses)", form.form_id, form.responses);
            for question in &form.questions {
                match question {
                    QuestionSummary::Rating { prompt, average, answered, .. } => {
                        let avg = average.map(|a| format!("{:.2}", a)).unwrap_or_else(|| "n/a".to_string());
                        let _ = writeln!(out, "- {}: average {} over {} answers", prompt, avg, answered);
                    }
                    QuestionSummary::Choice { prompt, counts, .. } => {
                        let parts: Vec<String> = counts.iter().map(|(o, c)| format!("{} {}", o, c)).collect();
                        let _ = writeln!(out, "- {}: {}", prompt, parts.join(", "));
                    }
                    QuestionSummary::Text { prompt, answered, .. } => {
                        let _ = writeln!(out, "- {}: {} written answers", prompt, answered);
                    }
                }
            }
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "## Issues");
        let _ = writeln!(out);
        if self.issues_by_status.is_empty() {
            let _ = writeln!(out, "No issues reported.");
        } else {
            for (status, count) in &self.issues_by_status {
                let _ = writeln!(out, "- {}: {}", status, count);
            }
        }
        let _ = writeln!(out);

        let _ = writeln!(out, "## Tasks");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} of {} done, {} in progress, {} overdue.",
            self.tasks.done, self.tasks.total, self.tasks.in_progress, self.tasks.overdue
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "_Generated {}_", format_timestamp(self.generated_at));
        out
    }
}

#[derive(Clone, Debug)]
pub struct ReportService {
    db: DatabaseService,
}

impl ReportService {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    pub async fn build(&self, event: &Event) -> Result<EventReport> {
        let now = Utc::now();
        let tickets = self.db.tickets.get_stats(event.id).await?;
        let stakeholders_by_role = self.db.stakeholders.count_by_role(event.id).await?.into_iter().collect();
        let issues_by_status = self.db.issues.count_by_status(event.id).await?.into_iter().collect();
        let certificates_issued = self.db.certificates.list_for_event(event.id).await?.len();
        let photos = self.db.galleries.count_photos_for_event(event.id).await?;
        let tasks = self.db.tasks.list_for_event(event.id).await?;

        let mut feedback = Vec::new();
        for form in self.db.feedback.list_forms(event.id).await? {
            let responses = self.db.feedback.list_responses(form.id).await?;
            feedback.push(summarize(form.id, &form.questions, &responses));
        }

        Ok(EventReport {
            event_id: event.id,
            title: event.title.clone(),
            status: event.status.clone(),
            starts_at: event.starts_at,
            ends_at: event.ends_at,
            capacity: event.capacity,
            currency: event.currency.clone(),
            attendance_rate: tickets.attendance_rate(),
            tickets,
            stakeholders_by_role,
            certificates_issued,
            photos,
            feedback,
            issues_by_status,
            tasks: TaskProgress::from_tasks(&tasks, now),
            generated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn report() -> EventReport {
        let now = Utc::now();
        EventReport {
            event_id: 1,
            title: "Rust Meetup".to_string(),
            status: "completed".to_string(),
            starts_at: now - Duration::days(1),
            ends_at: now - Duration::hours(20),
            capacity: Some(100),
            currency: "USD".to_string(),
            tickets: TicketStats {
                orders_confirmed: 40,
                tickets_valid: 20,
                tickets_checked_in: 60,
                tickets_cancelled: 5,
                revenue_cents: 40000,
                ..Default::default()
            },
            attendance_rate: Some(0.75),
            stakeholders_by_role: BTreeMap::from([("speaker".to_string(), 3), ("volunteer".to_string(), 4)]),
            certificates_issued: 7,
            photos: 12,
            feedback: vec![FeedbackSummary {
                form_id: 2,
                responses: 10,
                questions: vec![QuestionSummary::Rating {
                    question_id: "overall".to_string(),
                    prompt: "Overall".to_string(),
                    answered: 10,
                    average: Some(4.25),
                    distribution: [0, 0, 1, 5, 4],
                }],
            }],
            issues_by_status: BTreeMap::new(),
            tasks: TaskProgress { total: 8, done: 6, in_progress: 1, overdue: 1 },
            generated_at: now,
        }
    }

    #[test]
    fn test_render_markdown() {
        let md = report().render_markdown();
        assert!(md.starts_with("# Rust Meetup\n"));
        assert!(md.contains("| Tickets issued | 80 |"));
        assert!(md.contains("| Revenue | 400.00 USD |"));
        assert!(md.contains("| Attendance rate | 75.0% |"));
        assert!(md.contains("- speaker: 3"));
        assert!(md.contains("- Overall: average 4.25 over 10 answers"));
        assert!(md.contains("No issues reported."));
        assert!(md.contains("6 of 8 done, 1 in progress, 1 overdue."));
    }

    #[test]
    fn test_render_markdown_empty_event() {
        let mut empty = report();
        empty.capacity = None;
        empty.tickets = TicketStats::default();
        empty.attendance_rate = None;
        empty.stakeholders_by_role.clear();
        empty.feedback.clear();

        let md = empty.render_markdown();
        assert!(md.contains("- Capacity: unlimited"));
        assert!(md.contains("| Revenue | Free |"));
        assert!(md.contains("| Attendance rate | n/a |"));
        assert!(md.contains("No stakeholders recorded."));
        assert!(md.contains("No feedback forms."));
    }

    #[test]
    fn test_task_progress() {
        let now = Utc::now();
        let task = |status: &str, overdue: bool| EventTask {
            id: 1,
            event_id: 1,
            title: "t".to_string(),
            description: None,
            assignee_stakeholder_id: None,
            status: status.to_string(),
            due_at: overdue.then(|| now - Duration::hours(1)),
            position: 0,
            created_at: now,
            updated_at: now,
        };
        let progress = TaskProgress::from_tasks(&[task("done", true), task("todo", true), task("in_progress", false)], now);
        assert_eq!(progress, TaskProgress { total: 3, done: 1, in_progress: 1, overdue: 1 });
    }
}
