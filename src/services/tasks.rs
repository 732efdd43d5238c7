//! Event task checklist generation

use chrono::{DateTime, Duration, Utc};
use crate::models::{CreateTaskRequest, Event};

fn task(title: &str, description: &str, due_at: DateTime<Utc>) -> CreateTaskRequest {
    CreateTaskRequest {
        title: title.to_string(),
        description: Some(description.to_string()),
        assignee_stakeholder_id: None,
        due_at: Some(due_at),
    }
}

/// Deterministic preparation checklist for an event, ordered by due date.
/// Due dates are relative to the event start (and end, for wrap-up items).
pub fn default_checklist(event: &Event) -> Vec<CreateTaskRequest> {
    let start = event.starts_at;
    let end = event.ends_at;
    let mut tasks = vec![
        task(
            "Finalize agenda",
            "Confirm sessions, speakers and timings.",
            start - Duration::days(14),
        ),
        task(
            "Announce the event",
            "Publish the event and share it with campus mailing lists and clubs.",
            start - Duration::days(10),
        ),
    ];

    if event.is_online {
        tasks.push(task(
            "Set up streaming",
            "Create the meeting link, assign a host and test audio and screen sharing.",
            start - Duration::days(3),
        ));
        tasks.push(task(
            "Send joining instructions",
            "Email the online link and etiquette notes to ticket holders.",
            start - Duration::days(1),
        ));
    } else {
        tasks.push(task(
            "Confirm venue booking",
            &format!(
                "Confirm the booking for {} and check accessibility.",
                event.venue.as_deref().unwrap_or("the venue")
            ),
            start - Duration::days(21),
        ));
        tasks.push(task(
            "Arrange equipment",
            "Projector, microphones, extension cords and signage.",
            start - Duration::days(5),
        ));
        tasks.push(task(
            "Brief door volunteers",
            "Share the scanning instructions and the check-in schedule.",
            start - Duration::days(1),
        ));
    }

    if !event.is_free() {
        tasks.push(task(
            "Reconcile payments",
            "Match order payment references against received payments.",
            start - Duration::days(2),
        ));
    }

    if matches!(event.capacity, Some(capacity) if capacity >= 100) {
        tasks.push(task(
            "Plan crowd management",
            "Schedule extra volunteers for entry queues and seating.",
            start - Duration::days(7),
        ));
    }

    if event.capacity.is_some() {
        tasks.push(task(
            "Review attendance numbers",
            "Check remaining tickets and decide on waitlist or capacity changes.",
            start - Duration::days(3),
        ));
    }

    tasks.push(task(
        "Open feedback form",
        "Create the feedback form so attendees can respond right after the event.",
        end,
    ));
    tasks.push(task(
        "Issue certificates",
        "Sync attendees from check-ins and generate certificates.",
        end + Duration::days(2),
    ));
    tasks.push(task(
        "Publish photo gallery",
        "Collect photos from volunteers and make the gallery public.",
        end + Duration::days(5),
    ));

    tasks.sort_by_key(|t| t.due_at);
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::tests::sample_event;

    fn titles(tasks: &[CreateTaskRequest]) -> Vec<&str> {
        tasks.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn test_in_person_free_event() {
        let event = sample_event();
        let tasks = default_checklist(&event);
        let names = titles(&tasks);

        assert!(names.contains(&"Confirm venue booking"));
        assert!(names.contains(&"Plan crowd management"));
        assert!(!names.contains(&"Set up streaming"));
        assert!(!names.contains(&"Reconcile payments"));
        assert_eq!(names.first(), Some(&"Confirm venue booking"));
        assert!(tasks.windows(2).all(|w| w[0].due_at <= w[1].due_at));
    }

    #[test]
    fn test_online_paid_event() {
        let mut event = sample_event();
        event.is_online = true;
        event.venue = None;
        event.price_cents = 1500;
        event.capacity = None;
        event.tickets_remaining = None;

        let names: Vec<String> = default_checklist(&event).into_iter().map(|t| t.title).collect();
        assert!(names.iter().any(|n| n == "Set up streaming"));
        assert!(names.iter().any(|n| n == "Reconcile payments"));
        assert!(!names.iter().any(|n| n == "Confirm venue booking"));
        assert!(!names.iter().any(|n| n == "Review attendance numbers"));
    }

    #[test]
    fn test_checklist_is_deterministic() {
        let event = sample_event();
        let first: Vec<_> = default_checklist(&event).into_iter().map(|t| (t.title, t.due_at)).collect();
        let second: Vec<_> = default_checklist(&event).into_iter().map(|t| (t.title, t.due_at)).collect();
        assert_eq!(first, second);
    }
}
