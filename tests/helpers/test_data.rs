//! Request bodies and setup shortcuts shared by the API tests

use chrono::{Duration, Utc};
use serde_json::{json, Value};

use super::test_context::{TestContext, TestUser};

/// A free in-person event starting in an hour
pub fn event_body(title: &str, capacity: Option<i32>) -> Value {
    let starts_at = Utc::now() + Duration::hours(1);
    json!({
        "title": title,
        "description": "Talks and lightning demos",
        "category": "tech",
        "venue": "Main Hall",
        "starts_at": starts_at,
        "ends_at": starts_at + Duration::hours(2),
        "capacity": capacity,
        "tags": ["Rust", "rust", "Systems"],
    })
}

pub fn order_body(quantity: i32) -> Value {
    json!({ "quantity": quantity })
}

pub fn stakeholder_body(name: &str, email: &str, role: &str) -> Value {
    json!({ "name": name, "email": email, "role": role })
}

pub fn template_body(role: Option<&str>) -> Value {
    json!({
        "name": "Participation",
        "role": role,
        "layout": {
            "title": "Certificate of Participation",
            "body": "This certifies that {{name}} took part in {{event}} as {{role}}.",
            "signature_name": "Dean of Students",
        }
    })
}

pub fn feedback_form_body() -> Value {
    json!({
        "title": "How was it?",
        "questions": [
            { "id": "overall", "prompt": "Overall rating", "kind": "rating", "required": true },
            { "id": "best", "prompt": "Best session", "kind": "choice", "options": ["Keynote", "Workshop"] },
            { "id": "comments", "prompt": "Anything else?", "kind": "text" }
        ]
    })
}

/// Create and publish an event as the organizer, returning its id
pub async fn published_event(ctx: &TestContext, organizer: &TestUser, title: &str, capacity: Option<i32>) -> i64 {
    let (status, event) = ctx.post("/api/events", &organizer.token, event_body(title, capacity)).await;
    assert_eq!(status, 201, "create event failed: {}", event);
    let event_id = event["id"].as_i64().expect("event id");

    let (status, body) = ctx.post(&format!("/api/events/{}/publish", event_id), &organizer.token, json!({})).await;
    assert_eq!(status, 200, "publish failed: {}", body);
    event_id
}

/// Buy tickets and return the order body
pub async fn buy(ctx: &TestContext, buyer: &TestUser, event_id: i64, quantity: i32) -> Value {
    let (status, order) = ctx
        .post(&format!("/api/events/{}/orders", event_id), &buyer.token, order_body(quantity))
        .await;
    assert_eq!(status, 201, "purchase failed: {}", order);
    order
}

/// Scan a ticket by its entry code
pub async fn scan_code(ctx: &TestContext, scanner: &TestUser, event_id: i64, entry_code: &str) -> Value {
    let (status, result) = ctx
        .post(
            &format!("/api/events/{}/scan", event_id),
            &scanner.token,
            json!({ "entry_code": entry_code }),
        )
        .await;
    assert_eq!(status, 200, "scan failed: {}", result);
    result
}
