//! CSV exports streamed as response bodies

use std::convert::Infallible;
use async_stream::stream;
use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::Stream;
use crate::models::{Stakeholder, Ticket};
use crate::utils::helpers::{csv_line, format_timestamp, slugify};

pub const STAKEHOLDER_HEADER: [&str; 5] = ["name", "email", "role", "organization", "added_at"];
pub const ATTENDEE_HEADER: [&str; 6] = ["ticket_id", "holder_name", "entry_code", "status", "checked_in_at", "order_id"];

/// One CSV line per stakeholder after the header
pub fn stakeholder_rows(stakeholders: Vec<Stakeholder>) -> impl Stream<Item = Result<String, Infallible>> {
    stream! {
        yield Ok(csv_line(&STAKEHOLDER_HEADER));
        for s in stakeholders {
            let added_at = format_timestamp(s.created_at);
            yield Ok(csv_line(&[
                s.name.as_str(),
                s.email.as_str(),
                s.role.as_str(),
                s.organization.as_deref().unwrap_or_default(),
                added_at.as_str(),
            ]));
        }
    }
}

/// One CSV line per ticket after the header
pub fn attendee_rows(tickets: Vec<Ticket>) -> impl Stream<Item = Result<String, Infallible>> {
    stream! {
        yield Ok(csv_line(&ATTENDEE_HEADER));
        for t in tickets {
            let id = t.id.to_string();
            let order_id = t.order_id.to_string();
            let checked_in_at = t.checked_in_at.map(format_timestamp).unwrap_or_default();
            yield Ok(csv_line(&[
                id.as_str(),
                t.holder_name.as_str(),
                t.entry_code.as_str(),
                t.status.as_str(),
                checked_in_at.as_str(),
                order_id.as_str(),
            ]));
        }
    }
}

/// Wrap a CSV line stream in a download response
pub fn csv_response<S>(name: &str, rows: S) -> Response
where
    S: Stream<Item = Result<String, Infallible>> + Send + 'static,
{
    let filename = format!("{}.csv", slugify(name));
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(rows),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use futures::StreamExt;
    use http_body_util::BodyExt;

    fn stakeholder(name: &str, organization: Option<&str>) -> Stakeholder {
        let now = Utc::now();
        Stakeholder {
            id: 1,
            event_id: 1,
            user_id: None,
            name: name.to_string(),
            email: "x@campus.edu".to_string(),
            role: "sponsor".to_string(),
            organization: organization.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_stakeholder_rows_escape_fields() {
        let rows: Vec<String> = stakeholder_rows(vec![stakeholder("Doe, Jane", Some("ACME \"Labs\"")), stakeholder("Bo", None)])
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], "name,email,role,organization,added_at\n");
        assert!(rows[1].starts_with("\"Doe, Jane\",x@campus.edu,sponsor,\"ACME \"\"Labs\"\"\","));
        assert!(rows[2].starts_with("Bo,x@campus.edu,sponsor,,"));
    }

    #[tokio::test]
    async fn test_attendee_rows() {
        let ticket = Ticket {
            id: 9,
            order_id: 4,
            event_id: 1,
            user_id: 2,
            entry_code: "ABCDEFGH23".to_string(),
            holder_name: "Sam".to_string(),
            status: "valid".to_string(),
            checked_in_at: None,
            checked_in_by: None,
            created_at: Utc::now(),
        };
        let rows: Vec<String> = attendee_rows(vec![ticket]).map(|r| r.unwrap()).collect().await;
        assert_eq!(rows[1], "9,Sam,ABCDEFGH23,valid,,4\n");
    }

    #[tokio::test]
    async fn test_csv_response_headers() {
        let response = csv_response("Rust Meetup stakeholders", stakeholder_rows(vec![]));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv; charset=utf-8");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"rust-meetup-stakeholders.csv\""
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"name,email,role,organization,added_at\n");
    }
}
