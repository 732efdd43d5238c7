//! Certificate rendering and generation

use std::sync::OnceLock;
use chrono::Utc;
use regex::{Captures, Regex};
use tracing::info;
use crate::database::DatabaseService;
use crate::models::{CertificateLayout, Event, GenerationSummary, RenderedCertificate, Stakeholder};
use crate::models::certificate::LayoutField;
use crate::utils::errors::Result;

/// Values substituted into `{{placeholder}}` markers
#[derive(Debug, Clone)]
pub struct PlaceholderValues<'a> {
    pub name: &'a str,
    pub role: &'a str,
    pub event: &'a str,
    pub date: String,
    pub organization: &'a str,
    pub serial: &'a str,
}

impl<'a> PlaceholderValues<'a> {
    pub fn new(stakeholder: &'a Stakeholder, event: &'a Event, serial: &'a str) -> Self {
        Self {
            name: &stakeholder.name,
            role: &stakeholder.role,
            event: &event.title,
            date: event.starts_at.format("%B %-d, %Y").to_string(),
            organization: stakeholder.organization.as_deref().unwrap_or_default(),
            serial,
        }
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        match key {
            "name" => Some(self.name),
            "role" => Some(self.role),
            "event" => Some(self.event),
            "date" => Some(&self.date),
            "organization" => Some(self.organization),
            "serial" => Some(self.serial),
            _ => None,
        }
    }
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{\s*([a-z_]+)\s*\}\}").expect("static placeholder regex"))
}

/// Replace known placeholders; unknown ones are left as written
pub fn render_text(text: &str, values: &PlaceholderValues<'_>) -> String {
    placeholder_regex()
        .replace_all(text, |caps: &Captures<'_>| match values.lookup(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Render a whole layout for one recipient
pub fn render_layout(layout: &CertificateLayout, values: &PlaceholderValues<'_>) -> RenderedCertificate {
    let render_opt = |text: &Option<String>| text.as_deref().map(|t| render_text(t, values));

    RenderedCertificate {
        title: render_text(&layout.title, values),
        body: render_text(&layout.body, values),
        background_url: layout.background_url.clone(),
        signature_name: render_opt(&layout.signature_name),
        signature_title: render_opt(&layout.signature_title),
        fields: layout
            .fields
            .iter()
            .map(|field| LayoutField {
                text: render_text(&field.text, values),
                ..field.clone()
            })
            .collect(),
    }
}

#[derive(Clone, Debug)]
pub struct CertificateService {
    db: DatabaseService,
}

impl CertificateService {
    pub fn new(db: DatabaseService) -> Self {
        Self { db }
    }

    /// Issue certificates from a template to every matching stakeholder that lacks one
    pub async fn generate_for_event(&self, template_id: i64) -> Result<GenerationSummary> {
        let template = self.db.require_template(template_id).await?;
        let event = self.db.require_event(template.event_id).await?;
        let candidates = self.db.certificates.count_candidates(&template).await? as usize;
        let pending = self.db.certificates.pending_recipients(&template).await?;

        let now = Utc::now();
        let mut issued = 0;
        for stakeholder in &pending {
            let certificate = self
                .db
                .certificates
                .issue(&template, stakeholder, now, |serial| {
                    render_layout(&template.layout, &PlaceholderValues::new(stakeholder, &event, serial))
                })
                .await?;
            if certificate.is_some() {
                issued += 1;
            }
        }

        let summary = GenerationSummary {
            template_id,
            candidates,
            issued,
            skipped: candidates.saturating_sub(issued),
        };
        info!(
            template_id = template_id,
            event_id = event.id,
            issued = summary.issued,
            skipped = summary.skipped,
            "Certificates generated"
        );
        Ok(summary)
    }
}
