//! Certificate template and issued certificate models

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use crate::models::stakeholder::StakeholderRole;
use crate::utils::errors::{CampusEventsError, Result};
use crate::utils::helpers::validate_http_url;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CertificateTemplate {
    pub id: i64,
    pub event_id: i64,
    pub name: String,
    /// Only stakeholders with this role receive the certificate; all when unset
    pub role: Option<String>,
    pub layout: Json<CertificateLayout>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CertificateTemplate {
    pub fn role_filter(&self) -> Option<StakeholderRole> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }
}

/// Positioned text block on the certificate canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutField {
    pub text: String,
    pub x: f32,
    pub y: f32,
    #[serde(default = "LayoutField::default_font_size")]
    pub font_size: f32,
}

impl LayoutField {
    fn default_font_size() -> f32 {
        14.0
    }
}

/// Template document. Text supports `{{placeholder}}` substitution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateLayout {
    pub title: String,
    pub body: String,
    pub background_url: Option<String>,
    pub signature_name: Option<String>,
    pub signature_title: Option<String>,
    #[serde(default)]
    pub fields: Vec<LayoutField>,
}

impl CertificateLayout {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(CampusEventsError::InvalidInput("Certificate title is required".to_string()));
        }
        if self.body.trim().is_empty() {
            return Err(CampusEventsError::InvalidInput("Certificate body is required".to_string()));
        }
        if let Some(ref url) = self.background_url {
            validate_http_url(url)?;
        }
        for field in &self.fields {
            if !(0.0..=1.0).contains(&field.x) || !(0.0..=1.0).contains(&field.y) {
                return Err(CampusEventsError::InvalidInput(
                    "Layout field positions are fractions between 0 and 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Layout with every placeholder resolved for one recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedCertificate {
    pub title: String,
    pub body: String,
    pub background_url: Option<String>,
    pub signature_name: Option<String>,
    pub signature_title: Option<String>,
    pub fields: Vec<LayoutField>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Certificate {
    pub id: i64,
    pub template_id: i64,
    pub stakeholder_id: i64,
    pub event_id: i64,
    pub serial: String,
    pub recipient_name: String,
    pub recipient_email: String,
    pub role: String,
    pub rendered: Json<RenderedCertificate>,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    pub role: Option<StakeholderRole>,
    pub layout: CertificateLayout,
}

impl CreateTemplateRequest {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CampusEventsError::InvalidInput("Template name is required".to_string()));
        }
        self.layout.validate()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTemplateRequest {
    pub name: Option<String>,
    pub role: Option<StakeholderRole>,
    pub layout: Option<CertificateLayout>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub template_id: i64,
    pub candidates: usize,
    pub issued: usize,
    pub skipped: usize,
}

/// Public view of a certificate looked up by serial
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CertificateVerification {
    pub serial: String,
    pub recipient_name: String,
    pub role: String,
    pub event_title: String,
    pub event_starts_at: DateTime<Utc>,
    pub issued_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> CertificateLayout {
        CertificateLayout {
            title: "Certificate of Participation".to_string(),
            body: "Awarded to {{name}}".to_string(),
            background_url: None,
            signature_name: None,
            signature_title: None,
            fields: vec![LayoutField { text: "{{serial}}".into(), x: 0.9, y: 0.95, font_size: 8.0 }],
        }
    }

    #[test]
    fn test_layout_validation() {
        assert!(layout().validate().is_ok());

        let mut bad = layout();
        bad.fields[0].x = 1.5;
        assert!(bad.validate().is_err());

        let mut bad = layout();
        bad.background_url = Some("file:///etc/passwd".to_string());
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_layout_field_font_size_default() {
        let field: LayoutField = serde_json::from_str(r#"{"text":"x","x":0.1,"y":0.2}"#).unwrap();
        assert_eq!(field.font_size, 14.0);
    }
}
