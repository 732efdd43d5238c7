//! Certificate template and certificate repository implementation

use sqlx::PgPool;
use sqlx::types::Json;
use chrono::{DateTime, Utc};
use crate::models::certificate::{
    Certificate, CertificateTemplate, CertificateVerification, CreateTemplateRequest, RenderedCertificate,
    UpdateTemplateRequest,
};
use crate::models::stakeholder::Stakeholder;
use crate::utils::errors::CampusEventsError;
use crate::utils::helpers::generate_serial;

const TEMPLATE_COLUMNS: &str = "id, event_id, name, role, layout, created_at, updated_at";
const CERTIFICATE_COLUMNS: &str = "id, template_id, stakeholder_id, event_id, serial, recipient_name, recipient_email, role, rendered, issued_at";

/// Attempts to find an unused serial before giving up
const SERIAL_ATTEMPTS: usize = 5;

#[derive(Clone)]
#[derive(Debug)]
pub struct CertificateRepository {
    pool: PgPool,
}

impl CertificateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a template
    pub async fn create_template(&self, event_id: i64, request: CreateTemplateRequest) -> Result<CertificateTemplate, CampusEventsError> {
        let now = Utc::now();
        let template = sqlx::query_as::<_, CertificateTemplate>(&format!(
            r#"
            INSERT INTO certificate_templates (event_id, name, role, layout, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {TEMPLATE_COLUMNS}
            "#
        ))
        .bind(event_id)
        .bind(request.name.trim())
        .bind(request.role.map(|r| r.as_str()))
        .bind(Json(request.layout))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(template)
    }

    /// Find template by ID
    pub async fn find_template(&self, id: i64) -> Result<Option<CertificateTemplate>, CampusEventsError> {
        let template = sqlx::query_as::<_, CertificateTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM certificate_templates WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(template)
    }

    /// Update template
    pub async fn update_template(&self, id: i64, request: UpdateTemplateRequest) -> Result<CertificateTemplate, CampusEventsError> {
        let template = sqlx::query_as::<_, CertificateTemplate>(&format!(
            r#"
            UPDATE certificate_templates
            SET name = COALESCE($2, name),
                role = COALESCE($3, role),
                layout = COALESCE($4, layout),
                updated_at = $5
            WHERE id = $1
            RETURNING {TEMPLATE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.name.map(|n| n.trim().to_string()))
        .bind(request.role.map(|r| r.as_str()))
        .bind(request.layout.map(Json))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CampusEventsError::not_found("Certificate template", id))?;

        Ok(template)
    }

    /// Delete template together with certificates issued from it
    pub async fn delete_template(&self, id: i64) -> Result<(), CampusEventsError> {
        let result = sqlx::query("DELETE FROM certificate_templates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CampusEventsError::not_found("Certificate template", id));
        }
        Ok(())
    }

    /// Templates of an event
    pub async fn list_templates(&self, event_id: i64) -> Result<Vec<CertificateTemplate>, CampusEventsError> {
        let templates = sqlx::query_as::<_, CertificateTemplate>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM certificate_templates WHERE event_id = $1 ORDER BY id"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(templates)
    }

    /// Stakeholders matching the template role filter that have no certificate from it yet
    pub async fn pending_recipients(&self, template: &CertificateTemplate) -> Result<Vec<Stakeholder>, CampusEventsError> {
        let stakeholders = sqlx::query_as::<_, Stakeholder>(
            r#"
            SELECT s.id, s.event_id, s.user_id, s.name, s.email, s.role, s.organization, s.created_at, s.updated_at
            FROM stakeholders s
            WHERE s.event_id = $1
              AND ($2::TEXT IS NULL OR s.role = $2)
              AND NOT EXISTS (SELECT 1 FROM certificates c WHERE c.template_id = $3 AND c.stakeholder_id = s.id)
            ORDER BY s.name, s.id
            "#
        )
        .bind(template.event_id)
        .bind(template.role.as_deref())
        .bind(template.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(stakeholders)
    }

    /// Count stakeholders the template applies to
    pub async fn count_candidates(&self, template: &CertificateTemplate) -> Result<i64, CampusEventsError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM stakeholders WHERE event_id = $1 AND ($2::TEXT IS NULL OR role = $2)"
        )
        .bind(template.event_id)
        .bind(template.role.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    /// Issue a certificate; `None` when the stakeholder already holds one from this template.
    /// `render` receives the allocated serial so it can appear on the certificate.
    pub async fn issue<F>(
        &self,
        template: &CertificateTemplate,
        stakeholder: &Stakeholder,
        now: DateTime<Utc>,
        render: F,
    ) -> Result<Option<Certificate>, CampusEventsError>
    where
        F: Fn(&str) -> RenderedCertificate,
    {
        for _ in 0..SERIAL_ATTEMPTS {
            let serial = generate_serial(now);
            let rendered = render(&serial);
            let certificate = sqlx::query_as::<_, Certificate>(&format!(
                r#"
                INSERT INTO certificates (template_id, stakeholder_id, event_id, serial, recipient_name, recipient_email, role, rendered, issued_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT DO NOTHING
                RETURNING {CERTIFICATE_COLUMNS}
                "#
            ))
            .bind(template.id)
            .bind(stakeholder.id)
            .bind(template.event_id)
            .bind(&serial)
            .bind(&stakeholder.name)
            .bind(&stakeholder.email)
            .bind(&stakeholder.role)
            .bind(Json(rendered))
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

            if certificate.is_some() {
                return Ok(certificate);
            }

            let exists: (bool,) = sqlx::query_as(
                "SELECT EXISTS (SELECT 1 FROM certificates WHERE template_id = $1 AND stakeholder_id = $2)"
            )
            .bind(template.id)
            .bind(stakeholder.id)
            .fetch_one(&self.pool)
            .await?;

            if exists.0 {
                return Ok(None);
            }
            tracing::warn!(template_id = template.id, serial = %serial, "Certificate serial collision, regenerating");
        }

        Err(CampusEventsError::ServiceUnavailable(
            "Could not allocate a unique certificate serial".to_string(),
        ))
    }

    /// Certificates issued for an event
    pub async fn list_for_event(&self, event_id: i64) -> Result<Vec<Certificate>, CampusEventsError> {
        let certificates = sqlx::query_as::<_, Certificate>(&format!(
            "SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE event_id = $1 ORDER BY recipient_name, id"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(certificates)
    }

    /// Certificates issued to an email address
    pub async fn list_for_email(&self, email: &str) -> Result<Vec<Certificate>, CampusEventsError> {
        let certificates = sqlx::query_as::<_, Certificate>(&format!(
            "SELECT {CERTIFICATE_COLUMNS} FROM certificates WHERE recipient_email = $1 ORDER BY issued_at DESC"
        ))
        .bind(email.to_lowercase())
        .fetch_all(&self.pool)
        .await?;

        Ok(certificates)
    }

    /// Public lookup by serial
    pub async fn verify(&self, serial: &str) -> Result<Option<CertificateVerification>, CampusEventsError> {
        let verification = sqlx::query_as::<_, CertificateVerification>(
            r#"
            SELECT c.serial, c.recipient_name, c.role, e.title AS event_title, e.starts_at AS event_starts_at, c.issued_at
            FROM certificates c
            INNER JOIN events e ON e.id = c.event_id
            WHERE c.serial = $1
            "#
        )
        .bind(serial)
        .fetch_optional(&self.pool)
        .await?;

        Ok(verification)
    }
}
