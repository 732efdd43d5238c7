//! Stakeholder model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use crate::utils::errors::{CampusEventsError, Result};
use crate::utils::helpers::is_valid_email;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Stakeholder {
    pub id: i64,
    pub event_id: i64,
    pub user_id: Option<i64>,
    pub name: String,
    pub email: String,
    pub role: String,
    pub organization: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Stakeholder {
    pub fn role(&self) -> StakeholderRole {
        self.role.parse().unwrap_or(StakeholderRole::Attendee)
    }
}

text_enum! {
    /// Participant role within one event
    StakeholderRole {
        Attendee => "attendee",
        Speaker => "speaker",
        Volunteer => "volunteer",
        Organizer => "organizer",
        Sponsor => "sponsor",
    }
}

impl StakeholderRole {
    /// Roles allowed to check tickets in at the door
    pub fn can_scan_tickets(&self) -> bool {
        matches!(self, StakeholderRole::Organizer | StakeholderRole::Volunteer)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StakeholderQuery {
    pub role: Option<StakeholderRole>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStakeholderRequest {
    pub name: String,
    pub email: String,
    pub role: StakeholderRole,
    pub organization: Option<String>,
    pub user_id: Option<i64>,
}

impl CreateStakeholderRequest {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CampusEventsError::InvalidInput("Stakeholder name is required".to_string()));
        }
        if !is_valid_email(self.email.trim()) {
            return Err(CampusEventsError::InvalidInput(format!("Invalid email: {}", self.email)));
        }
        Ok(())
    }

    /// Trimmed copy with a lowercased email
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            role: self.role,
            organization: self
                .organization
                .as_deref()
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string),
            user_id: self.user_id,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStakeholderRequest {
    pub name: Option<String>,
    pub role: Option<StakeholderRole>,
    pub organization: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStakeholdersRequest {
    pub stakeholders: Vec<CreateStakeholderRequest>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportResult {
    pub created: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}
