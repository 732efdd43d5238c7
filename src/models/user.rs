//! User model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub auth_subject: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub department: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Parsed role, unknown values fall back to student
    pub fn role(&self) -> UserRole {
        self.role.parse().unwrap_or(UserRole::Student)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == UserRole::Admin
    }
}

text_enum! {
    /// Global account role
    UserRole {
        Student => "student",
        Organizer => "organizer",
        Admin => "admin",
    }
}

/// Identity taken from a verified bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertUserRequest {
    pub auth_subject: String,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub department: Option<String>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> crate::utils::errors::Result<()> {
        if let Some(ref name) = self.full_name {
            let name = name.trim();
            if name.is_empty() || name.chars().count() > 120 {
                return Err(crate::utils::errors::CampusEventsError::InvalidInput(
                    "Name must be between 1 and 120 characters".to_string(),
                ));
            }
        }
        if matches!(self.department, Some(ref d) if d.chars().count() > 120) {
            return Err(crate::utils::errors::CampusEventsError::InvalidInput(
                "Department must be at most 120 characters".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_validation() {
        let blank = UpdateUserRequest { full_name: Some("   ".into()), department: None };
        assert!(blank.validate().is_err());
        let ok = UpdateUserRequest { full_name: Some("Ada Lovelace".into()), department: Some("CS".into()) };
        assert!(ok.validate().is_ok());
        let empty = UpdateUserRequest { full_name: None, department: None };
        assert!(empty.validate().is_ok());
    }

    #[test]
    fn test_role_round_trips_through_text() {
        for role in UserRole::ALL {
            assert_eq!(role.as_str().parse::<UserRole>().unwrap(), *role);
        }
        assert!("superuser".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_unknown_stored_role_is_student() {
        let now = Utc::now();
        let user = User {
            id: 1,
            auth_subject: "sub".into(),
            email: "a@b.edu".into(),
            full_name: "A".into(),
            role: "wizard".into(),
            department: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(user.role(), UserRole::Student);
        assert!(!user.is_admin());
    }
}
