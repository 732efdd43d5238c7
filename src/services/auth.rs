//! Authentication service implementation
//!
//! This service verifies bearer tokens issued by the campus identity provider,
//! resolves roles from configuration and answers permission questions for
//! events and administration.

use std::collections::HashSet;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use jsonwebtoken::errors::ErrorKind;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use crate::config::settings::AuthConfig;
use crate::models::{Event, StakeholderRole, UpsertUserRequest, User, UserRole};
use crate::utils::errors::{CampusEventsError, Result};

/// Permission levels for different operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ViewEvents,
    BuyTickets,
    CreateEvents,
    ManageAllEvents,
    ManageUsers,
}

/// Claims carried by a bearer token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Authentication context for a user
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub role: UserRole,
    pub permissions: HashSet<Permission>,
}

impl AuthContext {
    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

/// Authentication service for token verification and access control
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("issuer", &self.config.jwt_issuer)
            .field("admin_emails", &self.config.admin_emails.len())
            .finish()
    }
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(config: AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        Self { config, encoding_key, decoding_key }
    }

    /// Check if an email is configured as administrator
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.config
            .admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email))
    }

    /// Issue a signed token for a subject
    pub fn issue_token(&self, subject: &str, email: &str, name: &str) -> Result<String> {
        let claims = Claims {
            sub: subject.to_string(),
            email: email.to_lowercase(),
            name: name.to_string(),
            exp: Utc::now().timestamp() + self.config.token_ttl_seconds,
            iss: Some(self.config.jwt_issuer.clone()),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    /// Verify a bearer token and return its claims
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "Token expired",
                ErrorKind::InvalidIssuer => "Token issuer not accepted",
                ErrorKind::InvalidSignature => "Token signature invalid",
                _ => "Malformed token",
            };
            debug!(error = %e, "Bearer token rejected");
            CampusEventsError::Authentication(reason.to_string())
        })?;

        let claims = data.claims;
        if claims.sub.trim().is_empty() || claims.email.trim().is_empty() {
            return Err(CampusEventsError::Authentication("Token lacks subject or email".to_string()));
        }
        Ok(claims)
    }

    /// Identity upsert derived from verified claims
    pub fn upsert_request(&self, claims: &Claims) -> UpsertUserRequest {
        let role = if self.is_admin_email(&claims.email) {
            UserRole::Admin
        } else {
            UserRole::Student
        };
        let full_name = if claims.name.trim().is_empty() {
            claims.email.split('@').next().unwrap_or_default().to_string()
        } else {
            claims.name.trim().to_string()
        };

        UpsertUserRequest {
            auth_subject: claims.sub.clone(),
            email: claims.email.to_lowercase(),
            full_name,
            role,
        }
    }

    /// Permissions granted to a global role
    pub fn permissions_for(role: UserRole) -> HashSet<Permission> {
        let mut permissions = HashSet::from([Permission::ViewEvents, Permission::BuyTickets]);
        match role {
            UserRole::Student => {}
            UserRole::Organizer => {
                permissions.insert(Permission::CreateEvents);
            }
            UserRole::Admin => {
                permissions.insert(Permission::CreateEvents);
                permissions.insert(Permission::ManageAllEvents);
                permissions.insert(Permission::ManageUsers);
            }
        }
        permissions
    }

    /// Get authentication context for a user
    pub fn auth_context(&self, user: &User) -> AuthContext {
        let role = user.role();
        AuthContext {
            user_id: user.id,
            role,
            permissions: Self::permissions_for(role),
        }
    }

    /// Require specific permission or return error
    pub fn require_permission(&self, user: &User, required: Permission) -> Result<AuthContext> {
        let context = self.auth_context(user);
        if !context.has(required) {
            warn!(user_id = user.id, permission = ?required, "Permission denied");
            return Err(CampusEventsError::PermissionDenied(format!(
                "User {} lacks required permission: {:?}",
                user.id, required
            )));
        }
        Ok(context)
    }

    /// Admins manage every event, organizers their own
    pub fn can_manage_event(user: &User, event: &Event) -> bool {
        user.is_admin() || event.organizer_id == user.id
    }

    /// Require event management rights
    pub fn require_event_manager(user: &User, event: &Event) -> Result<()> {
        if Self::can_manage_event(user, event) {
            Ok(())
        } else {
            Err(CampusEventsError::PermissionDenied(format!(
                "User {} cannot manage event {}",
                user.id, event.id
            )))
        }
    }

    /// Managers and organizer or volunteer stakeholders may scan tickets
    pub fn can_scan(user: &User, event: &Event, stakeholder_roles: &[StakeholderRole]) -> bool {
        Self::can_manage_event(user, event) || stakeholder_roles.iter().any(|r| r.can_scan_tickets())
    }

    /// Log authentication event
    pub fn log_auth_event(&self, user_id: i64, action: &str, success: bool, details: Option<&str>) {
        if success {
            info!(user_id = user_id, action = action, details = details, "Authentication event: success");
        } else {
            warn!(user_id = user_id, action = action, details = details, "Authentication event: failure");
        }
    }
}
