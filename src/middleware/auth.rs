//! Authentication extractors
//!
//! Handlers take `AuthUser` when a signed-in user is required and
//! `OptionalAuthUser` on public endpoints that render differently for
//! managers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use tracing::debug;
use crate::models::User;
use crate::utils::errors::{CampusEventsError, Result};
use crate::AppState;

/// The authenticated caller
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// The caller if a bearer token was sent
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<User>);

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Verify the token and load (or create) the matching user
async fn resolve_user(state: &AppState, token: &str) -> Result<User> {
    let auth = &state.services.auth_service;
    let claims = auth.verify_token(token)?;
    let user = state.db.users.upsert(auth.upsert_request(&claims)).await?;
    debug!(user_id = user.id, role = %user.role, "Request authenticated");
    Ok(user)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = CampusEventsError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| CampusEventsError::Authentication("Missing bearer token".to_string()))?;
        Ok(AuthUser(resolve_user(state, token).await?))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for OptionalAuthUser {
    type Rejection = CampusEventsError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match bearer_token(&parts.headers) {
            Some(token) => Ok(OptionalAuthUser(Some(resolve_user(state, token).await?))),
            None => Ok(OptionalAuthUser(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("bearer   abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic dXNlcg==")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
