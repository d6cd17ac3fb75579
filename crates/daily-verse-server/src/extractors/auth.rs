//! Auth extractor for protected routes

use crate::error::ApiError;
use crate::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use verse_core::User;

/// Authenticated user, resolved from `Authorization: Bearer <token>`
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user: User,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization format"))?;

        let user = state.auth_service.authenticate(token).await?;

        Ok(AuthUser {
            user,
            token: token.to_string(),
        })
    }
}
