//! Bearer-token extractors. The token carries the user id; the account row
//! is loaded on every request so revoked or declined accounts lose access
//! immediately.

use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use db::models::user::{User, UserRole};

use crate::{AppState, error::ApiError};

/// Any signed-in staff member.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// A signed-in staff member with the administrative role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty() && *token != "null")
        .ok_or(ApiError::Unauthorized)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state
            .token_keys
            .verify(token)
            .map_err(|_| ApiError::Unauthorized)?;
        let user = User::find_by_id(&state.db.pool, claims.sub)
            .await?
            .ok_or(ApiError::Unauthorized)?;
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if user.role != UserRole::Admin {
            return Err(ApiError::AdminRequired);
        }
        Ok(Self(user))
    }
}
