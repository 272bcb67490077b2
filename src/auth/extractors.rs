use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    auth::{jwt::JwtKeys, repo_types::Role},
    error::ApiError,
    state::AppState,
};

/// Identity taken from a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::MissingCredentials)?;

        let claims = JwtKeys::from_ref(state).verify(token).map_err(|e| {
            debug!(reason = %e, "session rejected");
            ApiError::InvalidSession
        })?;

        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
        })
    }
}

/// An [`AuthUser`] whose stored role is currently `Admin`.
///
/// The role is read from storage on every request, so demotions apply
/// to sessions that are already open.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        match state.users.find_by_id(user.id).await? {
            Some(u) if u.role == Role::Admin => Ok(AdminUser(user)),
            _ => {
                warn!(user_id = %user.id, email = %user.email, "admin route refused");
                Err(ApiError::Forbidden)
            }
        }
    }
}
