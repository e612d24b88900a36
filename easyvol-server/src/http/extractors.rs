//! Custom Axum extractors

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::auth::{AuthenticatedUser, SessionRepo};
use crate::state::AppState;

use super::error::ApiError;

/// Resolve the caller from the `Authorization: Bearer <token>` header.
///
/// Any failure (missing header, malformed token, expired session,
/// deactivated user) is a plain 401 with no further detail.
pub struct CurrentUser(pub AuthenticatedUser);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = header
            .strip_prefix("Bearer ")
            .and_then(|t| Uuid::parse_str(t.trim()).ok())
            .ok_or(ApiError::Unauthorized)?;

        let user = SessionRepo::new(&state.pool)
            .authenticate(token)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        Ok(Self(user))
    }
}
