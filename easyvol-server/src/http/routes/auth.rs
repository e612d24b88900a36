//! Login/logout endpoints

use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{password, SessionRepo};
use crate::db::repos::UserRepo;
use crate::http::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: Uuid,
    pub expires_at: String,
    pub user: LoginUser,
}

#[derive(Serialize)]
pub struct LoginUser {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
}

/// POST /auth/login
///
/// Unknown user, wrong password and deactivated account all produce the
/// same 401.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = UserRepo::new(&state.pool)
        .find_by_username(&req.username)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !user.active
        || !password::verify_password(&user.password_salt, &req.password, &user.password_hash)
    {
        return Err(ApiError::Unauthorized);
    }

    let session = SessionRepo::new(&state.pool).create(user.id).await?;
    tracing::info!(username = %user.username, "login");

    Ok(Json(LoginResponse {
        token: session.token,
        expires_at: session.expires_at.to_rfc3339(),
        user: LoginUser {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
        },
    }))
}

/// POST /auth/logout - deletes the presented session; idempotent.
async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .and_then(|t| Uuid::parse_str(t.trim()).ok())
        .ok_or(ApiError::Unauthorized)?;

    SessionRepo::new(&state.pool).delete(token).await?;
    Ok(Json(serde_json::json!({ "logged_out": true })))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}
