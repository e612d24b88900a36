//! User, role and permission administration endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use easyvol_core::{Action, Module};

use crate::auth::password::{generate_salt, hash_password};
use crate::db::repos::{Role, User, UserInput, UserRepo};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::models::{Paginated, Pagination, PaginationParams, ValidationError};
use crate::state::AppState;

use super::log_activity;

#[derive(Deserialize)]
pub struct CreateUserPayload {
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub email: Option<String>,
    pub role_id: Option<Uuid>,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Deserialize)]
pub struct UpdateUserPayload {
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
    pub role_id: Option<Uuid>,
    pub active: bool,
}

#[derive(Deserialize)]
pub struct PasswordPayload {
    pub password: String,
}

#[derive(Deserialize)]
pub struct RolePayload {
    pub name: String,
}

/// One `{module, action}` grant on the wire.
#[derive(Deserialize)]
pub struct GrantPayload {
    pub module: String,
    pub action: String,
}

fn default_active() -> bool {
    true
}

fn check_username(username: &str) -> Result<String, ApiError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ApiError::Validation(ValidationError::Empty {
            field: "username",
        }));
    }
    Ok(username.to_owned())
}

fn check_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::Validation(ValidationError::OutOfRange {
            field: "password",
            reason: "must be at least 8 characters",
        }));
    }
    Ok(())
}

fn parse_grants(raw: &[GrantPayload]) -> Result<Vec<(Module, Action)>, ApiError> {
    let mut grants = Vec::with_capacity(raw.len());
    for grant in raw {
        let module: Module = grant.module.parse().map_err(|_| {
            ApiError::Validation(ValidationError::InvalidVariant {
                field: "module",
                value: grant.module.clone(),
            })
        })?;
        let action: Action = grant.action.parse().map_err(|_| {
            ApiError::Validation(ValidationError::InvalidVariant {
                field: "action",
                value: grant.action.clone(),
            })
        })?;
        grants.push((module, action));
    }
    Ok(grants)
}

fn grants_json(grants: Vec<(String, String)>) -> Json<Vec<serde_json::Value>> {
    Json(
        grants
            .into_iter()
            .map(|(module, action)| serde_json::json!({ "module": module, "action": action }))
            .collect(),
    )
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paginated<User>>, ApiError> {
    user.require(Module::Users, Action::View)?;
    let page = UserRepo::new(&state.pool)
        .list(Pagination::from(params))
        .await?;
    Ok(Json(page))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    user.require(Module::Users, Action::View)?;
    let found = UserRepo::new(&state.pool).get(id).await?;
    Ok(Json(found))
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateUserPayload>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    user.require(Module::Users, Action::Create)?;
    let username = check_username(&payload.username)?;
    check_password(&payload.password)?;

    let salt = generate_salt();
    let hash = hash_password(&salt, &payload.password);
    let input = UserInput {
        username,
        display_name: payload.display_name,
        email: payload.email,
        role_id: payload.role_id,
        active: payload.active,
    };
    let created = UserRepo::new(&state.pool).create(&input, &hash, &salt).await?;

    log_activity(
        &state,
        user.id,
        "users",
        "create",
        Some(created.id),
        &format!("created user '{}'", created.username),
    )
    .await;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<Json<User>, ApiError> {
    user.require(Module::Users, Action::Edit)?;
    let username = check_username(&payload.username)?;
    let input = UserInput {
        username,
        display_name: payload.display_name,
        email: payload.email,
        role_id: payload.role_id,
        active: payload.active,
    };
    let updated = UserRepo::new(&state.pool).update(id, &input).await?;

    log_activity(
        &state,
        user.id,
        "users",
        "edit",
        Some(id),
        &format!("updated user '{}'", updated.username),
    )
    .await;
    Ok(Json(updated))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::Users, Action::Delete)?;
    if id == user.id {
        return Err(ApiError::Conflict {
            message: "cannot delete the account you are logged in with".into(),
        });
    }
    UserRepo::new(&state.pool).delete(id).await?;

    log_activity(&state, user.id, "users", "delete", Some(id), "deleted user").await;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_password(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PasswordPayload>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::Users, Action::Edit)?;
    check_password(&payload.password)?;

    let salt = generate_salt();
    let hash = hash_password(&salt, &payload.password);
    UserRepo::new(&state.pool).set_password(id, &hash, &salt).await?;

    log_activity(&state, user.id, "users", "edit", Some(id), "changed password").await;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_user_permissions(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<serde_json::Value>>, ApiError> {
    user.require(Module::Users, Action::View)?;
    let repo = UserRepo::new(&state.pool);
    repo.get(id).await?;
    let grants = repo.user_grants(id).await?;
    Ok(grants_json(grants))
}

/// PUT /users/{id}/permissions - replace the user's direct grants.
/// Takes effect on the target's next request, no re-login needed.
async fn set_user_permissions(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<Vec<GrantPayload>>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::Users, Action::Edit)?;
    let grants = parse_grants(&payload)?;
    UserRepo::new(&state.pool)
        .replace_user_permissions(id, &grants)
        .await?;

    log_activity(
        &state,
        user.id,
        "users",
        "edit",
        Some(id),
        &format!("replaced user permissions ({} grants)", grants.len()),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_roles(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Role>>, ApiError> {
    user.require(Module::Users, Action::View)?;
    let roles = UserRepo::new(&state.pool).roles().await?;
    Ok(Json(roles))
}

async fn create_role(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<RolePayload>,
) -> Result<(StatusCode, Json<Role>), ApiError> {
    user.require(Module::Users, Action::Create)?;
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation(ValidationError::Empty {
            field: "name",
        }));
    }
    let role = UserRepo::new(&state.pool)
        .create_role(payload.name.trim())
        .await?;

    log_activity(
        &state,
        user.id,
        "users",
        "create",
        Some(role.id),
        &format!("created role '{}'", role.name),
    )
    .await;
    Ok((StatusCode::CREATED, Json(role)))
}

async fn delete_role(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::Users, Action::Delete)?;
    UserRepo::new(&state.pool).delete_role(id).await?;

    log_activity(&state, user.id, "users", "delete", Some(id), "deleted role").await;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_role_permissions(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<serde_json::Value>>, ApiError> {
    user.require(Module::Users, Action::View)?;
    let grants = UserRepo::new(&state.pool).role_grants(id).await?;
    Ok(grants_json(grants))
}

async fn set_role_permissions(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<Vec<GrantPayload>>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::Users, Action::Edit)?;
    let grants = parse_grants(&payload)?;
    UserRepo::new(&state.pool)
        .replace_role_permissions(id, &grants)
        .await?;

    log_activity(
        &state,
        user.id,
        "users",
        "edit",
        Some(id),
        &format!("replaced role permissions ({} grants)", grants.len()),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/{id}/password", put(set_password))
        .route(
            "/users/{id}/permissions",
            get(get_user_permissions).put(set_user_permissions),
        )
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/{id}", axum::routing::delete(delete_role))
        .route(
            "/roles/{id}/permissions",
            get(get_role_permissions).put(set_role_permissions),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_password_is_rejected() {
        assert!(check_password("breve").is_err());
        assert!(check_password("lunga abbastanza").is_ok());
    }

    #[test]
    fn unknown_grant_module_is_rejected() {
        let raw = vec![GrantPayload {
            module: "newsletter".into(),
            action: "view".into(),
        }];
        assert!(parse_grants(&raw).is_err());

        let raw = vec![GrantPayload {
            module: "members".into(),
            action: "export".into(),
        }];
        assert_eq!(parse_grants(&raw).unwrap(), vec![(Module::Members, Action::Export)]);
    }
}
