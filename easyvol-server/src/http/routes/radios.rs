//! Radio fleet endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use easyvol_core::{Action, Module};

use crate::db::repos::{Radio, RadioAssignment, RadioInput, RadioRepo};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::models::{ItemCode, Paginated, Pagination, PaginationParams, RadioStatus};
use crate::state::AppState;

use super::log_activity;

#[derive(Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    #[serde(flatten)]
    pub page: PaginationParams,
}

#[derive(Deserialize)]
pub struct RadioPayload {
    pub code: String,
    pub serial: Option<String>,
    pub model: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    pub notes: Option<String>,
}

fn default_status() -> String {
    "disponibile".to_owned()
}

impl RadioPayload {
    fn validate(self) -> Result<RadioInput, ApiError> {
        let code = ItemCode::new(&self.code)?;
        let status: RadioStatus = self.status.parse()?;
        Ok(RadioInput {
            code: code.as_str().to_owned(),
            serial: self.serial,
            model: self.model,
            status: status.as_str().to_owned(),
            notes: self.notes,
        })
    }
}

#[derive(Deserialize)]
pub struct AssignPayload {
    pub member_id: Uuid,
    pub notes: Option<String>,
}

async fn list_radios(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<Radio>>, ApiError> {
    user.require(Module::Radios, Action::View)?;

    if let Some(status) = &params.status {
        status.parse::<RadioStatus>()?;
    }
    let page = RadioRepo::new(&state.pool)
        .list(params.status.as_deref(), Pagination::from(params.page))
        .await?;
    Ok(Json(page))
}

async fn get_radio(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Radio>, ApiError> {
    user.require(Module::Radios, Action::View)?;
    let radio = RadioRepo::new(&state.pool).get(id).await?;
    Ok(Json(radio))
}

async fn create_radio(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<RadioPayload>,
) -> Result<(StatusCode, Json<Radio>), ApiError> {
    user.require(Module::Radios, Action::Create)?;
    let input = payload.validate()?;
    let radio = RadioRepo::new(&state.pool).create(&input).await?;

    log_activity(
        &state,
        user.id,
        "radios",
        "create",
        Some(radio.id),
        &format!("created radio {}", radio.code),
    )
    .await;
    Ok((StatusCode::CREATED, Json(radio)))
}

async fn update_radio(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RadioPayload>,
) -> Result<Json<Radio>, ApiError> {
    user.require(Module::Radios, Action::Edit)?;
    let input = payload.validate()?;
    let radio = RadioRepo::new(&state.pool).update(id, &input).await?;

    log_activity(
        &state,
        user.id,
        "radios",
        "edit",
        Some(id),
        &format!("updated radio {}", radio.code),
    )
    .await;
    Ok(Json(radio))
}

async fn delete_radio(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::Radios, Action::Delete)?;
    RadioRepo::new(&state.pool).delete(id).await?;

    log_activity(&state, user.id, "radios", "delete", Some(id), "deleted radio").await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /radios/{id}/assign - 409 when the radio is not disponibile
async fn assign_radio(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignPayload>,
) -> Result<(StatusCode, Json<RadioAssignment>), ApiError> {
    user.require(Module::Radios, Action::Edit)?;
    let assignment = RadioRepo::new(&state.pool)
        .assign(id, payload.member_id, payload.notes.as_deref())
        .await?;

    log_activity(
        &state,
        user.id,
        "radios",
        "edit",
        Some(id),
        &format!("assigned radio to member {}", payload.member_id),
    )
    .await;
    Ok((StatusCode::CREATED, Json(assignment)))
}

/// POST /radios/{id}/return - closes the open assignment
async fn return_radio(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<RadioAssignment>, ApiError> {
    user.require(Module::Radios, Action::Edit)?;
    let assignment = RadioRepo::new(&state.pool).return_radio(id).await?;

    log_activity(&state, user.id, "radios", "edit", Some(id), "radio returned").await;
    Ok(Json(assignment))
}

async fn assignment_history(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paginated<RadioAssignment>>, ApiError> {
    user.require(Module::Radios, Action::View)?;
    let page = RadioRepo::new(&state.pool)
        .history(id, Pagination::from(params))
        .await?;
    Ok(Json(page))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/radios", get(list_radios).post(create_radio))
        .route(
            "/radios/{id}",
            get(get_radio).put(update_radio).delete(delete_radio),
        )
        .route("/radios/{id}/assign", post(assign_radio))
        .route("/radios/{id}/return", post(return_radio))
        .route("/radios/{id}/assignments", get(assignment_history))
}
