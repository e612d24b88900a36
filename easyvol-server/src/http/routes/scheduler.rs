//! Deadline scheduler endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use easyvol_core::{Action, Module};

use crate::db::repos::{
    SchedulerCounts, SchedulerFilter, SchedulerItem, SchedulerItemInput, SchedulerRepo,
};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::models::{
    Paginated, Pagination, PaginationParams, SchedulerStatus, ValidationError,
};
use crate::state::AppState;

use super::log_activity;

#[derive(Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub category: Option<String>,
    #[serde(flatten)]
    pub page: PaginationParams,
}

#[derive(Deserialize)]
pub struct ItemPayload {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub due_date: NaiveDate,
    pub assigned_to: Option<Uuid>,
    #[serde(default = "default_reminder_days")]
    pub reminder_days: i32,
}

fn default_reminder_days() -> i32 {
    7
}

impl ItemPayload {
    fn validate(self) -> Result<SchedulerItemInput, ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::Validation(ValidationError::Empty {
                field: "title",
            }));
        }
        if self.reminder_days < 0 {
            return Err(ApiError::Validation(ValidationError::OutOfRange {
                field: "reminder days",
                reason: "must not be negative",
            }));
        }
        Ok(SchedulerItemInput {
            title: self.title.trim().to_owned(),
            description: self.description,
            category: self.category,
            due_date: self.due_date,
            assigned_to: self.assigned_to,
            reminder_days: self.reminder_days,
        })
    }
}

#[derive(Deserialize)]
pub struct UpcomingParams {
    pub days: Option<i32>,
}

async fn list_items(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<SchedulerItem>>, ApiError> {
    user.require(Module::Scheduler, Action::View)?;

    let status = match &params.status {
        Some(raw) => Some(raw.parse::<SchedulerStatus>()?),
        None => None,
    };
    let filter = SchedulerFilter {
        status,
        category: params.category,
    };
    let page = SchedulerRepo::new(&state.pool)
        .list(&filter, Pagination::from(params.page))
        .await?;
    Ok(Json(page))
}

async fn get_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SchedulerItem>, ApiError> {
    user.require(Module::Scheduler, Action::View)?;
    let item = SchedulerRepo::new(&state.pool).get(id).await?;
    Ok(Json(item))
}

async fn create_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<ItemPayload>,
) -> Result<(StatusCode, Json<SchedulerItem>), ApiError> {
    user.require(Module::Scheduler, Action::Create)?;
    let input = payload.validate()?;
    let item = SchedulerRepo::new(&state.pool).create(&input, user.id).await?;

    log_activity(
        &state,
        user.id,
        "scheduler",
        "create",
        Some(item.id),
        &format!("created deadline '{}'", item.title),
    )
    .await;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ItemPayload>,
) -> Result<Json<SchedulerItem>, ApiError> {
    user.require(Module::Scheduler, Action::Edit)?;
    let input = payload.validate()?;
    let item = SchedulerRepo::new(&state.pool).update(id, &input).await?;

    log_activity(
        &state,
        user.id,
        "scheduler",
        "edit",
        Some(id),
        &format!("updated deadline '{}'", item.title),
    )
    .await;
    Ok(Json(item))
}

async fn delete_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::Scheduler, Action::Delete)?;
    SchedulerRepo::new(&state.pool).delete(id).await?;

    log_activity(&state, user.id, "scheduler", "delete", Some(id), "deleted deadline").await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /scheduler/{id}/complete - idempotent
async fn complete_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SchedulerItem>, ApiError> {
    user.require(Module::Scheduler, Action::Edit)?;
    let item = SchedulerRepo::new(&state.pool).complete(id, user.id).await?;

    log_activity(
        &state,
        user.id,
        "scheduler",
        "edit",
        Some(id),
        &format!("completed deadline '{}'", item.title),
    )
    .await;
    Ok(Json(item))
}

/// GET /scheduler/upcoming?days=N - open items inside the reminder window
async fn upcoming(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<UpcomingParams>,
) -> Result<Json<Vec<SchedulerItem>>, ApiError> {
    user.require(Module::Scheduler, Action::View)?;
    let items = SchedulerRepo::new(&state.pool).upcoming(params.days).await?;
    Ok(Json(items))
}

/// GET /scheduler/counts - dashboard counters
async fn counts(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<SchedulerCounts>, ApiError> {
    user.require(Module::Scheduler, Action::View)?;
    let counts = SchedulerRepo::new(&state.pool).counts().await?;
    Ok(Json(counts))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        // Static paths come before the {id} routes
        .route("/scheduler/upcoming", get(upcoming))
        .route("/scheduler/counts", get(counts))
        .route("/scheduler", get(list_items).post(create_item))
        .route(
            "/scheduler/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/scheduler/{id}/complete", post(complete_item))
}
