//! Training course endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use easyvol_core::{Action, Module};

use crate::db::repos::{TrainingAttendance, TrainingCourse, TrainingCourseInput, TrainingRepo};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::models::{Paginated, Pagination, PaginationParams, ValidationError};
use crate::state::AppState;

use super::log_activity;

#[derive(Deserialize)]
pub struct CoursePayload {
    pub title: String,
    pub course_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub instructor: Option<String>,
    pub notes: Option<String>,
}

impl CoursePayload {
    fn validate(self) -> Result<TrainingCourseInput, ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::Validation(ValidationError::Empty {
                field: "title",
            }));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(ApiError::Validation(ValidationError::OutOfRange {
                    field: "end date",
                    reason: "must not precede the start date",
                }));
            }
        }
        Ok(TrainingCourseInput {
            title: self.title.trim().to_owned(),
            course_type: self.course_type,
            start_date: self.start_date,
            end_date: self.end_date,
            location: self.location,
            instructor: self.instructor,
            notes: self.notes,
        })
    }
}

#[derive(Deserialize)]
pub struct AttendancePayload {
    pub member_id: Uuid,
    pub status: String,
    #[serde(default)]
    pub hours: f64,
}

async fn list_courses(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paginated<TrainingCourse>>, ApiError> {
    user.require(Module::Training, Action::View)?;
    let page = TrainingRepo::new(&state.pool)
        .list(Pagination::from(params))
        .await?;
    Ok(Json(page))
}

async fn get_course(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TrainingCourse>, ApiError> {
    user.require(Module::Training, Action::View)?;
    let course = TrainingRepo::new(&state.pool).get(id).await?;
    Ok(Json(course))
}

async fn create_course(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CoursePayload>,
) -> Result<(StatusCode, Json<TrainingCourse>), ApiError> {
    user.require(Module::Training, Action::Create)?;
    let input = payload.validate()?;
    let course = TrainingRepo::new(&state.pool).create(&input).await?;

    log_activity(
        &state,
        user.id,
        "training",
        "create",
        Some(course.id),
        &format!("created course '{}'", course.title),
    )
    .await;
    Ok((StatusCode::CREATED, Json(course)))
}

async fn update_course(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CoursePayload>,
) -> Result<Json<TrainingCourse>, ApiError> {
    user.require(Module::Training, Action::Edit)?;
    let input = payload.validate()?;
    let course = TrainingRepo::new(&state.pool).update(id, &input).await?;

    log_activity(
        &state,
        user.id,
        "training",
        "edit",
        Some(id),
        &format!("updated course '{}'", course.title),
    )
    .await;
    Ok(Json(course))
}

async fn delete_course(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::Training, Action::Delete)?;
    TrainingRepo::new(&state.pool).delete(id).await?;

    log_activity(&state, user.id, "training", "delete", Some(id), "deleted course").await;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_attendance(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TrainingAttendance>>, ApiError> {
    user.require(Module::Training, Action::View)?;
    let attendance = TrainingRepo::new(&state.pool).attendance(id).await?;
    Ok(Json(attendance))
}

/// PUT /training/{id}/attendance - upsert one member's status and hours
async fn set_attendance(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AttendancePayload>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::Training, Action::Edit)?;
    if payload.hours < 0.0 {
        return Err(ApiError::Validation(ValidationError::OutOfRange {
            field: "hours",
            reason: "must not be negative",
        }));
    }
    TrainingRepo::new(&state.pool)
        .set_attendance(id, payload.member_id, &payload.status, payload.hours)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/training", get(list_courses).post(create_course))
        .route(
            "/training/{id}",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route(
            "/training/{id}/attendance",
            get(list_attendance).put(set_attendance),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_before_start_is_rejected() {
        let payload = CoursePayload {
            title: "BLSD".into(),
            course_type: None,
            start_date: NaiveDate::from_ymd_opt(2026, 5, 10),
            end_date: NaiveDate::from_ymd_opt(2026, 5, 1),
            location: None,
            instructor: None,
            notes: None,
        };
        assert!(matches!(payload.validate(), Err(ApiError::Validation(_))));
    }
}
