//! Meeting endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use easyvol_core::{Action, Module};

use crate::db::repos::{Meeting, MeetingAttachment, MeetingInput, MeetingRepo, Participant};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::models::{Attendance, Paginated, Pagination, PaginationParams, ValidationError};
use crate::state::AppState;

use super::log_activity;

#[derive(Deserialize)]
pub struct MeetingPayload {
    pub title: String,
    pub meeting_type: Option<String>,
    pub meeting_date: DateTime<Utc>,
    pub location: Option<String>,
    pub agenda: Option<String>,
    pub minutes: Option<String>,
}

impl MeetingPayload {
    fn validate(self) -> Result<MeetingInput, ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::Validation(ValidationError::Empty {
                field: "title",
            }));
        }
        Ok(MeetingInput {
            title: self.title.trim().to_owned(),
            meeting_type: self.meeting_type,
            meeting_date: self.meeting_date,
            location: self.location,
            agenda: self.agenda,
            minutes: self.minutes,
        })
    }
}

#[derive(Deserialize)]
pub struct ParticipantPayload {
    pub member_id: Uuid,
    pub role: Option<String>,
    pub attendance: String,
}

#[derive(Deserialize)]
pub struct BulkAttendancePayload {
    pub member_ids: Vec<Uuid>,
    pub attendance: String,
}

#[derive(Deserialize)]
pub struct AttachmentPayload {
    pub title: String,
    pub file_path: String,
}

async fn list_meetings(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paginated<Meeting>>, ApiError> {
    user.require(Module::Meetings, Action::View)?;
    let page = MeetingRepo::new(&state.pool)
        .list(Pagination::from(params))
        .await?;
    Ok(Json(page))
}

async fn get_meeting(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Meeting>, ApiError> {
    user.require(Module::Meetings, Action::View)?;
    let meeting = MeetingRepo::new(&state.pool).get(id).await?;
    Ok(Json(meeting))
}

async fn create_meeting(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<MeetingPayload>,
) -> Result<(StatusCode, Json<Meeting>), ApiError> {
    user.require(Module::Meetings, Action::Create)?;
    let input = payload.validate()?;
    let meeting = MeetingRepo::new(&state.pool).create(&input).await?;

    log_activity(
        &state,
        user.id,
        "meetings",
        "create",
        Some(meeting.id),
        &format!("created meeting '{}'", meeting.title),
    )
    .await;
    Ok((StatusCode::CREATED, Json(meeting)))
}

async fn update_meeting(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<MeetingPayload>,
) -> Result<Json<Meeting>, ApiError> {
    user.require(Module::Meetings, Action::Edit)?;
    let input = payload.validate()?;
    let meeting = MeetingRepo::new(&state.pool).update(id, &input).await?;

    log_activity(
        &state,
        user.id,
        "meetings",
        "edit",
        Some(id),
        &format!("updated meeting '{}'", meeting.title),
    )
    .await;
    Ok(Json(meeting))
}

async fn delete_meeting(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::Meetings, Action::Delete)?;
    MeetingRepo::new(&state.pool).delete(id).await?;

    log_activity(&state, user.id, "meetings", "delete", Some(id), "deleted meeting").await;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_participants(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Participant>>, ApiError> {
    user.require(Module::Meetings, Action::View)?;
    let participants = MeetingRepo::new(&state.pool).participants(id).await?;
    Ok(Json(participants))
}

/// PUT /meetings/{id}/participants - register or update one participant
async fn set_participant(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ParticipantPayload>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::Meetings, Action::Edit)?;
    let attendance: Attendance = payload.attendance.parse()?;
    MeetingRepo::new(&state.pool)
        .set_participant(id, payload.member_id, payload.role.as_deref(), attendance)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /meetings/{id}/attendance - one attendance value for many members
async fn bulk_attendance(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<BulkAttendancePayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    user.require(Module::Meetings, Action::Edit)?;
    let attendance: Attendance = payload.attendance.parse()?;
    let updated = MeetingRepo::new(&state.pool)
        .bulk_attendance(id, &payload.member_ids, attendance)
        .await?;

    log_activity(
        &state,
        user.id,
        "meetings",
        "edit",
        Some(id),
        &format!("marked {} participants {}", updated, attendance),
    )
    .await;
    Ok(Json(serde_json::json!({ "updated": updated })))
}

async fn list_attachments(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MeetingAttachment>>, ApiError> {
    user.require(Module::Meetings, Action::View)?;
    let attachments = MeetingRepo::new(&state.pool).attachments(id).await?;
    Ok(Json(attachments))
}

async fn add_attachment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AttachmentPayload>,
) -> Result<(StatusCode, Json<MeetingAttachment>), ApiError> {
    user.require(Module::Meetings, Action::Edit)?;
    let attachment = MeetingRepo::new(&state.pool)
        .add_attachment(id, &payload.title, &payload.file_path)
        .await?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/meetings", get(list_meetings).post(create_meeting))
        .route(
            "/meetings/{id}",
            get(get_meeting).put(update_meeting).delete(delete_meeting),
        )
        .route(
            "/meetings/{id}/participants",
            get(list_participants).put(set_participant),
        )
        .route("/meetings/{id}/attendance", post(bulk_attendance))
        .route(
            "/meetings/{id}/attachments",
            get(list_attachments).post(add_attachment),
        )
}
