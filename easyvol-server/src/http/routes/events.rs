//! Event endpoints: emergencies, drills, activities
//!
//! Each event carries a member roster (role + hours) and the vehicles
//! deployed for it.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use easyvol_core::{Action, Module};

use crate::db::repos::{Event, EventFilter, EventInput, EventParticipant, EventRepo, EventVehicle};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::models::{
    EventStatus, EventType, Paginated, Pagination, PaginationParams, ValidationError,
};
use crate::state::AppState;

use super::log_activity;

#[derive(Deserialize)]
pub struct ListParams {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    #[serde(flatten)]
    pub page: PaginationParams,
}

#[derive(Deserialize)]
pub struct EventPayload {
    pub event_type: String,
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "aperto".to_owned()
}

impl EventPayload {
    fn validate(self) -> Result<EventInput, ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::Validation(ValidationError::Empty {
                field: "title",
            }));
        }
        let event_type: EventType = self.event_type.parse()?;
        let status: EventStatus = self.status.parse()?;
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(ApiError::Validation(ValidationError::OutOfRange {
                    field: "end_date",
                    reason: "must not precede the start date",
                }));
            }
        }
        Ok(EventInput {
            event_type: event_type.as_str().to_owned(),
            title: self.title.trim().to_owned(),
            description: self.description,
            start_date: self.start_date,
            end_date: self.end_date,
            location: self.location,
            status: status.as_str().to_owned(),
        })
    }
}

#[derive(Deserialize)]
pub struct ParticipantPayload {
    pub member_id: Uuid,
    pub role: Option<String>,
    #[serde(default)]
    pub hours: f64,
}

#[derive(Deserialize)]
pub struct VehiclesPayload {
    pub vehicles: Vec<VehicleEntry>,
}

#[derive(Deserialize)]
pub struct VehicleEntry {
    pub vehicle_id: Uuid,
    pub notes: Option<String>,
}

async fn list_events(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<Event>>, ApiError> {
    user.require(Module::Events, Action::View)?;

    if let Some(event_type) = &params.event_type {
        event_type.parse::<EventType>()?;
    }
    if let Some(status) = &params.status {
        status.parse::<EventStatus>()?;
    }
    let filter = EventFilter {
        event_type: params.event_type,
        status: params.status,
        search: params.search,
    };
    let page = EventRepo::new(&state.pool)
        .list(&filter, Pagination::from(params.page))
        .await?;
    Ok(Json(page))
}

async fn get_event(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Event>, ApiError> {
    user.require(Module::Events, Action::View)?;
    let event = EventRepo::new(&state.pool).get(id).await?;
    Ok(Json(event))
}

async fn create_event(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<EventPayload>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    user.require(Module::Events, Action::Create)?;
    let input = payload.validate()?;
    let event = EventRepo::new(&state.pool).create(&input, user.id).await?;

    log_activity(
        &state,
        user.id,
        "events",
        "create",
        Some(event.id),
        &format!("created event '{}'", event.title),
    )
    .await;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn update_event(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<EventPayload>,
) -> Result<Json<Event>, ApiError> {
    user.require(Module::Events, Action::Edit)?;
    let input = payload.validate()?;
    let event = EventRepo::new(&state.pool).update(id, &input).await?;

    log_activity(
        &state,
        user.id,
        "events",
        "edit",
        Some(id),
        &format!("updated event '{}'", event.title),
    )
    .await;
    Ok(Json(event))
}

async fn delete_event(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::Events, Action::Delete)?;
    EventRepo::new(&state.pool).delete(id).await?;

    log_activity(&state, user.id, "events", "delete", Some(id), "deleted event").await;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_participants(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<EventParticipant>>, ApiError> {
    user.require(Module::Events, Action::View)?;
    let participants = EventRepo::new(&state.pool).participants(id).await?;
    Ok(Json(participants))
}

/// PUT /events/{id}/participants - register or update one roster entry
async fn set_participant(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ParticipantPayload>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::Events, Action::Edit)?;
    if payload.hours < 0.0 {
        return Err(ApiError::Validation(ValidationError::OutOfRange {
            field: "hours",
            reason: "must not be negative",
        }));
    }
    EventRepo::new(&state.pool)
        .set_participant(id, payload.member_id, payload.role.as_deref(), payload.hours)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_participant(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::Events, Action::Edit)?;
    EventRepo::new(&state.pool)
        .remove_participant(id, member_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_vehicles(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<EventVehicle>>, ApiError> {
    user.require(Module::Events, Action::View)?;
    let vehicles = EventRepo::new(&state.pool).vehicles(id).await?;
    Ok(Json(vehicles))
}

/// PUT /events/{id}/vehicles - replace the whole deployment list
async fn replace_vehicles(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<VehiclesPayload>,
) -> Result<Json<Vec<EventVehicle>>, ApiError> {
    user.require(Module::Events, Action::Edit)?;
    let entries: Vec<(Uuid, Option<String>)> = payload
        .vehicles
        .into_iter()
        .map(|v| (v.vehicle_id, v.notes))
        .collect();
    let vehicles = EventRepo::new(&state.pool)
        .replace_vehicles(id, &entries)
        .await?;

    log_activity(
        &state,
        user.id,
        "events",
        "edit",
        Some(id),
        "replaced event vehicle list",
    )
    .await;
    Ok(Json(vehicles))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route(
            "/events/{id}/participants",
            get(list_participants).put(set_participant),
        )
        .route(
            "/events/{id}/participants/{member_id}",
            delete(remove_participant),
        )
        .route(
            "/events/{id}/vehicles",
            get(list_vehicles).put(replace_vehicles),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_is_validated() {
        let payload = EventPayload {
            event_type: "sagra".into(),
            title: "Festa".into(),
            description: None,
            start_date: Utc::now(),
            end_date: None,
            location: None,
            status: "aperto".into(),
        };
        assert!(matches!(payload.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn end_date_must_follow_start() {
        let start = Utc::now();
        let payload = EventPayload {
            event_type: "esercitazione".into(),
            title: "Prova evacuazione".into(),
            description: None,
            start_date: start,
            end_date: Some(start - chrono::Duration::hours(2)),
            location: None,
            status: "aperto".into(),
        };
        assert!(matches!(payload.validate(), Err(ApiError::Validation(_))));
    }
}
