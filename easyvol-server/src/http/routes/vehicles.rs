//! Vehicle fleet endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use easyvol_core::{Action, Module};

use crate::db::repos::{Vehicle, VehicleDocument, VehicleInput, VehicleRepo};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::models::{ItemCode, Paginated, Pagination, PaginationParams, VehicleStatus};
use crate::state::AppState;

use super::log_activity;

#[derive(Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    #[serde(flatten)]
    pub page: PaginationParams,
}

#[derive(Deserialize)]
pub struct VehiclePayload {
    pub code: String,
    pub plate: Option<String>,
    pub name: String,
    pub vehicle_type: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    pub notes: Option<String>,
}

fn default_status() -> String {
    "operativo".to_owned()
}

impl VehiclePayload {
    fn validate(self) -> Result<VehicleInput, ApiError> {
        let code = ItemCode::new(&self.code)?;
        let status: VehicleStatus = self.status.parse()?;
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation(
                crate::models::ValidationError::Empty { field: "name" },
            ));
        }
        Ok(VehicleInput {
            code: code.as_str().to_owned(),
            plate: self.plate,
            name: self.name.trim().to_owned(),
            vehicle_type: self.vehicle_type,
            status: status.as_str().to_owned(),
            notes: self.notes,
        })
    }
}

#[derive(Deserialize)]
pub struct DocumentPayload {
    pub title: String,
    pub file_path: String,
    pub expires_on: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct ExpiringParams {
    /// Horizon in days, default 30
    pub days: Option<i64>,
}

async fn list_vehicles(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<Vehicle>>, ApiError> {
    user.require(Module::Vehicles, Action::View)?;

    if let Some(status) = &params.status {
        status.parse::<VehicleStatus>()?;
    }
    let page = VehicleRepo::new(&state.pool)
        .list(params.status.as_deref(), Pagination::from(params.page))
        .await?;
    Ok(Json(page))
}

async fn get_vehicle(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vehicle>, ApiError> {
    user.require(Module::Vehicles, Action::View)?;
    let vehicle = VehicleRepo::new(&state.pool).get(id).await?;
    Ok(Json(vehicle))
}

async fn create_vehicle(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<VehiclePayload>,
) -> Result<(StatusCode, Json<Vehicle>), ApiError> {
    user.require(Module::Vehicles, Action::Create)?;
    let input = payload.validate()?;
    let vehicle = VehicleRepo::new(&state.pool).create(&input).await?;

    log_activity(
        &state,
        user.id,
        "vehicles",
        "create",
        Some(vehicle.id),
        &format!("created vehicle {}", vehicle.code),
    )
    .await;
    Ok((StatusCode::CREATED, Json(vehicle)))
}

async fn update_vehicle(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<VehiclePayload>,
) -> Result<Json<Vehicle>, ApiError> {
    user.require(Module::Vehicles, Action::Edit)?;
    let input = payload.validate()?;
    let vehicle = VehicleRepo::new(&state.pool).update(id, &input).await?;

    log_activity(
        &state,
        user.id,
        "vehicles",
        "edit",
        Some(id),
        &format!("updated vehicle {}", vehicle.code),
    )
    .await;
    Ok(Json(vehicle))
}

async fn delete_vehicle(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::Vehicles, Action::Delete)?;
    VehicleRepo::new(&state.pool).delete(id).await?;

    log_activity(&state, user.id, "vehicles", "delete", Some(id), "deleted vehicle").await;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_documents(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<VehicleDocument>>, ApiError> {
    user.require(Module::Vehicles, Action::View)?;
    let docs = VehicleRepo::new(&state.pool).documents(id).await?;
    Ok(Json(docs))
}

async fn add_document(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<DocumentPayload>,
) -> Result<(StatusCode, Json<VehicleDocument>), ApiError> {
    user.require(Module::Vehicles, Action::Edit)?;
    let doc = VehicleRepo::new(&state.pool)
        .add_document(id, &payload.title, &payload.file_path, payload.expires_on)
        .await?;

    log_activity(
        &state,
        user.id,
        "vehicles",
        "edit",
        Some(id),
        &format!("added document '{}'", doc.title),
    )
    .await;
    Ok((StatusCode::CREATED, Json(doc)))
}

/// GET /vehicles/documents/expiring?days=30 - fleet deadline report
async fn expiring_documents(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ExpiringParams>,
) -> Result<Json<Vec<VehicleDocument>>, ApiError> {
    user.require(Module::Vehicles, Action::View)?;
    let docs = VehicleRepo::new(&state.pool)
        .expiring_documents(params.days.unwrap_or(30))
        .await?;
    Ok(Json(docs))
}

#[derive(Deserialize)]
pub struct PhotoPayload {
    pub photo_path: String,
}

async fn set_photo(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PhotoPayload>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::Vehicles, Action::Edit)?;
    VehicleRepo::new(&state.pool)
        .set_photo(id, &payload.photo_path)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        // The static path must be registered alongside the {id} routes
        .route("/vehicles/documents/expiring", get(expiring_documents))
        .route("/vehicles", get(list_vehicles).post(create_vehicle))
        .route(
            "/vehicles/{id}",
            get(get_vehicle).put(update_vehicle).delete(delete_vehicle),
        )
        .route("/vehicles/{id}/photo", put(set_photo))
        .route(
            "/vehicles/{id}/documents",
            get(list_documents).post(add_document),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_rejects_code_with_spaces() {
        let payload = VehiclePayload {
            code: "FB 01".into(),
            plate: None,
            name: "Fiat Ducato".into(),
            vehicle_type: None,
            status: "operativo".into(),
            notes: None,
        };
        assert!(matches!(payload.validate(), Err(ApiError::Validation(_))));
    }
}
