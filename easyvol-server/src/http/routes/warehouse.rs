//! Warehouse/PPE endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use easyvol_core::{Action, Module};

use crate::db::repos::{
    WarehouseFilter, WarehouseItem, WarehouseItemInput, WarehouseMovement, WarehouseRepo,
};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::models::{
    ItemCode, MovementType, Paginated, Pagination, PaginationParams, ValidationError,
};
use crate::state::AppState;

use super::log_activity;

#[derive(Deserialize)]
pub struct ListParams {
    pub category: Option<String>,
    pub search: Option<String>,
    #[serde(default, deserialize_with = "crate::models::de::flag")]
    pub low_stock: bool,
    #[serde(flatten)]
    pub page: PaginationParams,
}

#[derive(Deserialize)]
pub struct ItemPayload {
    pub code: String,
    pub name: String,
    pub category: Option<String>,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub minimum_quantity: i64,
    pub unit: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl ItemPayload {
    fn validate(self) -> Result<WarehouseItemInput, ApiError> {
        let code = ItemCode::new(&self.code)?;
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation(ValidationError::Empty {
                field: "name",
            }));
        }
        if self.quantity < 0 || self.minimum_quantity < 0 {
            return Err(ApiError::Validation(ValidationError::OutOfRange {
                field: "quantity",
                reason: "must not be negative",
            }));
        }
        Ok(WarehouseItemInput {
            code: code.as_str().to_owned(),
            name: self.name.trim().to_owned(),
            category: self.category,
            quantity: self.quantity,
            minimum_quantity: self.minimum_quantity,
            unit: self.unit,
            location: self.location,
            notes: self.notes,
        })
    }
}

#[derive(Deserialize)]
pub struct MovementPayload {
    pub movement_type: String,
    pub quantity: i64,
    pub member_id: Option<Uuid>,
    pub destination: Option<String>,
    pub notes: Option<String>,
}

async fn list_items(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<WarehouseItem>>, ApiError> {
    user.require(Module::Warehouse, Action::View)?;
    let filter = WarehouseFilter {
        category: params.category,
        search: params.search,
        low_stock: params.low_stock,
    };
    let page = WarehouseRepo::new(&state.pool)
        .list(&filter, Pagination::from(params.page))
        .await?;
    Ok(Json(page))
}

async fn get_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<WarehouseItem>, ApiError> {
    user.require(Module::Warehouse, Action::View)?;
    let item = WarehouseRepo::new(&state.pool).get(id).await?;
    Ok(Json(item))
}

async fn create_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<ItemPayload>,
) -> Result<(StatusCode, Json<WarehouseItem>), ApiError> {
    user.require(Module::Warehouse, Action::Create)?;
    let input = payload.validate()?;
    let item = WarehouseRepo::new(&state.pool).create(&input).await?;

    log_activity(
        &state,
        user.id,
        "warehouse",
        "create",
        Some(item.id),
        &format!("created item {}", item.code),
    )
    .await;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ItemPayload>,
) -> Result<Json<WarehouseItem>, ApiError> {
    user.require(Module::Warehouse, Action::Edit)?;
    let input = payload.validate()?;
    let item = WarehouseRepo::new(&state.pool).update(id, &input).await?;

    log_activity(
        &state,
        user.id,
        "warehouse",
        "edit",
        Some(id),
        &format!("updated item {}", item.code),
    )
    .await;
    Ok(Json(item))
}

async fn delete_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::Warehouse, Action::Delete)?;
    WarehouseRepo::new(&state.pool).delete(id).await?;

    log_activity(&state, user.id, "warehouse", "delete", Some(id), "deleted item").await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /warehouse/{id}/movements - ledger entry + quantity update
async fn add_movement(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<MovementPayload>,
) -> Result<(StatusCode, Json<WarehouseMovement>), ApiError> {
    user.require(Module::Warehouse, Action::Edit)?;

    let movement_type: MovementType = payload.movement_type.parse()?;
    if payload.quantity <= 0 {
        return Err(ApiError::Validation(ValidationError::OutOfRange {
            field: "quantity",
            reason: "must be positive",
        }));
    }

    let movement = WarehouseRepo::new(&state.pool)
        .add_movement(
            id,
            movement_type,
            payload.quantity,
            payload.member_id,
            payload.destination.as_deref(),
            payload.notes.as_deref(),
            user.id,
        )
        .await?;

    log_activity(
        &state,
        user.id,
        "warehouse",
        "edit",
        Some(id),
        &format!("{} of {} units", movement_type, payload.quantity),
    )
    .await;
    Ok((StatusCode::CREATED, Json(movement)))
}

async fn list_movements(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<Paginated<WarehouseMovement>>, ApiError> {
    user.require(Module::Warehouse, Action::View)?;
    let page = WarehouseRepo::new(&state.pool)
        .movements(id, Pagination::from(params))
        .await?;
    Ok(Json(page))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/warehouse", get(list_items).post(create_item))
        .route(
            "/warehouse/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route(
            "/warehouse/{id}/movements",
            get(list_movements).post(add_movement),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_quantity_must_be_positive() {
        // Validation happens before the repository is touched
        assert!("carico".parse::<MovementType>().is_ok());
        let payload = ItemPayload {
            code: "DPI-001".into(),
            name: "Casco".into(),
            category: None,
            quantity: -1,
            minimum_quantity: 0,
            unit: None,
            location: None,
            notes: None,
        };
        assert!(matches!(payload.validate(), Err(ApiError::Validation(_))));
    }
}
