//! Document archive endpoints

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

use crate::db::repos::{Document, DocumentRepo};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::models::{Paginated, Pagination, PaginationParams, ValidationError};
use crate::state::AppState;

use super::log_activity;

#[derive(Deserialize)]
pub struct ListParams {
    pub category: Option<String>,
    pub search: Option<String>,
    #[serde(flatten)]
    pub page: PaginationParams,
}

#[derive(Deserialize)]
pub struct CreatePayload {
    pub title: String,
    pub category: Option<String>,
    pub file_path: String,
}

#[derive(Deserialize)]
pub struct UpdatePayload {
    pub title: String,
    pub category: Option<String>,
}

async fn list_documents(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<Document>>, ApiError> {
    user.require(Module::Documents, Action::View)?;
    let page = DocumentRepo::new(&state.pool)
        .list(
            params.category.as_deref(),
            params.search.as_deref(),
            Pagination::from(params.page),
        )
        .await?;
    Ok(Json(page))
}

async fn get_document(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Document>, ApiError> {
    user.require(Module::Documents, Action::View)?;
    let doc = DocumentRepo::new(&state.pool).get(id).await?;
    Ok(Json(doc))
}

async fn create_document(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreatePayload>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    user.require(Module::Documents, Action::Create)?;
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation(ValidationError::Empty {
            field: "title",
        }));
    }
    let doc = DocumentRepo::new(&state.pool)
        .create(
            payload.title.trim(),
            payload.category.as_deref(),
            &payload.file_path,
            user.id,
        )
        .await?;

    log_activity(
        &state,
        user.id,
        "documents",
        "create",
        Some(doc.id),
        &format!("archived document '{}'", doc.title),
    )
    .await;
    Ok((StatusCode::CREATED, Json(doc)))
}

async fn update_document(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePayload>,
) -> Result<Json<Document>, ApiError> {
    user.require(Module::Documents, Action::Edit)?;
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation(ValidationError::Empty {
            field: "title",
        }));
    }
    let doc = DocumentRepo::new(&state.pool)
        .update(id, payload.title.trim(), payload.category.as_deref())
        .await?;
    Ok(Json(doc))
}

async fn delete_document(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::Documents, Action::Delete)?;
    let doc = DocumentRepo::new(&state.pool).delete(id).await?;

    log_activity(
        &state,
        user.id,
        "documents",
        "delete",
        Some(id),
        &format!("deleted document '{}'", doc.title),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/documents", get(list_documents).post(create_document))
        .route(
            "/documents/{id}",
            get(get_document)
                .put(update_document)
                .delete(delete_document),
        )
}
