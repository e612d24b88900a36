//! Activity log endpoints

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use easyvol_core::{Action, Module};

use crate::db::repos::{ActivityEntry, ActivityFilter, ActivityRepo};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::models::{Paginated, Pagination, PaginationParams};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListParams {
    pub user_id: Option<Uuid>,
    pub module: Option<String>,
    #[serde(flatten)]
    pub page: PaginationParams,
}

async fn list_activity(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<ActivityEntry>>, ApiError> {
    user.require(Module::Settings, Action::View)?;
    let filter = ActivityFilter {
        user_id: params.user_id,
        module: params.module,
    };
    let page = ActivityRepo::new(&state.pool)
        .list(&filter, Pagination::from(params.page))
        .await?;
    Ok(Json(page))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/activity", get(list_activity))
}
