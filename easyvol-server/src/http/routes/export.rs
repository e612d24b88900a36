//! Tabular export endpoint

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;

use easyvol_core::Action;

use crate::export::{build_sheet, export_filename, ExportEntity, ExportFormat};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::state::AppState;

use super::log_activity;

#[derive(Deserialize)]
pub struct ExportParams {
    pub entity: String,
    pub format: String,
}

async fn export_entity(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ExportParams>,
) -> Result<impl IntoResponse, ApiError> {
    let entity: ExportEntity = params.entity.parse()?;
    let format: ExportFormat = params.format.parse()?;
    user.require(entity.module(), Action::Export)?;

    let sheet = build_sheet(&state.pool, entity).await?;
    let bytes = match format {
        ExportFormat::Csv => sheet.to_csv(),
        ExportFormat::Xlsx => sheet.to_xlsx(),
    }
    .map_err(|e| ApiError::Internal {
        message: format!("export failed: {}", e),
    })?;

    let filename = export_filename(entity, format);
    log_activity(
        &state,
        user.id,
        entity.module().as_str(),
        "export",
        None,
        &format!("exported {} as {}", entity.as_str(), format.extension()),
    )
    .await;

    let headers = [
        (header::CONTENT_TYPE, format.mime_type().to_owned()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
        (header::CONTENT_LENGTH, bytes.len().to_string()),
    ];
    Ok((headers, bytes))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/export", get(export_entity))
}
