//! Centralized file download endpoint
//!
//! `GET /download?type=<kind>&id=<uuid>`. The kind decides both the SQL
//! lookup and the module whose View grant is required. Resolution order:
//! unknown kind 400, missing row 404, missing grant 403, escaped path 403,
//! missing file 404.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use easyvol_core::Action;

use crate::download::{content_disposition, open, resolve, FileKind, OpenError};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::state::AppState;

use super::log_activity;

#[derive(Deserialize)]
pub struct DownloadParams {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: Uuid,
}

async fn download_file(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<DownloadParams>,
) -> Result<impl IntoResponse, ApiError> {
    let kind: FileKind = params.kind.parse()?;
    let resolved = resolve(&state.pool, kind, params.id).await?;
    user.require(kind.module(), Action::View)?;

    let not_found = || ApiError::NotFound {
        resource: "file",
        id: params.id.to_string(),
    };
    let canonical = open(&state.config.storage.uploads_root, &resolved.relative_path)
        .await
        .map_err(|e| match e {
            OpenError::Escape(escape) => ApiError::Forbidden {
                reason: escape.to_string(),
            },
            OpenError::Missing => not_found(),
        })?;

    let bytes = tokio::fs::read(&canonical).await.map_err(|_| not_found())?;

    let mime = mime_guess::from_path(&canonical).first_or_octet_stream();

    // Photos are served constantly by the UI; only real documents are audited
    let is_photo = matches!(
        kind,
        FileKind::MemberPhoto | FileKind::JuniorMemberPhoto | FileKind::VehiclePhoto
    );
    if !is_photo {
        log_activity(
            &state,
            user.id,
            kind.module().as_str(),
            "download",
            Some(params.id),
            &format!("downloaded {} '{}'", params.kind, resolved.suggested_name),
        )
        .await;
    }

    let headers = [
        (header::CONTENT_TYPE, mime.to_string()),
        (
            header::CONTENT_DISPOSITION,
            content_disposition(&resolved.suggested_name),
        ),
        (header::CONTENT_LENGTH, bytes.len().to_string()),
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_owned()),
        (header::CACHE_CONTROL, "private, max-age=3600".to_owned()),
    ];
    Ok((headers, bytes))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/download", get(download_file))
}
