//! PDF generation endpoint

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

use crate::db::repos::TemplateRepo;
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::print::{self, PrintParams};
use crate::state::AppState;

use super::log_activity;

#[derive(Deserialize)]
pub struct GenerateParams {
    pub template_id: Uuid,
    #[serde(flatten)]
    pub print: PrintParams,
}

async fn generate_pdf(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<GenerateParams>,
) -> Result<impl IntoResponse, ApiError> {
    let template = TemplateRepo::new(&state.pool).get(params.template_id).await?;

    let module = print::permission_module(&template.entity_type)?;
    user.require(module, Action::View)?;

    let (pdf, filename) = print::generate(&state, &template, &params.print).await?;

    log_activity(
        &state,
        user.id,
        module.as_str(),
        "print",
        Some(template.id),
        &format!("generated '{}' from template '{}'", filename, template.name),
    )
    .await;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_owned()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
        (header::CONTENT_LENGTH, pdf.len().to_string()),
    ];
    Ok((headers, pdf))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/print/generate", get(generate_pdf))
}
