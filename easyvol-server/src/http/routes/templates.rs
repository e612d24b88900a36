//! Print template registry endpoints

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

use crate::db::repos::{PrintTemplate, PrintTemplateInput, TemplateRepo};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::models::{Paginated, Pagination, PaginationParams, TemplateKind, ValidationError};
use crate::print;
use crate::state::AppState;

use super::log_activity;

#[derive(Deserialize)]
pub struct ListParams {
    pub entity_type: Option<String>,
    #[serde(flatten)]
    pub page: PaginationParams,
}

#[derive(Deserialize)]
pub struct TemplatePayload {
    pub name: String,
    pub entity_type: String,
    pub template_kind: String,
    pub html_content: String,
    #[serde(default = "default_paper_size")]
    pub paper_size: String,
    #[serde(default = "default_orientation")]
    pub orientation: String,
}

fn default_paper_size() -> String {
    "A4".to_owned()
}

fn default_orientation() -> String {
    "portrait".to_owned()
}

impl TemplatePayload {
    fn validate(self) -> Result<PrintTemplateInput, ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation(ValidationError::Empty {
                field: "name",
            }));
        }
        // The entity type must map to a module or generation would fail later
        print::permission_module(&self.entity_type)?;
        let template_kind: TemplateKind = self.template_kind.parse()?;
        if self.orientation != "portrait" && self.orientation != "landscape" {
            return Err(ApiError::Validation(ValidationError::InvalidVariant {
                field: "orientation",
                value: self.orientation,
            }));
        }
        if self.paper_size.trim().is_empty() {
            return Err(ApiError::Validation(ValidationError::Empty {
                field: "paper size",
            }));
        }
        Ok(PrintTemplateInput {
            name: self.name.trim().to_owned(),
            entity_type: self.entity_type,
            template_kind,
            html_content: self.html_content,
            paper_size: self.paper_size,
            orientation: self.orientation,
        })
    }
}

async fn list_templates(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<PrintTemplate>>, ApiError> {
    user.require(Module::Settings, Action::View)?;
    let page = TemplateRepo::new(&state.pool)
        .list(params.entity_type.as_deref(), Pagination::from(params.page))
        .await?;
    Ok(Json(page))
}

async fn get_template(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PrintTemplate>, ApiError> {
    user.require(Module::Settings, Action::View)?;
    let template = TemplateRepo::new(&state.pool).get(id).await?;
    Ok(Json(template))
}

async fn create_template(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<TemplatePayload>,
) -> Result<(StatusCode, Json<PrintTemplate>), ApiError> {
    user.require(Module::Settings, Action::Create)?;
    let input = payload.validate()?;
    let template = TemplateRepo::new(&state.pool).create(&input, user.id).await?;

    log_activity(
        &state,
        user.id,
        "settings",
        "create",
        Some(template.id),
        &format!("created print template '{}'", template.name),
    )
    .await;
    Ok((StatusCode::CREATED, Json(template)))
}

async fn update_template(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<TemplatePayload>,
) -> Result<Json<PrintTemplate>, ApiError> {
    user.require(Module::Settings, Action::Edit)?;
    let input = payload.validate()?;
    let template = TemplateRepo::new(&state.pool).update(id, &input).await?;

    log_activity(
        &state,
        user.id,
        "settings",
        "edit",
        Some(id),
        &format!("updated print template '{}'", template.name),
    )
    .await;
    Ok(Json(template))
}

async fn delete_template(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::Settings, Action::Delete)?;
    TemplateRepo::new(&state.pool).delete(id).await?;

    log_activity(&state, user.id, "settings", "delete", Some(id), "deleted print template").await;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/print/templates",
            get(list_templates).post(create_template),
        )
        .route(
            "/print/templates/{id}",
            get(get_template)
                .put(update_template)
                .delete(delete_template),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(entity_type: &str, kind: &str, orientation: &str) -> TemplatePayload {
        TemplatePayload {
            name: "Scheda socio".into(),
            entity_type: entity_type.into(),
            template_kind: kind.into(),
            html_content: "<p>{{last_name}}</p>".into(),
            paper_size: "A4".into(),
            orientation: orientation.into(),
        }
    }

    #[test]
    fn unknown_entity_type_is_rejected() {
        assert!(payload("newsletter", "single", "portrait").validate().is_err());
        assert!(payload("members", "single", "portrait").validate().is_ok());
    }

    #[test]
    fn orientation_must_be_known() {
        assert!(payload("members", "list", "diagonal").validate().is_err());
        assert!(payload("members", "list", "landscape").validate().is_ok());
    }
}
