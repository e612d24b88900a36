//! Junior member (cadet) endpoints
//!
//! Same shape as the member registry, plus the guardian list.

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
    Guardian, GuardianInput, JuniorMember, JuniorMemberRepo, MemberAttachment, MemberFilter,
};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::models::{GuardianType, MemberStatus, Paginated, Pagination, PersonName};
use crate::state::AppState;

use super::log_activity;
use super::members::{AttachmentPayload, ListParams, MemberPayload};

#[derive(Deserialize)]
pub struct GuardianPayload {
    pub guardian_type: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub tax_code: Option<String>,
}

impl GuardianPayload {
    fn validate(self) -> Result<GuardianInput, ApiError> {
        let guardian_type: GuardianType = self.guardian_type.parse()?;
        let first_name = PersonName::new("guardian first name", &self.first_name)?;
        let last_name = PersonName::new("guardian last name", &self.last_name)?;
        Ok(GuardianInput {
            guardian_type: guardian_type.as_str().to_owned(),
            first_name: first_name.into_string(),
            last_name: last_name.into_string(),
            phone: self.phone,
            email: self.email,
            tax_code: self.tax_code,
        })
    }
}

async fn list_cadets(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<JuniorMember>>, ApiError> {
    user.require(Module::JuniorMembers, Action::View)?;

    if let Some(status) = &params.status {
        status.parse::<MemberStatus>()?;
    }
    let filter = MemberFilter {
        status: params.status,
        search: params.search,
    };
    let page = JuniorMemberRepo::new(&state.pool)
        .list(&filter, Pagination::from(params.page))
        .await?;
    Ok(Json(page))
}

async fn get_cadet(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<JuniorMember>, ApiError> {
    user.require(Module::JuniorMembers, Action::View)?;
    let cadet = JuniorMemberRepo::new(&state.pool).get(id).await?;
    Ok(Json(cadet))
}

async fn create_cadet(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<MemberPayload>,
) -> Result<(StatusCode, Json<JuniorMember>), ApiError> {
    user.require(Module::JuniorMembers, Action::Create)?;
    let input = payload.validate()?;
    let cadet = JuniorMemberRepo::new(&state.pool).create(&input).await?;

    log_activity(
        &state,
        user.id,
        "junior_members",
        "create",
        Some(cadet.id),
        &format!("created cadet {} {}", cadet.first_name, cadet.last_name),
    )
    .await;
    Ok((StatusCode::CREATED, Json(cadet)))
}

async fn update_cadet(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<MemberPayload>,
) -> Result<Json<JuniorMember>, ApiError> {
    user.require(Module::JuniorMembers, Action::Edit)?;
    let input = payload.validate()?;
    let cadet = JuniorMemberRepo::new(&state.pool).update(id, &input).await?;

    log_activity(
        &state,
        user.id,
        "junior_members",
        "edit",
        Some(id),
        &format!("updated cadet {} {}", cadet.first_name, cadet.last_name),
    )
    .await;
    Ok(Json(cadet))
}

async fn delete_cadet(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::JuniorMembers, Action::Delete)?;
    JuniorMemberRepo::new(&state.pool).delete(id).await?;

    log_activity(
        &state,
        user.id,
        "junior_members",
        "delete",
        Some(id),
        "deleted cadet",
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_guardians(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Guardian>>, ApiError> {
    user.require(Module::JuniorMembers, Action::View)?;
    let guardians = JuniorMemberRepo::new(&state.pool).guardians(id).await?;
    Ok(Json(guardians))
}

/// PUT /junior-members/{id}/guardians - replace the whole guardian list
async fn replace_guardians(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<Vec<GuardianPayload>>,
) -> Result<Json<Vec<Guardian>>, ApiError> {
    user.require(Module::JuniorMembers, Action::Edit)?;

    let inputs = payload
        .into_iter()
        .map(GuardianPayload::validate)
        .collect::<Result<Vec<_>, _>>()?;
    let guardians = JuniorMemberRepo::new(&state.pool)
        .replace_guardians(id, &inputs)
        .await?;

    log_activity(
        &state,
        user.id,
        "junior_members",
        "edit",
        Some(id),
        "replaced guardian list",
    )
    .await;
    Ok(Json(guardians))
}

async fn list_attachments(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MemberAttachment>>, ApiError> {
    user.require(Module::JuniorMembers, Action::View)?;
    let attachments = JuniorMemberRepo::new(&state.pool).attachments(id).await?;
    Ok(Json(attachments))
}

async fn add_attachment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AttachmentPayload>,
) -> Result<(StatusCode, Json<MemberAttachment>), ApiError> {
    user.require(Module::JuniorMembers, Action::Edit)?;
    let attachment = JuniorMemberRepo::new(&state.pool)
        .add_attachment(id, &payload.title, &payload.file_path, user.id)
        .await?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/junior-members", get(list_cadets).post(create_cadet))
        .route(
            "/junior-members/{id}",
            get(get_cadet).put(update_cadet).delete(delete_cadet),
        )
        .route(
            "/junior-members/{id}/guardians",
            get(list_guardians).put(replace_guardians),
        )
        .route(
            "/junior-members/{id}/attachments",
            get(list_attachments).post(add_attachment),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guardian_type_is_validated() {
        let payload = GuardianPayload {
            guardian_type: "zio".into(),
            first_name: "Luigi".into(),
            last_name: "Rossi".into(),
            phone: None,
            email: None,
            tax_code: None,
        };
        assert!(matches!(payload.validate(), Err(ApiError::Validation(_))));
    }
}
