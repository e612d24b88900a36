//! Member registry endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use easyvol_core::{Action, Module};

use crate::db::repos::{Member, MemberAttachment, MemberFilter, MemberInput, MemberRepo};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::models::{
    MemberStatus, Paginated, Pagination, PaginationParams, PersonName, TaxCode,
};
use crate::state::AppState;

use super::log_activity;

#[derive(Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub search: Option<String>,
    #[serde(flatten)]
    pub page: PaginationParams,
}

/// Incoming member fields; validated into a `MemberInput`.
#[derive(Deserialize)]
pub struct MemberPayload {
    pub first_name: String,
    pub last_name: String,
    pub tax_code: Option<String>,
    pub membership_number: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub joined_on: Option<NaiveDate>,
    pub resigned_on: Option<NaiveDate>,
}

fn default_status() -> String {
    "attivo".to_owned()
}

impl MemberPayload {
    pub fn validate(self) -> Result<MemberInput, ApiError> {
        let first_name = PersonName::new("first name", &self.first_name)?;
        let last_name = PersonName::new("last name", &self.last_name)?;
        let status: MemberStatus = self.status.parse()?;
        let tax_code = match self.tax_code.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => Some(TaxCode::new(raw)?.as_str().to_owned()),
            None => None,
        };

        Ok(MemberInput {
            first_name: first_name.into_string(),
            last_name: last_name.into_string(),
            tax_code,
            membership_number: self.membership_number,
            status: status.as_str().to_owned(),
            email: self.email,
            phone: self.phone,
            address: self.address,
            birth_date: self.birth_date,
            joined_on: self.joined_on,
            resigned_on: self.resigned_on,
        })
    }
}

#[derive(Deserialize)]
pub struct AttachmentPayload {
    pub title: String,
    pub file_path: String,
}

#[derive(Deserialize)]
pub struct PhotoPayload {
    pub photo_path: String,
}

async fn list_members(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<Member>>, ApiError> {
    user.require(Module::Members, Action::View)?;

    if let Some(status) = &params.status {
        status.parse::<MemberStatus>()?;
    }
    let filter = MemberFilter {
        status: params.status,
        search: params.search,
    };
    let page = MemberRepo::new(&state.pool)
        .list(&filter, Pagination::from(params.page))
        .await?;
    Ok(Json(page))
}

async fn get_member(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Member>, ApiError> {
    user.require(Module::Members, Action::View)?;
    let member = MemberRepo::new(&state.pool).get(id).await?;
    Ok(Json(member))
}

async fn create_member(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<MemberPayload>,
) -> Result<(StatusCode, Json<Member>), ApiError> {
    user.require(Module::Members, Action::Create)?;
    let input = payload.validate()?;
    let member = MemberRepo::new(&state.pool).create(&input).await?;

    log_activity(
        &state,
        user.id,
        "members",
        "create",
        Some(member.id),
        &format!("created member {} {}", member.first_name, member.last_name),
    )
    .await;
    Ok((StatusCode::CREATED, Json(member)))
}

async fn update_member(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<MemberPayload>,
) -> Result<Json<Member>, ApiError> {
    user.require(Module::Members, Action::Edit)?;
    let input = payload.validate()?;
    let member = MemberRepo::new(&state.pool).update(id, &input).await?;

    log_activity(
        &state,
        user.id,
        "members",
        "edit",
        Some(id),
        &format!("updated member {} {}", member.first_name, member.last_name),
    )
    .await;
    Ok(Json(member))
}

async fn delete_member(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::Members, Action::Delete)?;
    MemberRepo::new(&state.pool).delete(id).await?;

    log_activity(&state, user.id, "members", "delete", Some(id), "deleted member").await;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_photo(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PhotoPayload>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::Members, Action::Edit)?;
    MemberRepo::new(&state.pool)
        .set_photo(id, &payload.photo_path)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_attachments(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MemberAttachment>>, ApiError> {
    user.require(Module::Members, Action::View)?;
    let attachments = MemberRepo::new(&state.pool).attachments(id).await?;
    Ok(Json(attachments))
}

async fn add_attachment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AttachmentPayload>,
) -> Result<(StatusCode, Json<MemberAttachment>), ApiError> {
    user.require(Module::Members, Action::Edit)?;
    let attachment = MemberRepo::new(&state.pool)
        .add_attachment(id, &payload.title, &payload.file_path, user.id)
        .await?;

    log_activity(
        &state,
        user.id,
        "members",
        "edit",
        Some(id),
        &format!("added attachment '{}'", attachment.title),
    )
    .await;
    Ok((StatusCode::CREATED, Json(attachment)))
}

async fn delete_attachment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(attachment_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    user.require(Module::Members, Action::Edit)?;
    MemberRepo::new(&state.pool)
        .delete_attachment(attachment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/members", get(list_members).post(create_member))
        .route(
            "/members/{id}",
            get(get_member).put(update_member).delete(delete_member),
        )
        .route("/members/{id}/photo", put(set_photo))
        .route(
            "/members/{id}/attachments",
            get(list_attachments).post(add_attachment),
        )
        .route("/members/attachments/{id}", delete(delete_attachment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_validation_normalizes_tax_code() {
        let payload = MemberPayload {
            first_name: " Mario ".into(),
            last_name: "Rossi".into(),
            tax_code: Some("rssmra85t10a562s".into()),
            membership_number: None,
            status: "attivo".into(),
            email: None,
            phone: None,
            address: None,
            birth_date: None,
            joined_on: None,
            resigned_on: None,
        };
        let input = payload.validate().unwrap();
        assert_eq!(input.first_name, "Mario");
        assert_eq!(input.tax_code.as_deref(), Some("RSSMRA85T10A562S"));
    }

    #[test]
    fn payload_rejects_unknown_status() {
        let payload = MemberPayload {
            first_name: "Mario".into(),
            last_name: "Rossi".into(),
            tax_code: None,
            membership_number: None,
            status: "archiviato".into(),
            email: None,
            phone: None,
            address: None,
            birth_date: None,
            joined_on: None,
            resigned_on: None,
        };
        assert!(matches!(
            payload.validate(),
            Err(ApiError::Validation(_))
        ));
    }
}
