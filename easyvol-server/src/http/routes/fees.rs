//! Membership fee endpoints
//!
//! Payment requests are recorded against a membership number and approved
//! or rejected by an operator; approval writes the verified fee onto the
//! member's record.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use easyvol_core::{Action, Module};

use crate::db::repos::{
    FeeRepo, FeeRequest, FeeRequestCounts, FeeRequestFilter, FeeRequestInput, MemberFee,
};
use crate::http::error::ApiError;
use crate::http::extractors::CurrentUser;
use crate::models::{
    FeeRequestStatus, Paginated, Pagination, PaginationParams, ValidationError,
};
use crate::state::AppState;

use super::log_activity;

#[derive(Deserialize)]
pub struct RequestListParams {
    pub status: Option<String>,
    #[serde(default, deserialize_with = "crate::models::de::opt_i32")]
    pub year: Option<i32>,
    pub search: Option<String>,
    #[serde(flatten)]
    pub page: PaginationParams,
}

#[derive(Deserialize)]
pub struct FeeListParams {
    pub member_id: Option<Uuid>,
    #[serde(default, deserialize_with = "crate::models::de::opt_i32")]
    pub year: Option<i32>,
    #[serde(flatten)]
    pub page: PaginationParams,
}

#[derive(Deserialize)]
pub struct RequestPayload {
    pub membership_number: String,
    pub last_name: String,
    pub payment_year: i32,
    pub payment_date: NaiveDate,
    pub amount: Option<f64>,
    pub receipt_path: Option<String>,
}

impl RequestPayload {
    fn validate(self) -> Result<FeeRequestInput, ApiError> {
        let membership_number = self.membership_number.trim();
        if membership_number.is_empty() {
            return Err(ApiError::Validation(ValidationError::Empty {
                field: "membership number",
            }));
        }
        let last_name = self.last_name.trim();
        if last_name.is_empty() {
            return Err(ApiError::Validation(ValidationError::Empty {
                field: "last name",
            }));
        }
        if !(1990..=2100).contains(&self.payment_year) {
            return Err(ApiError::Validation(ValidationError::OutOfRange {
                field: "payment year",
                reason: "must be a plausible year",
            }));
        }
        if let Some(amount) = self.amount {
            if amount <= 0.0 {
                return Err(ApiError::Validation(ValidationError::OutOfRange {
                    field: "amount",
                    reason: "must be positive",
                }));
            }
        }
        Ok(FeeRequestInput {
            membership_number: membership_number.to_owned(),
            last_name: last_name.to_owned(),
            payment_year: self.payment_year,
            payment_date: self.payment_date,
            amount: self.amount,
            receipt_path: self.receipt_path,
        })
    }
}

async fn list_requests(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<RequestListParams>,
) -> Result<Json<Paginated<FeeRequest>>, ApiError> {
    user.require(Module::Fees, Action::View)?;

    if let Some(status) = &params.status {
        status.parse::<FeeRequestStatus>()?;
    }
    let filter = FeeRequestFilter {
        status: params.status,
        year: params.year,
        search: params.search,
    };
    let page = FeeRepo::new(&state.pool)
        .list_requests(&filter, Pagination::from(params.page))
        .await?;
    Ok(Json(page))
}

async fn create_request(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<RequestPayload>,
) -> Result<(StatusCode, Json<FeeRequest>), ApiError> {
    user.require(Module::Fees, Action::Create)?;
    let input = payload.validate()?;
    let request = FeeRepo::new(&state.pool).create_request(&input).await?;

    log_activity(
        &state,
        user.id,
        "fees",
        "create",
        Some(request.id),
        &format!(
            "recorded fee payment request for member {} ({})",
            request.membership_number, request.payment_year
        ),
    )
    .await;
    Ok((StatusCode::CREATED, Json(request)))
}

/// POST /fees/requests/{id}/approve - 409 unless the request is pending
async fn approve_request(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MemberFee>, ApiError> {
    user.require(Module::Fees, Action::Edit)?;
    let fee = FeeRepo::new(&state.pool).approve(id, user.id).await?;

    log_activity(
        &state,
        user.id,
        "fees",
        "edit",
        Some(id),
        &format!("approved fee payment for year {}", fee.year),
    )
    .await;
    Ok(Json(fee))
}

/// POST /fees/requests/{id}/reject - 409 unless the request is pending
async fn reject_request(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<FeeRequest>, ApiError> {
    user.require(Module::Fees, Action::Edit)?;
    let request = FeeRepo::new(&state.pool).reject(id, user.id).await?;

    log_activity(
        &state,
        user.id,
        "fees",
        "edit",
        Some(id),
        &format!("rejected fee payment request for year {}", request.payment_year),
    )
    .await;
    Ok(Json(request))
}

async fn request_counts(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<FeeRequestCounts>, ApiError> {
    user.require(Module::Fees, Action::View)?;
    let counts = FeeRepo::new(&state.pool).request_counts().await?;
    Ok(Json(counts))
}

async fn list_fees(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<FeeListParams>,
) -> Result<Json<Paginated<MemberFee>>, ApiError> {
    user.require(Module::Fees, Action::View)?;
    let page = FeeRepo::new(&state.pool)
        .list_fees(params.member_id, params.year, Pagination::from(params.page))
        .await?;
    Ok(Json(page))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/fees", get(list_fees))
        .route("/fees/requests", get(list_requests).post(create_request))
        .route("/fees/requests/counts", get(request_counts))
        .route("/fees/requests/{id}/approve", post(approve_request))
        .route("/fees/requests/{id}/reject", post(reject_request))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> RequestPayload {
        RequestPayload {
            membership_number: "M-042".into(),
            last_name: "Rossi".into(),
            payment_year: 2026,
            payment_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            amount: Some(25.0),
            receipt_path: None,
        }
    }

    #[test]
    fn implausible_year_is_rejected() {
        let mut p = payload();
        p.payment_year = 26;
        assert!(matches!(p.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn amount_must_be_positive() {
        let mut p = payload();
        p.amount = Some(0.0);
        assert!(matches!(p.validate(), Err(ApiError::Validation(_))));
    }
}
