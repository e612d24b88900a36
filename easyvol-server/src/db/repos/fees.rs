//! Membership fee repository
//!
//! Payments arrive as requests carrying the membership number and last
//! name from the receipt. Approval matches the request to a member and
//! writes the verified fee row in the same transaction, so a request can
//! be approved exactly once.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::models::{FeeRequestStatus, Paginated, Pagination};

use super::DbError;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FeeRequest {
    pub id: Uuid,
    pub membership_number: String,
    pub last_name: String,
    pub payment_year: i32,
    pub payment_date: NaiveDate,
    pub amount: Option<f64>,
    pub receipt_path: Option<String>,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<Uuid>,
}

/// A verified fee payment on a member's record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MemberFee {
    pub id: Uuid,
    pub member_id: Uuid,
    pub year: i32,
    pub payment_date: NaiveDate,
    pub amount: Option<f64>,
    pub receipt_path: Option<String>,
    pub verified_by: Option<Uuid>,
    pub verified_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FeeRequestInput {
    pub membership_number: String,
    pub last_name: String,
    pub payment_year: i32,
    pub payment_date: NaiveDate,
    pub amount: Option<f64>,
    pub receipt_path: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FeeRequestFilter {
    pub status: Option<String>,
    pub year: Option<i32>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FeeRequestCounts {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

pub struct FeeRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> FeeRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_requests(
        &self,
        filter: &FeeRequestFilter,
        page: Pagination,
    ) -> Result<Paginated<FeeRequest>, DbError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT *, COUNT(*) OVER() AS total FROM fee_payment_requests WHERE 1=1",
        );
        if let Some(status) = &filter.status {
            qb.push(" AND status = ").push_bind(status.clone());
        }
        if let Some(year) = filter.year {
            qb.push(" AND payment_year = ").push_bind(year);
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            qb.push(" AND (membership_number ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR last_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY submitted_at DESC LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows = qb.build().fetch_all(self.pool).await?;
        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(FeeRequest::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    pub async fn get_request(&self, id: Uuid) -> Result<FeeRequest, DbError> {
        sqlx::query_as::<_, FeeRequest>("SELECT * FROM fee_payment_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("fee request", id))
    }

    pub async fn create_request(&self, input: &FeeRequestInput) -> Result<FeeRequest, DbError> {
        let request = sqlx::query_as::<_, FeeRequest>(
            r#"
            INSERT INTO fee_payment_requests
                (membership_number, last_name, payment_year, payment_date, amount, receipt_path)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&input.membership_number)
        .bind(&input.last_name)
        .bind(input.payment_year)
        .bind(input.payment_date)
        .bind(input.amount)
        .bind(&input.receipt_path)
        .fetch_one(self.pool)
        .await?;
        Ok(request)
    }

    /// Approve a pending request: match the member by membership number and
    /// last name, write the verified fee, flip the request status.
    pub async fn approve(&self, request_id: Uuid, user_id: Uuid) -> Result<MemberFee, DbError> {
        let mut tx = self.pool.begin().await?;

        let request = sqlx::query_as::<_, FeeRequest>(
            "SELECT * FROM fee_payment_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("fee request", request_id))?;

        if request.status != FeeRequestStatus::Pending.as_str() {
            return Err(DbError::conflict(format!(
                "fee request already processed (status: {})",
                request.status
            )));
        }

        let member: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM members
             WHERE membership_number = $1 AND LOWER(last_name) = LOWER($2)",
        )
        .bind(&request.membership_number)
        .bind(&request.last_name)
        .fetch_optional(&mut *tx)
        .await?;
        let (member_id,) = member.ok_or_else(|| {
            DbError::conflict(format!(
                "no member matches membership number '{}'",
                request.membership_number
            ))
        })?;

        let fee = sqlx::query_as::<_, MemberFee>(
            r#"
            INSERT INTO member_fees
                (member_id, year, payment_date, amount, receipt_path, verified_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(member_id)
        .bind(request.payment_year)
        .bind(request.payment_date)
        .bind(request.amount)
        .bind(&request.receipt_path)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE fee_payment_requests
             SET status = $2, processed_at = NOW(), processed_by = $3
             WHERE id = $1",
        )
        .bind(request_id)
        .bind(FeeRequestStatus::Approved.as_str())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(fee)
    }

    /// Reject a pending request.
    pub async fn reject(&self, request_id: Uuid, user_id: Uuid) -> Result<FeeRequest, DbError> {
        let request = self.get_request(request_id).await?;
        if request.status != FeeRequestStatus::Pending.as_str() {
            return Err(DbError::conflict(format!(
                "fee request already processed (status: {})",
                request.status
            )));
        }

        let request = sqlx::query_as::<_, FeeRequest>(
            r#"
            UPDATE fee_payment_requests
            SET status = $2, processed_at = NOW(), processed_by = $3
            WHERE id = $1 AND status = $4
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(FeeRequestStatus::Rejected.as_str())
        .bind(user_id)
        .bind(FeeRequestStatus::Pending.as_str())
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::conflict("fee request already processed"))?;
        Ok(request)
    }

    pub async fn list_fees(
        &self,
        member_id: Option<Uuid>,
        year: Option<i32>,
        page: Pagination,
    ) -> Result<Paginated<MemberFee>, DbError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT *, COUNT(*) OVER() AS total FROM member_fees WHERE 1=1");
        if let Some(member_id) = member_id {
            qb.push(" AND member_id = ").push_bind(member_id);
        }
        if let Some(year) = year {
            qb.push(" AND year = ").push_bind(year);
        }
        qb.push(" ORDER BY year DESC, payment_date DESC LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows = qb.build().fetch_all(self.pool).await?;
        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(MemberFee::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    pub async fn request_counts(&self) -> Result<FeeRequestCounts, DbError> {
        let counts = sqlx::query_as::<_, FeeRequestCounts>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'approved') AS approved,
                COUNT(*) FILTER (WHERE status = 'rejected') AS rejected
            FROM fee_payment_requests
            "#,
        )
        .fetch_one(self.pool)
        .await?;
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    #[tokio::test]
    #[ignore = "requires database"]
    async fn approve_writes_fee_and_flips_status() {
        // Approving a pending request must insert one member_fees row and
        // mark the request approved in the same transaction.
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn approve_twice_is_conflict() {}

    #[tokio::test]
    #[ignore = "requires database"]
    async fn approve_without_matching_member_is_conflict() {}
}
