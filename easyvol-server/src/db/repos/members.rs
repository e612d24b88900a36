//! Member registry repository

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::models::{Paginated, Pagination};

use super::DbError;

/// Member record
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Member {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub tax_code: Option<String>,
    pub membership_number: Option<String>,
    pub status: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub joined_on: Option<NaiveDate>,
    pub resigned_on: Option<NaiveDate>,
    pub photo_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Attachment metadata for a member
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MemberAttachment {
    pub id: Uuid,
    pub member_id: Uuid,
    pub title: String,
    pub file_path: String,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Field values for insert/update
#[derive(Debug, Clone)]
pub struct MemberInput {
    pub first_name: String,
    pub last_name: String,
    pub tax_code: Option<String>,
    pub membership_number: Option<String>,
    pub status: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub joined_on: Option<NaiveDate>,
    pub resigned_on: Option<NaiveDate>,
}

/// List filter
#[derive(Debug, Clone, Default)]
pub struct MemberFilter {
    pub status: Option<String>,
    pub search: Option<String>,
}

pub struct MemberRepo<'a> {
    pool: &'a PgPool,
    table: &'static str,
}

impl<'a> MemberRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            table: "members",
        }
    }

    /// The junior (cadet) registry shares the member table shape.
    pub fn juniors(pool: &'a PgPool) -> Self {
        Self {
            pool,
            table: "junior_members",
        }
    }

    fn attachment_table(&self) -> &'static str {
        if self.table == "members" {
            "member_attachments"
        } else {
            "junior_member_attachments"
        }
    }

    fn attachment_fk(&self) -> &'static str {
        if self.table == "members" {
            "member_id"
        } else {
            "junior_member_id"
        }
    }

    pub async fn list(
        &self,
        filter: &MemberFilter,
        page: Pagination,
    ) -> Result<Paginated<Member>, DbError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT *, COUNT(*) OVER() AS total FROM {} WHERE 1=1",
            self.table
        ));
        if let Some(status) = &filter.status {
            qb.push(" AND status = ").push_bind(status.clone());
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            qb.push(" AND (last_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR first_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR tax_code ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY last_name, first_name LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows = qb.build().fetch_all(self.pool).await?;
        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(Member::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<Member, DbError> {
        sqlx::query_as::<_, Member>(&format!("SELECT * FROM {} WHERE id = $1", self.table))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("member", id))
    }

    pub async fn create(&self, input: &MemberInput) -> Result<Member, DbError> {
        let member = sqlx::query_as::<_, Member>(&format!(
            r#"
            INSERT INTO {} (
                first_name, last_name, tax_code, membership_number, status,
                email, phone, address, birth_date, joined_on, resigned_on
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
            self.table
        ))
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.tax_code)
        .bind(&input.membership_number)
        .bind(&input.status)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(input.birth_date)
        .bind(input.joined_on)
        .bind(input.resigned_on)
        .fetch_one(self.pool)
        .await?;

        Ok(member)
    }

    pub async fn update(&self, id: Uuid, input: &MemberInput) -> Result<Member, DbError> {
        sqlx::query_as::<_, Member>(&format!(
            r#"
            UPDATE {} SET
                first_name = $2, last_name = $3, tax_code = $4,
                membership_number = $5, status = $6, email = $7, phone = $8,
                address = $9, birth_date = $10, joined_on = $11,
                resigned_on = $12, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
            self.table
        ))
        .bind(id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.tax_code)
        .bind(&input.membership_number)
        .bind(&input.status)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(input.birth_date)
        .bind(input.joined_on)
        .bind(input.resigned_on)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("member", id))
    }

    /// Delete a member. Attachments and participation rows go with it
    /// (FK cascade).
    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", self.table))
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("member", id));
        }
        Ok(())
    }

    pub async fn set_photo(&self, id: Uuid, photo_path: &str) -> Result<(), DbError> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET photo_path = $2, updated_at = NOW() WHERE id = $1",
            self.table
        ))
        .bind(id)
        .bind(photo_path)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("member", id));
        }
        Ok(())
    }

    pub async fn attachments(&self, member_id: Uuid) -> Result<Vec<MemberAttachment>, DbError> {
        let rows = sqlx::query(&format!(
            "SELECT id, {fk} AS member_id, title, file_path, uploaded_by, created_at
             FROM {table} WHERE {fk} = $1 ORDER BY created_at DESC",
            fk = self.attachment_fk(),
            table = self.attachment_table(),
        ))
        .bind(member_id)
        .fetch_all(self.pool)
        .await?;

        rows.iter()
            .map(MemberAttachment::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    pub async fn add_attachment(
        &self,
        member_id: Uuid,
        title: &str,
        file_path: &str,
        uploaded_by: Uuid,
    ) -> Result<MemberAttachment, DbError> {
        // Referential check first so a bad member id is a 404, not a 500
        self.get(member_id).await?;

        let row = sqlx::query(&format!(
            "INSERT INTO {table} ({fk}, title, file_path, uploaded_by)
             VALUES ($1, $2, $3, $4)
             RETURNING id, {fk} AS member_id, title, file_path, uploaded_by, created_at",
            fk = self.attachment_fk(),
            table = self.attachment_table(),
        ))
        .bind(member_id)
        .bind(title)
        .bind(file_path)
        .bind(uploaded_by)
        .fetch_one(self.pool)
        .await?;

        Ok(MemberAttachment::from_row(&row)?)
    }

    pub async fn delete_attachment(&self, attachment_id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE id = $1",
            self.attachment_table()
        ))
        .bind(attachment_id)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("attachment", attachment_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires database"]
    async fn list_filters_by_status() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.expect("pool");
        let repo = MemberRepo::new(&pool);
        let page = repo
            .list(
                &MemberFilter {
                    status: Some("attivo".into()),
                    search: None,
                },
                Pagination::default(),
            )
            .await
            .expect("list");
        assert!(page.items.iter().all(|m| m.status == "attivo"));
    }
}
