//! Junior member (cadet) registry
//!
//! Cadets share the member registry shape; what differs is the guardian
//! list (padre/madre/tutore) attached to each record.

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::{Paginated, Pagination};

use super::members::{Member, MemberAttachment, MemberFilter, MemberInput, MemberRepo};
use super::DbError;

/// Cadet records reuse the member row shape.
pub type JuniorMember = Member;

/// Guardian row for a cadet
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Guardian {
    pub id: Uuid,
    pub junior_member_id: Uuid,
    pub guardian_type: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub tax_code: Option<String>,
}

/// Guardian field values (validated at the route boundary)
#[derive(Debug, Clone)]
pub struct GuardianInput {
    pub guardian_type: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub tax_code: Option<String>,
}

pub struct JuniorMemberRepo<'a> {
    pool: &'a PgPool,
    inner: MemberRepo<'a>,
}

impl<'a> JuniorMemberRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            inner: MemberRepo::juniors(pool),
        }
    }

    pub async fn list(
        &self,
        filter: &MemberFilter,
        page: Pagination,
    ) -> Result<Paginated<JuniorMember>, DbError> {
        self.inner.list(filter, page).await
    }

    pub async fn get(&self, id: Uuid) -> Result<JuniorMember, DbError> {
        self.inner.get(id).await
    }

    pub async fn create(&self, input: &MemberInput) -> Result<JuniorMember, DbError> {
        self.inner.create(input).await
    }

    pub async fn update(&self, id: Uuid, input: &MemberInput) -> Result<JuniorMember, DbError> {
        self.inner.update(id, input).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        self.inner.delete(id).await
    }

    pub async fn attachments(&self, id: Uuid) -> Result<Vec<MemberAttachment>, DbError> {
        self.inner.attachments(id).await
    }

    pub async fn add_attachment(
        &self,
        id: Uuid,
        title: &str,
        file_path: &str,
        uploaded_by: Uuid,
    ) -> Result<MemberAttachment, DbError> {
        self.inner.add_attachment(id, title, file_path, uploaded_by).await
    }

    pub async fn guardians(&self, junior_member_id: Uuid) -> Result<Vec<Guardian>, DbError> {
        let guardians = sqlx::query_as::<_, Guardian>(
            "SELECT * FROM junior_member_guardians
             WHERE junior_member_id = $1 ORDER BY guardian_type",
        )
        .bind(junior_member_id)
        .fetch_all(self.pool)
        .await?;
        Ok(guardians)
    }

    /// Replace the full guardian list for a cadet in one transaction.
    pub async fn replace_guardians(
        &self,
        junior_member_id: Uuid,
        guardians: &[GuardianInput],
    ) -> Result<Vec<Guardian>, DbError> {
        self.get(junior_member_id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM junior_member_guardians WHERE junior_member_id = $1")
            .bind(junior_member_id)
            .execute(&mut *tx)
            .await?;

        for guardian in guardians {
            sqlx::query(
                r#"
                INSERT INTO junior_member_guardians
                    (junior_member_id, guardian_type, first_name, last_name, phone, email, tax_code)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(junior_member_id)
            .bind(&guardian.guardian_type)
            .bind(&guardian.first_name)
            .bind(&guardian.last_name)
            .bind(&guardian.phone)
            .bind(&guardian.email)
            .bind(&guardian.tax_code)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        self.guardians(junior_member_id).await
    }
}

#[cfg(test)]
mod tests {
    #[tokio::test]
    #[ignore = "requires database"]
    async fn replace_guardians_is_atomic() {
        // Replacing with an invalid row must leave the previous list intact
        // (the delete and inserts share one transaction).
    }
}
