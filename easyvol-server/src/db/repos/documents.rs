//! General document archive repository

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::models::{Paginated, Pagination};

use super::DbError;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub category: Option<String>,
    pub file_path: String,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

pub struct DocumentRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> DocumentRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        category: Option<&str>,
        search: Option<&str>,
        page: Pagination,
    ) -> Result<Paginated<Document>, DbError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT *, COUNT(*) OVER() AS total FROM documents WHERE 1=1");
        if let Some(category) = category {
            qb.push(" AND category = ").push_bind(category.to_owned());
        }
        if let Some(search) = search {
            qb.push(" AND title ILIKE ")
                .push_bind(format!("%{}%", search));
        }
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows = qb.build().fetch_all(self.pool).await?;
        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(Document::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<Document, DbError> {
        sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("document", id))
    }

    pub async fn create(
        &self,
        title: &str,
        category: Option<&str>,
        file_path: &str,
        uploaded_by: Uuid,
    ) -> Result<Document, DbError> {
        let doc = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (title, category, file_path, uploaded_by)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(category)
        .bind(file_path)
        .bind(uploaded_by)
        .fetch_one(self.pool)
        .await?;
        Ok(doc)
    }

    pub async fn update(
        &self,
        id: Uuid,
        title: &str,
        category: Option<&str>,
    ) -> Result<Document, DbError> {
        sqlx::query_as::<_, Document>(
            "UPDATE documents SET title = $2, category = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(title)
        .bind(category)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("document", id))
    }

    pub async fn delete(&self, id: Uuid) -> Result<Document, DbError> {
        sqlx::query_as::<_, Document>("DELETE FROM documents WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("document", id))
    }
}
