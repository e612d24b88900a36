//! Print template repository

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::models::{Paginated, Pagination, TemplateKind};

use super::DbError;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PrintTemplate {
    pub id: Uuid,
    pub name: String,
    pub entity_type: String,
    pub template_kind: String,
    pub html_content: String,
    pub paper_size: String,
    pub orientation: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PrintTemplateInput {
    pub name: String,
    pub entity_type: String,
    pub template_kind: TemplateKind,
    pub html_content: String,
    pub paper_size: String,
    pub orientation: String,
}

pub struct TemplateRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> TemplateRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        entity_type: Option<&str>,
        page: Pagination,
    ) -> Result<Paginated<PrintTemplate>, DbError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT *, COUNT(*) OVER() AS total FROM print_templates WHERE 1=1");
        if let Some(entity_type) = entity_type {
            qb.push(" AND entity_type = ").push_bind(entity_type.to_owned());
        }
        qb.push(" ORDER BY name LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows = qb.build().fetch_all(self.pool).await?;
        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(PrintTemplate::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<PrintTemplate, DbError> {
        sqlx::query_as::<_, PrintTemplate>("SELECT * FROM print_templates WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("print template", id))
    }

    pub async fn create(
        &self,
        input: &PrintTemplateInput,
        created_by: Uuid,
    ) -> Result<PrintTemplate, DbError> {
        let template = sqlx::query_as::<_, PrintTemplate>(
            r#"
            INSERT INTO print_templates
                (name, entity_type, template_kind, html_content, paper_size, orientation, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.entity_type)
        .bind(input.template_kind.as_str())
        .bind(&input.html_content)
        .bind(&input.paper_size)
        .bind(&input.orientation)
        .bind(created_by)
        .fetch_one(self.pool)
        .await?;
        Ok(template)
    }

    pub async fn update(&self, id: Uuid, input: &PrintTemplateInput) -> Result<PrintTemplate, DbError> {
        sqlx::query_as::<_, PrintTemplate>(
            r#"
            UPDATE print_templates SET
                name = $2, entity_type = $3, template_kind = $4, html_content = $5,
                paper_size = $6, orientation = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.entity_type)
        .bind(input.template_kind.as_str())
        .bind(&input.html_content)
        .bind(&input.paper_size)
        .bind(&input.orientation)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("print template", id))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM print_templates WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("print template", id));
        }
        Ok(())
    }
}
