//! Activity log repository

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::models::{Paginated, Pagination};

use super::DbError;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub module: String,
    pub action: String,
    pub record_id: Option<Uuid>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub user_id: Option<Uuid>,
    pub module: Option<String>,
}

pub struct ActivityRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> ActivityRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(
        &self,
        user_id: Uuid,
        module: &str,
        action: &str,
        record_id: Option<Uuid>,
        description: Option<&str>,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO activity_log (user_id, module, action, record_id, description)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user_id)
        .bind(module)
        .bind(action)
        .bind(record_id)
        .bind(description)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn list(
        &self,
        filter: &ActivityFilter,
        page: Pagination,
    ) -> Result<Paginated<ActivityEntry>, DbError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT *, COUNT(*) OVER() AS total FROM activity_log WHERE 1=1");
        if let Some(user_id) = filter.user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(module) = &filter.module {
            qb.push(" AND module = ").push_bind(module.clone());
        }
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows = qb.build().fetch_all(self.pool).await?;
        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(ActivityEntry::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }
}
