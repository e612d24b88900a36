//! Deadline scheduler repository
//!
//! Items carry a due date, a reminder window and a status. Anything past
//! due and still pending is flipped to `overdue` by `refresh_overdue`,
//! which runs before every read so the stored status never lags reality.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::models::{Paginated, Pagination, SchedulerStatus};

use super::DbError;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SchedulerItem {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub due_date: NaiveDate,
    pub status: String,
    pub assigned_to: Option<Uuid>,
    pub reminder_days: i32,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SchedulerItemInput {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub due_date: NaiveDate,
    pub assigned_to: Option<Uuid>,
    pub reminder_days: i32,
}

#[derive(Debug, Clone, Default)]
pub struct SchedulerFilter {
    pub status: Option<SchedulerStatus>,
    pub category: Option<String>,
}

/// Dashboard counters
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerCounts {
    pub pending: i64,
    pub overdue: i64,
    pub completed: i64,
    pub due_this_week: i64,
}

pub struct SchedulerRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> SchedulerRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Flip pending items past their due date to overdue.
    pub async fn refresh_overdue(&self) -> Result<u64, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE scheduler_items
            SET status = 'overdue', updated_at = NOW()
            WHERE status = 'pending' AND due_date < CURRENT_DATE
            "#,
        )
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn list(
        &self,
        filter: &SchedulerFilter,
        page: Pagination,
    ) -> Result<Paginated<SchedulerItem>, DbError> {
        self.refresh_overdue().await?;

        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT *, COUNT(*) OVER() AS total FROM scheduler_items WHERE 1=1");
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(category) = &filter.category {
            qb.push(" AND category = ").push_bind(category.clone());
        }
        qb.push(" ORDER BY due_date, title LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows = qb.build().fetch_all(self.pool).await?;
        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(SchedulerItem::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<SchedulerItem, DbError> {
        sqlx::query_as::<_, SchedulerItem>("SELECT * FROM scheduler_items WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("scheduler item", id))
    }

    pub async fn create(
        &self,
        input: &SchedulerItemInput,
        created_by: Uuid,
    ) -> Result<SchedulerItem, DbError> {
        let item = sqlx::query_as::<_, SchedulerItem>(
            r#"
            INSERT INTO scheduler_items
                (title, description, category, due_date, assigned_to, reminder_days, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.category)
        .bind(input.due_date)
        .bind(input.assigned_to)
        .bind(input.reminder_days)
        .bind(created_by)
        .fetch_one(self.pool)
        .await?;
        Ok(item)
    }

    pub async fn update(&self, id: Uuid, input: &SchedulerItemInput) -> Result<SchedulerItem, DbError> {
        sqlx::query_as::<_, SchedulerItem>(
            r#"
            UPDATE scheduler_items SET
                title = $2, description = $3, category = $4, due_date = $5,
                assigned_to = $6, reminder_days = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.category)
        .bind(input.due_date)
        .bind(input.assigned_to)
        .bind(input.reminder_days)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("scheduler item", id))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM scheduler_items WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("scheduler item", id));
        }
        Ok(())
    }

    /// Mark an item completed. Completing twice keeps the first completion
    /// timestamp and author.
    pub async fn complete(&self, id: Uuid, completed_by: Uuid) -> Result<SchedulerItem, DbError> {
        let updated = sqlx::query_as::<_, SchedulerItem>(
            r#"
            UPDATE scheduler_items SET
                status = 'completed', completed_at = NOW(), completed_by = $2,
                updated_at = NOW()
            WHERE id = $1 AND status <> 'completed'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(completed_by)
        .fetch_optional(self.pool)
        .await?;

        match updated {
            Some(item) => Ok(item),
            None => self.get(id).await,
        }
    }

    /// Items not yet completed and due within `days` of today, or within
    /// each item's own reminder window when no horizon is given.
    pub async fn upcoming(&self, days: Option<i32>) -> Result<Vec<SchedulerItem>, DbError> {
        self.refresh_overdue().await?;

        let items = match days {
            Some(days) => {
                sqlx::query_as::<_, SchedulerItem>(
                    r#"
                    SELECT * FROM scheduler_items
                    WHERE status <> 'completed'
                      AND due_date <= CURRENT_DATE + $1
                    ORDER BY due_date
                    "#,
                )
                .bind(days)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, SchedulerItem>(
                    r#"
                    SELECT * FROM scheduler_items
                    WHERE status <> 'completed'
                      AND due_date <= CURRENT_DATE + reminder_days
                    ORDER BY due_date
                    "#,
                )
                .fetch_all(self.pool)
                .await?
            }
        };
        Ok(items)
    }

    pub async fn counts(&self) -> Result<SchedulerCounts, DbError> {
        self.refresh_overdue().await?;

        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'overdue') AS overdue,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                COUNT(*) FILTER (
                    WHERE status <> 'completed'
                      AND due_date BETWEEN CURRENT_DATE AND CURRENT_DATE + 7
                ) AS due_this_week
            FROM scheduler_items
            "#,
        )
        .fetch_one(self.pool)
        .await?;

        Ok(SchedulerCounts {
            pending: row.get("pending"),
            overdue: row.get("overdue"),
            completed: row.get("completed"),
            due_this_week: row.get("due_this_week"),
        })
    }
}

#[cfg(test)]
mod tests {
    #[tokio::test]
    #[ignore = "requires database"]
    async fn complete_is_idempotent() {
        // Completing a completed item must return it unchanged, keeping
        // the original completed_at and completed_by.
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn past_due_pending_becomes_overdue_on_read() {}
}
