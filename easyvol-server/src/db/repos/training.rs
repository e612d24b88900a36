//! Training course repository

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use crate::models::{Paginated, Pagination};

use super::DbError;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TrainingCourse {
    pub id: Uuid,
    pub title: String,
    pub course_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub instructor: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TrainingAttendance {
    pub course_id: Uuid,
    pub member_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub status: String,
    pub hours: f64,
}

#[derive(Debug, Clone)]
pub struct TrainingCourseInput {
    pub title: String,
    pub course_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub instructor: Option<String>,
    pub notes: Option<String>,
}

pub struct TrainingRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> TrainingRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, page: Pagination) -> Result<Paginated<TrainingCourse>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT *, COUNT(*) OVER() AS total
            FROM training_courses
            ORDER BY start_date DESC NULLS LAST, title
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(self.pool)
        .await?;

        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(TrainingCourse::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<TrainingCourse, DbError> {
        sqlx::query_as::<_, TrainingCourse>("SELECT * FROM training_courses WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("training course", id))
    }

    pub async fn create(&self, input: &TrainingCourseInput) -> Result<TrainingCourse, DbError> {
        let course = sqlx::query_as::<_, TrainingCourse>(
            r#"
            INSERT INTO training_courses
                (title, course_type, start_date, end_date, location, instructor, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&input.title)
        .bind(&input.course_type)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&input.location)
        .bind(&input.instructor)
        .bind(&input.notes)
        .fetch_one(self.pool)
        .await?;
        Ok(course)
    }

    pub async fn update(&self, id: Uuid, input: &TrainingCourseInput) -> Result<TrainingCourse, DbError> {
        sqlx::query_as::<_, TrainingCourse>(
            r#"
            UPDATE training_courses SET
                title = $2, course_type = $3, start_date = $4, end_date = $5,
                location = $6, instructor = $7, notes = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.course_type)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&input.location)
        .bind(&input.instructor)
        .bind(&input.notes)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("training course", id))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM training_courses WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("training course", id));
        }
        Ok(())
    }

    pub async fn attendance(&self, course_id: Uuid) -> Result<Vec<TrainingAttendance>, DbError> {
        let attendance = sqlx::query_as::<_, TrainingAttendance>(
            r#"
            SELECT ta.course_id, ta.member_id, m.first_name, m.last_name,
                   ta.status, ta.hours
            FROM training_attendance ta
            JOIN members m ON m.id = ta.member_id
            WHERE ta.course_id = $1
            ORDER BY m.last_name, m.first_name
            "#,
        )
        .bind(course_id)
        .fetch_all(self.pool)
        .await?;
        Ok(attendance)
    }

    pub async fn set_attendance(
        &self,
        course_id: Uuid,
        member_id: Uuid,
        status: &str,
        hours: f64,
    ) -> Result<(), DbError> {
        self.get(course_id).await?;

        sqlx::query(
            r#"
            INSERT INTO training_attendance (course_id, member_id, status, hours)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (course_id, member_id)
            DO UPDATE SET status = EXCLUDED.status, hours = EXCLUDED.hours
            "#,
        )
        .bind(course_id)
        .bind(member_id)
        .bind(status)
        .bind(hours)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #[tokio::test]
    #[ignore = "requires database"]
    async fn attendance_upserts_hours() {}
}
