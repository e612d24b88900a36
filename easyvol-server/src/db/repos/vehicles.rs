//! Vehicle fleet repository

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::models::{Paginated, Pagination};

use super::DbError;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Vehicle {
    pub id: Uuid,
    pub code: String,
    pub plate: Option<String>,
    pub name: String,
    pub vehicle_type: Option<String>,
    pub status: String,
    pub photo_path: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct VehicleDocument {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub title: String,
    pub file_path: String,
    pub expires_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct VehicleInput {
    pub code: String,
    pub plate: Option<String>,
    pub name: String,
    pub vehicle_type: Option<String>,
    pub status: String,
    pub notes: Option<String>,
}

pub struct VehicleRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> VehicleRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        status: Option<&str>,
        page: Pagination,
    ) -> Result<Paginated<Vehicle>, DbError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT *, COUNT(*) OVER() AS total FROM vehicles WHERE 1=1");
        if let Some(status) = status {
            qb.push(" AND status = ").push_bind(status.to_owned());
        }
        qb.push(" ORDER BY code LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows = qb.build().fetch_all(self.pool).await?;
        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(Vehicle::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<Vehicle, DbError> {
        sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("vehicle", id))
    }

    pub async fn create(&self, input: &VehicleInput) -> Result<Vehicle, DbError> {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            INSERT INTO vehicles (code, plate, name, vehicle_type, status, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&input.code)
        .bind(&input.plate)
        .bind(&input.name)
        .bind(&input.vehicle_type)
        .bind(&input.status)
        .bind(&input.notes)
        .fetch_one(self.pool)
        .await
        .map_err(unique_code_conflict)?;

        Ok(vehicle)
    }

    pub async fn update(&self, id: Uuid, input: &VehicleInput) -> Result<Vehicle, DbError> {
        sqlx::query_as::<_, Vehicle>(
            r#"
            UPDATE vehicles SET
                code = $2, plate = $3, name = $4, vehicle_type = $5,
                status = $6, notes = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.code)
        .bind(&input.plate)
        .bind(&input.name)
        .bind(&input.vehicle_type)
        .bind(&input.status)
        .bind(&input.notes)
        .fetch_optional(self.pool)
        .await
        .map_err(unique_code_conflict)?
        .ok_or_else(|| DbError::not_found("vehicle", id))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("vehicle", id));
        }
        Ok(())
    }

    pub async fn set_photo(&self, id: Uuid, photo_path: &str) -> Result<(), DbError> {
        let result =
            sqlx::query("UPDATE vehicles SET photo_path = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(photo_path)
                .execute(self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("vehicle", id));
        }
        Ok(())
    }

    pub async fn documents(&self, vehicle_id: Uuid) -> Result<Vec<VehicleDocument>, DbError> {
        let docs = sqlx::query_as::<_, VehicleDocument>(
            "SELECT * FROM vehicle_documents WHERE vehicle_id = $1 ORDER BY created_at DESC",
        )
        .bind(vehicle_id)
        .fetch_all(self.pool)
        .await?;
        Ok(docs)
    }

    pub async fn add_document(
        &self,
        vehicle_id: Uuid,
        title: &str,
        file_path: &str,
        expires_on: Option<NaiveDate>,
    ) -> Result<VehicleDocument, DbError> {
        self.get(vehicle_id).await?;

        let doc = sqlx::query_as::<_, VehicleDocument>(
            r#"
            INSERT INTO vehicle_documents (vehicle_id, title, file_path, expires_on)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(vehicle_id)
        .bind(title)
        .bind(file_path)
        .bind(expires_on)
        .fetch_one(self.pool)
        .await?;

        Ok(doc)
    }

    /// Documents expiring within `days` (fleet deadline report).
    pub async fn expiring_documents(&self, days: i64) -> Result<Vec<VehicleDocument>, DbError> {
        let docs = sqlx::query_as::<_, VehicleDocument>(
            r#"
            SELECT * FROM vehicle_documents
            WHERE expires_on IS NOT NULL
              AND expires_on <= CURRENT_DATE + $1::bigint
            ORDER BY expires_on
            "#,
        )
        .bind(days)
        .fetch_all(self.pool)
        .await?;
        Ok(docs)
    }
}

/// A duplicate vehicle code violates the unique constraint; surface that as
/// a conflict instead of a generic database error.
fn unique_code_conflict(err: sqlx::Error) -> DbError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return DbError::conflict("a vehicle with this code already exists");
        }
    }
    DbError::Sqlx(err)
}

#[cfg(test)]
mod tests {
    #[tokio::test]
    #[ignore = "requires database"]
    async fn duplicate_code_is_conflict() {
        // Creating two vehicles with the same code must yield
        // DbError::Conflict, not a masked 500.
    }
}
