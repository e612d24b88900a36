//! Events repository: emergencies, drills, association activities
//!
//! Each event carries a participant roster (members with role and hours)
//! and the vehicles deployed for it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::models::{Paginated, Pagination};

use super::DbError;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub event_type: String,
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub status: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Roster row joined with the member's name for display
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EventParticipant {
    pub event_id: Uuid,
    pub member_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<String>,
    pub hours: f64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EventVehicle {
    pub event_id: Uuid,
    pub vehicle_id: Uuid,
    pub code: String,
    pub plate: Option<String>,
    pub name: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EventInput {
    pub event_type: String,
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub event_type: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

pub struct EventRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> EventRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        filter: &EventFilter,
        page: Pagination,
    ) -> Result<Paginated<Event>, DbError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT *, COUNT(*) OVER() AS total FROM events WHERE 1=1");
        if let Some(event_type) = &filter.event_type {
            qb.push(" AND event_type = ").push_bind(event_type.clone());
        }
        if let Some(status) = &filter.status {
            qb.push(" AND status = ").push_bind(status.clone());
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search);
            qb.push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR location ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY start_date DESC LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows = qb.build().fetch_all(self.pool).await?;
        let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
        let items = rows
            .iter()
            .map(Event::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<Event, DbError> {
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("event", id))
    }

    pub async fn create(&self, input: &EventInput, created_by: Uuid) -> Result<Event, DbError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events
                (event_type, title, description, start_date, end_date, location, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&input.event_type)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&input.location)
        .bind(&input.status)
        .bind(created_by)
        .fetch_one(self.pool)
        .await?;
        Ok(event)
    }

    pub async fn update(&self, id: Uuid, input: &EventInput) -> Result<Event, DbError> {
        sqlx::query_as::<_, Event>(
            r#"
            UPDATE events SET
                event_type = $2, title = $3, description = $4, start_date = $5,
                end_date = $6, location = $7, status = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.event_type)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&input.location)
        .bind(&input.status)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("event", id))
    }

    /// Delete an event. Roster and vehicle rows go with it (FK cascade).
    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("event", id));
        }
        Ok(())
    }

    pub async fn participants(&self, event_id: Uuid) -> Result<Vec<EventParticipant>, DbError> {
        let participants = sqlx::query_as::<_, EventParticipant>(
            r#"
            SELECT ep.event_id, ep.member_id, m.first_name, m.last_name,
                   ep.role, ep.hours
            FROM event_participants ep
            JOIN members m ON m.id = ep.member_id
            WHERE ep.event_id = $1
            ORDER BY m.last_name, m.first_name
            "#,
        )
        .bind(event_id)
        .fetch_all(self.pool)
        .await?;
        Ok(participants)
    }

    /// Register (or update) a participant's role and hours.
    pub async fn set_participant(
        &self,
        event_id: Uuid,
        member_id: Uuid,
        role: Option<&str>,
        hours: f64,
    ) -> Result<(), DbError> {
        self.get(event_id).await?;

        sqlx::query(
            r#"
            INSERT INTO event_participants (event_id, member_id, role, hours)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (event_id, member_id)
            DO UPDATE SET role = EXCLUDED.role, hours = EXCLUDED.hours
            "#,
        )
        .bind(event_id)
        .bind(member_id)
        .bind(role)
        .bind(hours)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove_participant(
        &self,
        event_id: Uuid,
        member_id: Uuid,
    ) -> Result<(), DbError> {
        let result =
            sqlx::query("DELETE FROM event_participants WHERE event_id = $1 AND member_id = $2")
                .bind(event_id)
                .bind(member_id)
                .execute(self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("event participant", member_id));
        }
        Ok(())
    }

    pub async fn vehicles(&self, event_id: Uuid) -> Result<Vec<EventVehicle>, DbError> {
        let vehicles = sqlx::query_as::<_, EventVehicle>(
            r#"
            SELECT ev.event_id, ev.vehicle_id, v.code, v.plate, v.name, ev.notes
            FROM event_vehicles ev
            JOIN vehicles v ON v.id = ev.vehicle_id
            WHERE ev.event_id = $1
            ORDER BY v.code
            "#,
        )
        .bind(event_id)
        .fetch_all(self.pool)
        .await?;
        Ok(vehicles)
    }

    /// Replace the full vehicle deployment for an event in one transaction.
    pub async fn replace_vehicles(
        &self,
        event_id: Uuid,
        vehicles: &[(Uuid, Option<String>)],
    ) -> Result<Vec<EventVehicle>, DbError> {
        self.get(event_id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM event_vehicles WHERE event_id = $1")
            .bind(event_id)
            .execute(&mut *tx)
            .await?;
        for (vehicle_id, notes) in vehicles {
            sqlx::query(
                "INSERT INTO event_vehicles (event_id, vehicle_id, notes) VALUES ($1, $2, $3)",
            )
            .bind(event_id)
            .bind(vehicle_id)
            .bind(notes)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        self.vehicles(event_id).await
    }
}

#[cfg(test)]
mod tests {
    #[tokio::test]
    #[ignore = "requires database"]
    async fn set_participant_upserts() {
        // Registering the same member twice must leave one roster row
        // holding the second role and hours.
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn replace_vehicles_is_atomic() {}
}
