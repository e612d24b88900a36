//! Session storage

use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use easyvol_core::PermissionSet;

use crate::db::repos::DbError;

use super::AuthenticatedUser;

/// Sessions last 12 hours from login.
const SESSION_HOURS: i64 = 12;

#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub token: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> SessionRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: Uuid) -> Result<Session, DbError> {
        let expires_at = Utc::now() + Duration::hours(SESSION_HOURS);
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (user_id, expires_at)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(self.pool)
        .await?;
        Ok(session)
    }

    /// Resolve a bearer token to its user, with permissions freshly loaded.
    ///
    /// Returns `None` for unknown tokens, expired sessions and deactivated
    /// users alike; the caller cannot tell which.
    pub async fn authenticate(&self, token: Uuid) -> Result<Option<AuthenticatedUser>, DbError> {
        let row: Option<(Uuid, String, String)> = sqlx::query_as(
            r#"
            SELECT u.id, u.username, u.display_name
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token = $1 AND s.expires_at > NOW() AND u.active
            "#,
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        let Some((id, username, display_name)) = row else {
            return Ok(None);
        };

        let permissions = self.load_permissions(id).await?;
        Ok(Some(AuthenticatedUser {
            id,
            username,
            display_name,
            permissions,
        }))
    }

    /// Role grants unioned with user-specific grants.
    pub async fn load_permissions(&self, user_id: Uuid) -> Result<PermissionSet, DbError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT p.module, p.action
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            JOIN users u ON u.role_id = rp.role_id
            WHERE u.id = $1
            UNION
            SELECT p.module, p.action
            FROM user_permissions up
            JOIN permissions p ON p.id = up.permission_id
            WHERE up.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(PermissionSet::from_rows(rows))
    }

    /// Logout. Deleting an already-gone token is not an error.
    pub async fn delete(&self, token: Uuid) -> Result<(), DbError> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    #[tokio::test]
    #[ignore = "requires database"]
    async fn expired_session_does_not_authenticate() {}

    #[tokio::test]
    #[ignore = "requires database"]
    async fn permissions_are_role_union_user() {
        // A grant present on the role OR directly on the user must appear
        // exactly once in the resolved set.
    }
}
