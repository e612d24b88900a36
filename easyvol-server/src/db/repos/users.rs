//! User and role administration repository
//!
//! Effective permissions are the union of the role's grants and the user's
//! direct grants; both sides are managed here, resolution lives in the
//! session layer.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use easyvol_core::{Action, Module};

use crate::models::{Paginated, Pagination};

use super::DbError;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub password_salt: String,
    pub display_name: String,
    pub email: Option<String>,
    pub role_id: Option<Uuid>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UserInput {
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
    pub role_id: Option<Uuid>,
    pub active: bool,
}

pub struct UserRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, page: Pagination) -> Result<Paginated<User>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT *, COUNT(*) OVER() AS total
            FROM users
            ORDER BY username
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
            .map(User::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<User, DbError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("user", id))
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    pub async fn create(
        &self,
        input: &UserInput,
        password_hash: &str,
        password_salt: &str,
    ) -> Result<User, DbError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users
                (username, password_hash, password_salt, display_name, email, role_id, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&input.username)
        .bind(password_hash)
        .bind(password_salt)
        .bind(&input.display_name)
        .bind(&input.email)
        .bind(input.role_id)
        .bind(input.active)
        .fetch_one(self.pool)
        .await
        .map_err(duplicate_username)?;
        Ok(user)
    }

    pub async fn update(&self, id: Uuid, input: &UserInput) -> Result<User, DbError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                username = $2, display_name = $3, email = $4, role_id = $5, active = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.username)
        .bind(&input.display_name)
        .bind(&input.email)
        .bind(input.role_id)
        .bind(input.active)
        .fetch_optional(self.pool)
        .await
        .map_err(duplicate_username)?
        .ok_or_else(|| DbError::not_found("user", id))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("user", id));
        }
        Ok(())
    }

    pub async fn set_password(
        &self,
        id: Uuid,
        password_hash: &str,
        password_salt: &str,
    ) -> Result<(), DbError> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, password_salt = $3 WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .bind(password_salt)
                .execute(self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("user", id));
        }
        Ok(())
    }

    /// Replace the user's direct permission grants with the given pairs.
    pub async fn replace_user_permissions(
        &self,
        user_id: Uuid,
        grants: &[(Module, Action)],
    ) -> Result<(), DbError> {
        self.get(user_id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM user_permissions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        for (module, action) in grants {
            sqlx::query(
                r#"
                INSERT INTO user_permissions (user_id, permission_id)
                SELECT $1, id FROM permissions WHERE module = $2 AND action = $3
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(module.as_str())
            .bind(action.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Module/action pairs granted directly to a user, excluding whatever
    /// the role contributes.
    pub async fn user_grants(&self, user_id: Uuid) -> Result<Vec<(String, String)>, DbError> {
        let grants: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT p.module, p.action
            FROM user_permissions up
            JOIN permissions p ON p.id = up.permission_id
            WHERE up.user_id = $1
            ORDER BY p.module, p.action
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(grants)
    }

    pub async fn roles(&self) -> Result<Vec<Role>, DbError> {
        let roles = sqlx::query_as::<_, Role>("SELECT * FROM roles ORDER BY name")
            .fetch_all(self.pool)
            .await?;
        Ok(roles)
    }

    pub async fn create_role(&self, name: &str) -> Result<Role, DbError> {
        let role = sqlx::query_as::<_, Role>(
            "INSERT INTO roles (name) VALUES ($1) RETURNING *",
        )
        .bind(name)
        .fetch_one(self.pool)
        .await
        .map_err(|err| {
            if let sqlx::Error::Database(db) = &err {
                if db.is_unique_violation() {
                    return DbError::conflict("a role with this name already exists");
                }
            }
            DbError::Sqlx(err)
        })?;
        Ok(role)
    }

    pub async fn delete_role(&self, id: Uuid) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("role", id));
        }
        Ok(())
    }

    /// Replace a role's grants.
    pub async fn replace_role_permissions(
        &self,
        role_id: Uuid,
        grants: &[(Module, Action)],
    ) -> Result<(), DbError> {
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM roles WHERE id = $1")
            .bind(role_id)
            .fetch_optional(self.pool)
            .await?;
        if exists.is_none() {
            return Err(DbError::not_found("role", role_id));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;
        for (module, action) in grants {
            sqlx::query(
                r#"
                INSERT INTO role_permissions (role_id, permission_id)
                SELECT $1, id FROM permissions WHERE module = $2 AND action = $3
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(role_id)
            .bind(module.as_str())
            .bind(action.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Module/action pairs granted to a role.
    pub async fn role_grants(&self, role_id: Uuid) -> Result<Vec<(String, String)>, DbError> {
        let grants: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT p.module, p.action
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role_id = $1
            ORDER BY p.module, p.action
            "#,
        )
        .bind(role_id)
        .fetch_all(self.pool)
        .await?;
        Ok(grants)
    }
}

fn duplicate_username(err: sqlx::Error) -> DbError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return DbError::conflict("a user with this username already exists");
        }
    }
    DbError::Sqlx(err)
}

#[cfg(test)]
mod tests {
    #[tokio::test]
    #[ignore = "requires database"]
    async fn replace_permissions_is_total() {
        // After replace_user_permissions the user holds exactly the given
        // pairs, nothing from before the call.
    }
}
