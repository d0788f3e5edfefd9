//! Customer accounts.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::db::DbError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string, or the raw password when hashing is disabled
    #[serde(skip_serializing)]
    pub password: String,
}

/// Body of `POST /api/register/` once it has passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl User {
    /// Insert a new user. Fails with [`DbError::Conflict`] when the email is
    /// already registered.
    pub async fn create(
        db: &SqlitePool,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, DbError> {
        let id = sqlx::query("INSERT INTO users (name, email, password) VALUES (?, ?, ?)")
            .bind(name)
            .bind(email)
            .bind(password)
            .execute(db)
            .await?
            .last_insert_rowid();

        Self::get_by_id(db, id).await
    }

    pub async fn email_exists(db: &SqlitePool, email: &str) -> Result<bool, DbError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(db)
            .await?;
        Ok(row.is_some())
    }

    pub async fn get_by_id(db: &SqlitePool, id: i64) -> Result<User, DbError> {
        sqlx::query_as::<_, User>("SELECT id, name, email, password FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or(DbError::NotFound("User"))
    }
}
