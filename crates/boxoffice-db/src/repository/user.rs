//! # User Repository
//!
//! Read-mostly copy of users owned by the identity service. Booking only
//! needs two things from it: does the user exist, and what is their email.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use boxoffice_core::User;

/// Repository for user reference rows.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Gets a user by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, email, name FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Inserts a user mirrored from the identity service.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` on a duplicate id or email.
    pub async fn insert(&self, id: &str, email: &str, name: &str) -> DbResult<User> {
        debug!(id = %id, "Inserting user");

        sqlx::query("INSERT INTO users (id, email, name, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(id)
            .bind(email)
            .bind(name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(User {
            id: id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
        })
    }

    /// Inserts or refreshes a user (identity-service sync).
    pub async fn upsert(&self, id: &str, email: &str, name: &str) -> DbResult<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, created_at) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET email = excluded.email, name = excluded.name
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_insert_get_upsert() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();

        repo.insert("u-1", "ada@example.com", "Ada").await.unwrap();
        let err = repo.insert("u-2", "ada@example.com", "Imposter").await.unwrap_err();
        assert!(err.is_unique_violation());

        let updated = repo.upsert("u-1", "ada@lovelace.dev", "Ada L.").await.unwrap();
        assert_eq!(updated.email, "ada@lovelace.dev");
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }
}
