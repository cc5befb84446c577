//! # Waitlist Repository
//!
//! Per-event FIFO queue of users waiting for a freed ticket.
//!
//! ## Ordering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  waitlist (event_id = evt-a)                                            │
//! │                                                                         │
//! │  position │ user │ created_at                                           │
//! │  ─────────┼──────┼──────────────────────                                │
//! │     17    │  A   │ 2026-10-18T09:00:00.120Z   ◄── peek_oldest()        │
//! │     18    │  B   │ 2026-10-18T09:00:00.120Z   (tie: lower position)    │
//! │     23    │  C   │ 2026-10-18T09:00:04.000Z                            │
//! │                                                                         │
//! │  ORDER BY created_at, position                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `UNIQUE (event_id, user_id)` keeps a user from queuing twice.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use boxoffice_core::WaitlistEntry;

/// Repository for waitlist database operations.
#[derive(Debug, Clone)]
pub struct WaitlistRepository {
    pool: SqlitePool,
}

impl WaitlistRepository {
    /// Creates a new WaitlistRepository.
    pub fn new(pool: SqlitePool) -> Self {
        WaitlistRepository { pool }
    }

    /// Appends a user to the event's queue.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` if the user is already queued.
    pub async fn enqueue(
        &self,
        conn: &mut SqliteConnection,
        event_id: &str,
        user_id: &str,
    ) -> DbResult<WaitlistEntry> {
        let created_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO waitlist (event_id, user_id, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(event_id)
        .bind(user_id)
        .bind(created_at)
        .execute(&mut *conn)
        .await?;

        let entry = WaitlistEntry {
            position: result.last_insert_rowid(),
            event_id: event_id.to_string(),
            user_id: user_id.to_string(),
            created_at,
        };

        debug!(event_id = %event_id, user_id = %user_id, position = entry.position, "Enqueued on waitlist");
        Ok(entry)
    }

    /// The head of the queue, if any.
    pub async fn peek_oldest(
        &self,
        conn: &mut SqliteConnection,
        event_id: &str,
    ) -> DbResult<Option<WaitlistEntry>> {
        let entry = sqlx::query_as::<_, WaitlistEntry>(
            r#"
            SELECT position, event_id, user_id, created_at
            FROM waitlist
            WHERE event_id = ?1
            ORDER BY created_at, position
            LIMIT 1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(entry)
    }

    /// Removes a user's entry. Returns false if there was none.
    pub async fn remove(
        &self,
        conn: &mut SqliteConnection,
        event_id: &str,
        user_id: &str,
    ) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM waitlist WHERE event_id = ?1 AND user_id = ?2")
            .bind(event_id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;

        let removed = result.rows_affected() == 1;
        if removed {
            debug!(event_id = %event_id, user_id = %user_id, "Removed from waitlist");
        }
        Ok(removed)
    }

    /// Drops every entry for an event. Returns the number removed.
    pub async fn clear(&self, conn: &mut SqliteConnection, event_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM waitlist WHERE event_id = ?1")
            .bind(event_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// The full queue in promotion order.
    pub async fn list(&self, event_id: &str) -> DbResult<Vec<WaitlistEntry>> {
        let entries = sqlx::query_as::<_, WaitlistEntry>(
            r#"
            SELECT position, event_id, user_id, created_at
            FROM waitlist
            WHERE event_id = ?1
            ORDER BY created_at, position
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn count(&self, event_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM waitlist WHERE event_id = ?1")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn contains(&self, event_id: &str, user_id: &str) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM waitlist WHERE event_id = ?1 AND user_id = ?2)",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::{Database, DbConfig};
    use boxoffice_core::NewEvent;
    use chrono::Duration;

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (id, email) in [("a", "a@example.com"), ("b", "b@example.com"), ("c", "c@example.com")] {
            db.users().insert(id, email, id).await.unwrap();
        }
        let event = db
            .events()
            .insert(&NewEvent {
                name: "Sold Out Show".into(),
                description: None,
                date: Utc::now() + Duration::days(1),
                location: "Accra".into(),
                organizer: None,
                price_minor: 0,
                total_tickets: 1,
            })
            .await
            .unwrap();
        (db, event.id)
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let (db, event_id) = setup().await;
        let repo = db.waitlist();

        let mut tx = db.begin().await.unwrap();
        for user in ["a", "b", "c"] {
            repo.enqueue(&mut tx, &event_id, user).await.unwrap();
        }
        let head = repo.peek_oldest(&mut tx, &event_id).await.unwrap().unwrap();
        assert_eq!(head.user_id, "a");
        tx.commit().await.unwrap();

        let users: Vec<_> = repo
            .list(&event_id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.user_id)
            .collect();
        assert_eq!(users, vec!["a", "b", "c"]);
        assert_eq!(repo.count(&event_id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_equal_timestamps_break_ties_by_position() {
        let (db, event_id) = setup().await;
        let stamp = Utc::now();
        for user in ["c", "a"] {
            sqlx::query("INSERT INTO waitlist (event_id, user_id, created_at) VALUES (?1, ?2, ?3)")
                .bind(&event_id)
                .bind(user)
                .bind(stamp)
                .execute(db.pool())
                .await
                .unwrap();
        }

        let mut conn = db.pool().acquire().await.unwrap();
        let head = db
            .waitlist()
            .peek_oldest(&mut conn, &event_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(head.user_id, "c");
    }

    #[tokio::test]
    async fn test_duplicate_enqueue_and_remove() {
        let (db, event_id) = setup().await;
        let repo = db.waitlist();

        let mut tx = db.begin().await.unwrap();
        repo.enqueue(&mut tx, &event_id, "a").await.unwrap();
        let err = repo.enqueue(&mut tx, &event_id, "a").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        repo.enqueue(&mut tx, &event_id, "b").await.unwrap();
        assert!(repo.remove(&mut tx, &event_id, "a").await.unwrap());
        assert!(!repo.remove(&mut tx, &event_id, "a").await.unwrap());
        tx.commit().await.unwrap();

        assert!(!repo.contains(&event_id, "a").await.unwrap());
        assert!(repo.contains(&event_id, "b").await.unwrap());

        let mut tx = db.begin().await.unwrap();
        assert_eq!(repo.clear(&mut tx, &event_id).await.unwrap(), 1);
        tx.commit().await.unwrap();
        assert_eq!(repo.count(&event_id).await.unwrap(), 0);
    }
}
