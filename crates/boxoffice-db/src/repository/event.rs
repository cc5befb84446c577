//! # Event Repository
//!
//! Event rows and the inventory counter.
//!
//! ## Guarded Counter
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 available_tickets never leaves [0, total]               │
//! │                                                                         │
//! │  decrement_available(n):                                               │
//! │    UPDATE events SET available_tickets = available_tickets - n         │
//! │     WHERE id = ? AND available_tickets >= n                            │
//! │                                                                         │
//! │  increment_available(n):                                               │
//! │    UPDATE events SET available_tickets = available_tickets + n         │
//! │     WHERE id = ? AND available_tickets + n <= total_tickets            │
//! │                                                                         │
//! │  0 rows affected ──► DbError::InvariantViolation (caller rolls back)   │
//! │                                                                         │
//! │  Second line of defence: CHECK (available_tickets BETWEEN 0 AND total) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use boxoffice_core::{Event, EventStatus, NewEvent};

/// Repository for event database operations.
///
/// Methods taking a `SqliteConnection` run inside the caller's transaction;
/// the rest use the pool directly.
#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: SqlitePool,
}

impl EventRepository {
    /// Creates a new EventRepository.
    pub fn new(pool: SqlitePool) -> Self {
        EventRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets an event by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            SELECT id, name, description, date, location, organizer,
                   price_minor, total_tickets, available_tickets, status,
                   created_at, updated_at
            FROM events
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// Reads an event inside a transaction (sees the transaction's writes).
    pub async fn get_in(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Event> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            SELECT id, name, description, date, location, organizer,
                   price_minor, total_tickets, available_tickets, status,
                   created_at, updated_at
            FROM events
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        event.ok_or_else(|| DbError::not_found("Event", id))
    }

    /// Lists events ordered by date, optionally filtered by status.
    pub async fn list(&self, status: Option<EventStatus>) -> DbResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(
            r#"
            SELECT id, name, description, date, location, organizer,
                   price_minor, total_tickets, available_tickets, status,
                   created_at, updated_at
            FROM events
            WHERE ?1 IS NULL OR status = ?1
            ORDER BY date, created_at
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// IDs of active events whose date is strictly before `now`.
    pub async fn expired_candidates(&self, now: DateTime<Utc>) -> DbResult<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM events
            WHERE status = 'active' AND julianday(date) < julianday(?1)
            ORDER BY date
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Inserts a new active event with `available_tickets = total_tickets`.
    ///
    /// Input is assumed validated by the caller.
    pub async fn insert(&self, new: &NewEvent) -> DbResult<Event> {
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            description: new.description.clone(),
            date: new.date,
            location: new.location.trim().to_string(),
            organizer: new.organizer.clone(),
            price_minor: new.price_minor,
            total_tickets: new.total_tickets,
            available_tickets: new.total_tickets,
            status: EventStatus::Active,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %event.id, name = %event.name, total = event.total_tickets, "Inserting event");

        sqlx::query(
            r#"
            INSERT INTO events (
                id, name, description, date, location, organizer,
                price_minor, total_tickets, available_tickets, status,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&event.id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(event.date)
        .bind(&event.location)
        .bind(&event.organizer)
        .bind(event.price_minor)
        .bind(event.total_tickets)
        .bind(event.available_tickets)
        .bind(event.status)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(event)
    }

    /// Writes the descriptive fields of `event` back to its row.
    ///
    /// Capacity, counter and status are never touched here. Only applies
    /// while the row is still `active`; returns the stored row.
    pub async fn update_details(&self, event: &Event) -> DbResult<Event> {
        debug!(id = %event.id, "Updating event details");

        let result = sqlx::query(
            r#"
            UPDATE events
            SET name = ?2, description = ?3, date = ?4, location = ?5,
                organizer = ?6, price_minor = ?7, updated_at = ?8
            WHERE id = ?1 AND status = 'active'
            "#,
        )
        .bind(&event.id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(event.date)
        .bind(&event.location)
        .bind(&event.organizer)
        .bind(event.price_minor)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Active event", &event.id));
        }

        self.get_by_id(&event.id)
            .await?
            .ok_or_else(|| DbError::not_found("Event", &event.id))
    }

    /// Moves an event from `from` to `to`. Returns false if it was not in
    /// `from` (already transitioned, or missing).
    pub async fn set_status(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        from: EventStatus,
        to: EventStatus,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET status = ?3, updated_at = ?4
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        let changed = result.rows_affected() == 1;
        debug!(id = %id, from = from.as_str(), to = to.as_str(), changed, "Event status update");
        Ok(changed)
    }

    /// Takes `n` tickets out of inventory.
    ///
    /// ## Errors
    /// `DbError::InvariantViolation` if fewer than `n` are available (or the
    /// event is missing). Nothing is written in that case.
    pub async fn decrement_available(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        n: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET available_tickets = available_tickets - ?2, updated_at = ?3
            WHERE id = ?1 AND available_tickets >= ?2
            "#,
        )
        .bind(id)
        .bind(n)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            error!(event_id = %id, n, "Refusing to drive available_tickets below zero");
            return Err(DbError::invariant(
                id,
                format!("available_tickets would drop below 0 (decrement by {n})"),
            ));
        }

        debug!(event_id = %id, n, "Decremented available_tickets");
        Ok(())
    }

    /// Returns `n` tickets to inventory.
    ///
    /// ## Errors
    /// `DbError::InvariantViolation` if that would exceed `total_tickets`.
    pub async fn increment_available(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        n: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET available_tickets = available_tickets + ?2, updated_at = ?3
            WHERE id = ?1 AND available_tickets + ?2 <= total_tickets
            "#,
        )
        .bind(id)
        .bind(n)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            error!(event_id = %id, n, "Refusing to drive available_tickets above capacity");
            return Err(DbError::invariant(
                id,
                format!("available_tickets would exceed total_tickets (increment by {n})"),
            ));
        }

        debug!(event_id = %id, n, "Incremented available_tickets");
        Ok(())
    }

    /// Deletes an event row. Returns false if it did not exist.
    ///
    /// Fails with `ForeignKeyViolation` while tickets reference it.
    pub async fn delete(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        debug!(id = %id, deleted = result.rows_affected(), "Deleted event");
        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::Duration;

    fn new_event(total: i64, date: DateTime<Utc>) -> NewEvent {
        NewEvent {
            name: "  Jazz Night ".into(),
            description: None,
            date,
            location: "Lagos".into(),
            organizer: None,
            price_minor: 100_000,
            total_tickets: total,
        }
    }

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = setup().await;
        let created = db
            .events()
            .insert(&new_event(3, Utc::now() + Duration::days(7)))
            .await
            .unwrap();

        assert_eq!(created.name, "Jazz Night");
        assert_eq!(created.available_tickets, 3);
        assert_eq!(created.status, EventStatus::Active);

        let fetched = db.events().get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.total_tickets, 3);
        assert_eq!(fetched.date.timestamp(), created.date.timestamp());
    }

    #[tokio::test]
    async fn test_counter_is_guarded_at_both_ends() {
        let db = setup().await;
        let repo = db.events();
        let event = repo
            .insert(&new_event(1, Utc::now() + Duration::days(1)))
            .await
            .unwrap();

        let mut tx = db.begin().await.unwrap();
        let err = repo
            .increment_available(&mut tx, &event.id, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvariantViolation { .. }));

        repo.decrement_available(&mut tx, &event.id, 1).await.unwrap();
        let err = repo
            .decrement_available(&mut tx, &event.id, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvariantViolation { .. }));
        tx.commit().await.unwrap();

        let stored = repo.get_by_id(&event.id).await.unwrap().unwrap();
        assert_eq!(stored.available_tickets, 0);
    }

    #[tokio::test]
    async fn test_check_constraint_backstop() {
        let db = setup().await;
        let event = db
            .events()
            .insert(&new_event(2, Utc::now() + Duration::days(1)))
            .await
            .unwrap();

        let err: DbError = sqlx::query("UPDATE events SET available_tickets = 5 WHERE id = ?1")
            .bind(&event.id)
            .execute(db.pool())
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[tokio::test]
    async fn test_expired_candidates_and_status() {
        let db = setup().await;
        let repo = db.events();
        let past = repo
            .insert(&new_event(1, Utc::now() - Duration::hours(1)))
            .await
            .unwrap();
        let future = repo
            .insert(&new_event(1, Utc::now() + Duration::hours(1)))
            .await
            .unwrap();

        let ids = repo.expired_candidates(Utc::now()).await.unwrap();
        assert_eq!(ids, vec![past.id.clone()]);
        assert!(!ids.contains(&future.id));

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(repo
            .set_status(&mut conn, &past.id, EventStatus::Active, EventStatus::Expired)
            .await
            .unwrap());
        assert!(!repo
            .set_status(&mut conn, &past.id, EventStatus::Active, EventStatus::Expired)
            .await
            .unwrap());
        drop(conn);

        assert!(repo.expired_candidates(Utc::now()).await.unwrap().is_empty());
        assert_eq!(repo.list(Some(EventStatus::Expired)).await.unwrap().len(), 1);
        assert_eq!(repo.list(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_details_leaves_capacity() {
        let db = setup().await;
        let repo = db.events();
        let mut event = repo
            .insert(&new_event(4, Utc::now() + Duration::days(2)))
            .await
            .unwrap();

        event.name = "Jazz Night II".into();
        event.total_tickets = 400;
        let stored = repo.update_details(&event).await.unwrap();
        assert_eq!(stored.name, "Jazz Night II");
        assert_eq!(stored.total_tickets, 4);
    }
}
