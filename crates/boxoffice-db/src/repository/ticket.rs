//! # Ticket Repository
//!
//! Ticket rows. A ticket is written once as `booked` and may later flip to
//! `cancelled`; cancelled rows are kept and never reused.
//!
//! The partial unique index `idx_tickets_one_booked` guarantees at most one
//! booked ticket per (event, user) even if a caller skips the pre-check.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use boxoffice_core::{Ticket, TicketStatus};

/// Repository for ticket database operations.
#[derive(Debug, Clone)]
pub struct TicketRepository {
    pool: SqlitePool,
}

impl TicketRepository {
    /// Creates a new TicketRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TicketRepository { pool }
    }

    /// Gets a ticket by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            SELECT id, event_id, user_id, status, payment_reference, created_at, updated_at
            FROM tickets
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ticket)
    }

    /// Whether `user_id` holds a booked ticket for `event_id`.
    pub async fn has_booked_ticket(&self, event_id: &str, user_id: &str) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM tickets
                WHERE event_id = ?1 AND user_id = ?2 AND status = 'booked'
            )
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Booked tickets held by a user, oldest first.
    pub async fn booked_for_user(&self, user_id: &str) -> DbResult<Vec<Ticket>> {
        let tickets = sqlx::query_as::<_, Ticket>(
            r#"
            SELECT id, event_id, user_id, status, payment_reference, created_at, updated_at
            FROM tickets
            WHERE user_id = ?1 AND status = 'booked'
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tickets)
    }

    /// Number of booked tickets for an event.
    pub async fn count_booked(&self, event_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tickets WHERE event_id = ?1 AND status = 'booked'",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Number of tickets of any status referencing an event.
    pub async fn count_for_event(&self, event_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE event_id = ?1")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Inserts a booked ticket inside the caller's transaction.
    ///
    /// `payment_reference` is `None` for tickets granted by promotion.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` if the user already holds a booked ticket
    /// for this event.
    pub async fn insert_booked(
        &self,
        conn: &mut SqliteConnection,
        event_id: &str,
        user_id: &str,
        payment_reference: Option<&str>,
    ) -> DbResult<Ticket> {
        let now = Utc::now();
        let ticket = Ticket {
            id: Uuid::new_v4().to_string(),
            event_id: event_id.to_string(),
            user_id: user_id.to_string(),
            status: TicketStatus::Booked,
            payment_reference: payment_reference.map(str::to_string),
            created_at: now,
            updated_at: now,
        };

        debug!(
            id = %ticket.id,
            event_id = %event_id,
            user_id = %user_id,
            promoted = ticket.payment_reference.is_none(),
            "Inserting booked ticket"
        );

        sqlx::query(
            r#"
            INSERT INTO tickets (id, event_id, user_id, status, payment_reference, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&ticket.id)
        .bind(&ticket.event_id)
        .bind(&ticket.user_id)
        .bind(ticket.status)
        .bind(&ticket.payment_reference)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(ticket)
    }

    /// Moves a ticket from `from` to `to` inside the caller's transaction.
    ///
    /// Returns false when the ticket was not in `from`, which makes a
    /// repeated cancel a no-op at the storage level.
    pub async fn update_status(
        &self,
        conn: &mut SqliteConnection,
        ticket_id: &str,
        from: TicketStatus,
        to: TicketStatus,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tickets
            SET status = ?3, updated_at = ?4
            WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(ticket_id)
        .bind(from)
        .bind(to)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        let changed = result.rows_affected() == 1;
        debug!(id = %ticket_id, from = from.as_str(), to = to.as_str(), changed, "Ticket status update");
        Ok(changed)
    }

    /// Reads a ticket inside a transaction.
    pub async fn get_in(&self, conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Ticket>> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            SELECT id, event_id, user_id, status, payment_reference, created_at, updated_at
            FROM tickets
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(ticket)
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
    use boxoffice_core::{Event, NewEvent};
    use chrono::Duration;

    async fn setup() -> (Database, Event) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.users().insert("u-1", "ada@example.com", "Ada").await.unwrap();
        let event = db
            .events()
            .insert(&NewEvent {
                name: "Comedy Night".into(),
                description: None,
                date: Utc::now() + Duration::days(3),
                location: "Ibadan".into(),
                organizer: None,
                price_minor: 0,
                total_tickets: 5,
            })
            .await
            .unwrap();
        (db, event)
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let (db, event) = setup().await;
        let repo = db.tickets();

        let mut tx = db.begin().await.unwrap();
        let ticket = repo
            .insert_booked(&mut tx, &event.id, "u-1", Some("ref-1"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(repo.has_booked_ticket(&event.id, "u-1").await.unwrap());
        assert_eq!(repo.count_booked(&event.id).await.unwrap(), 1);

        let stored = repo.get_by_id(&ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_reference.as_deref(), Some("ref-1"));
        assert_eq!(stored.status, TicketStatus::Booked);
    }

    #[tokio::test]
    async fn test_second_booked_ticket_is_rejected_by_index() {
        let (db, event) = setup().await;
        let repo = db.tickets();

        let mut tx = db.begin().await.unwrap();
        repo.insert_booked(&mut tx, &event.id, "u-1", None).await.unwrap();
        let err = repo
            .insert_booked(&mut tx, &event.id, "u-1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_ticket_frees_the_slot_for_rebooking() {
        let (db, event) = setup().await;
        let repo = db.tickets();

        let mut tx = db.begin().await.unwrap();
        let first = repo.insert_booked(&mut tx, &event.id, "u-1", None).await.unwrap();
        assert!(repo
            .update_status(&mut tx, &first.id, TicketStatus::Booked, TicketStatus::Cancelled)
            .await
            .unwrap());
        // Second flip is a no-op
        assert!(!repo
            .update_status(&mut tx, &first.id, TicketStatus::Booked, TicketStatus::Cancelled)
            .await
            .unwrap());
        repo.insert_booked(&mut tx, &event.id, "u-1", Some("ref-2"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(repo.count_for_event(&event.id).await.unwrap(), 2);
        assert_eq!(repo.count_booked(&event.id).await.unwrap(), 1);
        assert_eq!(repo.booked_for_user("u-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_user_is_foreign_key_violation() {
        let (db, event) = setup().await;
        let mut tx = db.begin().await.unwrap();
        let err = db
            .tickets()
            .insert_booked(&mut tx, &event.id, "ghost", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
