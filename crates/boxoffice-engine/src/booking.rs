//! # Booking Engine
//!
//! Book, cancel, and waitlist operations over one event's inventory.
//!
//! ## Booking Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          book(event, user, ref)                         │
//! │                                                                         │
//! │  user exists? ──no──► Rejected(NotFound User)                          │
//! │       │                                                                 │
//! │  lock_event(event) ─── lease held until return ──────────────────┐     │
//! │       │                                                           │     │
//! │  already booked? ──yes──► Rejected(AlreadyBooked)                 │     │
//! │  cancelled/expired? ────► Rejected(EventCancelled/EventNotActive) │     │
//! │  sold out? ──yes──► enqueue ──► Waitlisted / AlreadyWaitlisted    │     │
//! │       │                                                           │     │
//! │  authorize(email, price) ──fail/timeout──► PaymentInitFailed      │     │
//! │  confirm(ref)            ──false/timeout─► PaymentVerifyFailed    │     │
//! │       │                                                           │     │
//! │  BEGIN                                                            │     │
//! │    INSERT ticket (booked)                                         │     │
//! │    available_tickets -= 1   (guarded)                             │     │
//! │    DELETE waitlist entry for (event, user)                        │     │
//! │  COMMIT ──► Booked { ticket, payment_url }                        │     │
//! │                                                               ◄───┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cancellation and Promotion
//! ```text
//! cancel(ticket)
//!   lock_event(ticket.event)
//!   BEGIN
//!     ticket: booked → cancelled        (else TicketNotBooked)
//!     available_tickets += 1
//!     if waitlist non-empty:
//!       INSERT ticket for waitlist head (no payment reference)
//!       available_tickets -= 1
//!       DELETE head entry
//!   COMMIT
//! ```
//!
//! Nothing is written before the payment round trip finishes, so a payment
//! failure or timeout leaves the store untouched.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqliteConnection;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use boxoffice_core::{
    BookingOutcome, CancelOutcome, ConflictKind, CoreError, ErrorCategory,
    EventSummary, PaymentFailure, StateKind, Ticket, TicketStatus, WaitlistEntry,
};
use boxoffice_db::{Database, EventLease};

use crate::config::{PaymentConfirmation, PaymentSettings};
use crate::error::{EngineError, EngineResult};
use crate::payment::PaymentGateway;

/// Default bound on one gateway call.
const DEFAULT_PAYMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Turns an engine error into a booking rejection when it is a business
/// outcome; infrastructure failures and invariant breaches stay errors.
fn reject(err: EngineError) -> EngineResult<BookingOutcome> {
    match err {
        EngineError::Core(core) if core.category() != ErrorCategory::InternalInvariantViolation => {
            Ok(BookingOutcome::Rejected(core))
        }
        other => Err(other),
    }
}

/// Orchestrates bookings, cancellations and waitlist promotion.
///
/// Holds no state of its own; cheap to clone and share between tasks.
#[derive(Clone)]
pub struct BookingEngine {
    db: Database,
    gateway: Arc<dyn PaymentGateway>,
    payment_timeout: Duration,
    confirmation: PaymentConfirmation,
}

impl BookingEngine {
    pub fn new(db: Database, gateway: Arc<dyn PaymentGateway>) -> Self {
        BookingEngine {
            db,
            gateway,
            payment_timeout: DEFAULT_PAYMENT_TIMEOUT,
            confirmation: PaymentConfirmation::default(),
        }
    }

    /// Builds an engine with timeout and confirmation mode from config.
    pub fn from_settings(
        db: Database,
        gateway: Arc<dyn PaymentGateway>,
        settings: &PaymentSettings,
    ) -> Self {
        Self::new(db, gateway)
            .with_payment_timeout(settings.timeout())
            .with_confirmation(settings.confirmation)
    }

    pub fn with_payment_timeout(mut self, payment_timeout: Duration) -> Self {
        self.payment_timeout = payment_timeout;
        self
    }

    pub fn with_confirmation(mut self, confirmation: PaymentConfirmation) -> Self {
        self.confirmation = confirmation;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Book
    // =========================================================================

    /// Books a ticket, or queues the user if the event is sold out.
    ///
    /// Business refusals come back as `Ok(BookingOutcome::Rejected(..))`.
    /// `Err` is reserved for store failures and invariant violations.
    pub async fn book(
        &self,
        event_id: &str,
        user_id: &str,
        payment_reference: &str,
    ) -> EngineResult<BookingOutcome> {
        let user = match self.db.users().get_by_id(user_id).await? {
            Some(user) => user,
            None => return Ok(BookingOutcome::Rejected(CoreError::not_found("User", user_id))),
        };

        let lease = match self.db.lock_event(event_id).await {
            Ok(lease) => lease,
            Err(err) => return reject(err.into()),
        };

        if self.db.tickets().has_booked_ticket(event_id, user_id).await? {
            debug!(event_id = %event_id, user_id = %user_id, "User already holds a ticket");
            return Ok(BookingOutcome::Rejected(CoreError::Conflict(
                ConflictKind::AlreadyBooked,
            )));
        }

        let event = lease.event();
        if let Err(refusal) = event.ensure_bookable() {
            debug!(event_id = %event_id, status = event.status.as_str(), "Event not bookable");
            return Ok(BookingOutcome::Rejected(refusal));
        }

        if event.is_sold_out() {
            return self.enqueue(&lease, user_id).await;
        }

        let price = event.price();
        let payment_url = if price.is_zero() {
            None
        } else {
            let url = match self.authorize(&user.email, price).await {
                Ok(url) => url,
                Err(rejection) => return Ok(BookingOutcome::Rejected(rejection)),
            };

            if self.confirmation == PaymentConfirmation::Synchronous {
                if let Err(rejection) = self.confirm(payment_reference).await {
                    return Ok(BookingOutcome::Rejected(rejection));
                }
            }
            Some(url)
        };

        let mut tx = self.db.begin().await?;

        let ticket = match self
            .db
            .tickets()
            .insert_booked(&mut tx, event_id, user_id, Some(payment_reference))
            .await
        {
            Ok(ticket) => ticket,
            Err(err) if err.is_unique_violation() => {
                warn!(event_id = %event_id, user_id = %user_id, "Booked ticket appeared under lease");
                return Ok(BookingOutcome::Rejected(CoreError::Conflict(
                    ConflictKind::AlreadyBooked,
                )));
            }
            Err(err) => return Err(err.into()),
        };

        self.db
            .events()
            .decrement_available(&mut tx, event_id, 1)
            .await?;
        self.db.waitlist().remove(&mut tx, event_id, user_id).await?;

        tx.commit().await?;

        info!(
            event_id = %event_id,
            user_id = %user_id,
            ticket_id = %ticket.id,
            "Ticket booked"
        );

        Ok(BookingOutcome::Booked {
            ticket,
            payment_url,
        })
    }

    async fn enqueue(&self, lease: &EventLease, user_id: &str) -> EngineResult<BookingOutcome> {
        let event_id = lease.event_id();
        let already_queued = BookingOutcome::Rejected(CoreError::Conflict(
            ConflictKind::AlreadyWaitlisted,
        ));

        if self.db.waitlist().contains(event_id, user_id).await? {
            return Ok(already_queued);
        }

        let mut tx = self.db.begin().await?;
        let entry = match self.db.waitlist().enqueue(&mut tx, event_id, user_id).await {
            Ok(entry) => entry,
            Err(err) if err.is_unique_violation() => return Ok(already_queued),
            Err(err) => return Err(err.into()),
        };
        tx.commit().await?;

        info!(event_id = %event_id, user_id = %user_id, position = entry.position, "Event sold out, user waitlisted");
        Ok(BookingOutcome::Waitlisted { entry })
    }

    // =========================================================================
    // Payment
    // =========================================================================

    /// Runs a gateway call under the payment timeout.
    async fn bounded<T>(
        &self,
        failure: PaymentFailure,
        call: impl Future<Output = Result<T, crate::payment::PaymentError>>,
    ) -> Result<T, CoreError> {
        match timeout(self.payment_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                warn!(gateway = self.gateway.name(), error = %err, code = failure.code(), "Payment call failed");
                Err(CoreError::payment(failure, err.to_string()))
            }
            Err(_) => {
                warn!(
                    gateway = self.gateway.name(),
                    timeout = ?self.payment_timeout,
                    code = failure.code(),
                    "Payment call timed out"
                );
                Err(CoreError::payment(failure, "timed out"))
            }
        }
    }

    async fn authorize(&self, email: &str, price: boxoffice_core::Money) -> Result<String, CoreError> {
        self.bounded(PaymentFailure::InitFailed, self.gateway.authorize(email, price))
            .await
    }

    async fn confirm(&self, reference: &str) -> Result<(), CoreError> {
        let verified = self
            .bounded(PaymentFailure::VerifyFailed, self.gateway.confirm(reference))
            .await?;

        if verified {
            Ok(())
        } else {
            warn!(gateway = self.gateway.name(), reference = %reference, "Payment not verified");
            Err(CoreError::payment(
                PaymentFailure::VerifyFailed,
                "payment was not successful",
            ))
        }
    }

    // =========================================================================
    // Cancel
    // =========================================================================

    /// Cancels a booked ticket and hands the seat to the head of the
    /// waitlist, whatever the event's status.
    ///
    /// ## Errors
    /// `InvalidState(TicketNotBooked)` if the ticket was already cancelled.
    pub async fn cancel(&self, ticket_id: &str) -> EngineResult<CancelOutcome> {
        let Some(ticket) = self.db.tickets().get_by_id(ticket_id).await? else {
            return Ok(CancelOutcome::NotFound);
        };

        let lease = self.db.lock_event(&ticket.event_id).await?;
        let event_id = lease.event_id();

        let mut tx = self.db.begin().await?;

        let flipped = self
            .db
            .tickets()
            .update_status(&mut tx, ticket_id, TicketStatus::Booked, TicketStatus::Cancelled)
            .await?;
        if !flipped {
            return Err(CoreError::InvalidState(StateKind::TicketNotBooked).into());
        }

        self.db
            .events()
            .increment_available(&mut tx, event_id, 1)
            .await?;

        let promoted = self.promote_head(&mut tx, event_id).await?;

        let cancelled = self
            .db
            .tickets()
            .get_in(&mut tx, ticket_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Ticket", ticket_id))?;

        tx.commit().await?;

        info!(
            event_id = %event_id,
            ticket_id = %ticket_id,
            promoted_user = promoted.as_ref().map(|t| t.user_id.as_str()).unwrap_or("-"),
            "Ticket cancelled"
        );

        Ok(CancelOutcome::Cancelled {
            ticket: cancelled,
            promoted,
        })
    }

    /// Books the oldest waitlisted user into the seat just freed.
    async fn promote_head(
        &self,
        conn: &mut SqliteConnection,
        event_id: &str,
    ) -> EngineResult<Option<Ticket>> {
        let waitlist = self.db.waitlist();
        let tickets = self.db.tickets();

        while let Some(entry) = waitlist.peek_oldest(&mut *conn, event_id).await? {
            match tickets
                .insert_booked(&mut *conn, event_id, &entry.user_id, None)
                .await
            {
                Ok(ticket) => {
                    self.db
                        .events()
                        .decrement_available(&mut *conn, event_id, 1)
                        .await?;
                    waitlist.remove(&mut *conn, event_id, &entry.user_id).await?;

                    info!(event_id = %event_id, user_id = %entry.user_id, ticket_id = %ticket.id, "Promoted from waitlist");
                    return Ok(Some(ticket));
                }
                Err(err) if err.is_unique_violation() => {
                    // Entry for a user who already holds a ticket; drop it.
                    warn!(event_id = %event_id, user_id = %entry.user_id, "Skipping stale waitlist entry");
                    waitlist.remove(&mut *conn, event_id, &entry.user_id).await?;
                }
                Err(err) => {
                    error!(event_id = %event_id, error = %err, "Waitlist promotion failed");
                    return Err(err.into());
                }
            }
        }

        Ok(None)
    }

    // =========================================================================
    // Waitlist
    // =========================================================================

    /// Removes the user from the event's waitlist.
    ///
    /// ## Errors
    /// `NotFound` if the event does not exist or the user is not queued.
    pub async fn withdraw(&self, event_id: &str, user_id: &str) -> EngineResult<()> {
        let _lease = self.db.lock_event(event_id).await?;

        let mut tx = self.db.begin().await?;
        let removed = self.db.waitlist().remove(&mut tx, event_id, user_id).await?;
        if !removed {
            return Err(CoreError::not_found("WaitlistEntry", format!("{event_id}/{user_id}")).into());
        }
        tx.commit().await?;

        info!(event_id = %event_id, user_id = %user_id, "Withdrew from waitlist");
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The user's booked tickets across all events.
    pub async fn tickets_for_user(&self, user_id: &str) -> EngineResult<Vec<Ticket>> {
        Ok(self.db.tickets().booked_for_user(user_id).await?)
    }

    /// The event's waitlist in promotion order.
    pub async fn waitlist(&self, event_id: &str) -> EngineResult<Vec<WaitlistEntry>> {
        if self.db.events().get_by_id(event_id).await?.is_none() {
            return Err(CoreError::not_found("Event", event_id).into());
        }
        Ok(self.db.waitlist().list(event_id).await?)
    }

    pub async fn event_status(&self, event_id: &str) -> EngineResult<EventSummary> {
        let event = self
            .db
            .events()
            .get_by_id(event_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Event", event_id))?;
        let waitlist_count = self.db.waitlist().count(event_id).await?;

        Ok(EventSummary {
            name: event.name,
            available_tickets: event.available_tickets,
            status: event.status,
            waitlist_count,
        })
    }
}

impl std::fmt::Debug for BookingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingEngine")
            .field("gateway", &self.gateway.name())
            .field("payment_timeout", &self.payment_timeout)
            .field("confirmation", &self.confirmation)
            .finish()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::{MockBehavior, MockGateway, PaymentError};
    use boxoffice_core::NewEvent;
    use boxoffice_db::DbConfig;
    use chrono::{Duration as ChronoDuration, Utc};

    async fn setup(gateway: MockGateway) -> (BookingEngine, Arc<MockGateway>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (id, name) in [("u1", "Ada"), ("u2", "Grace"), ("u3", "Linus")] {
            db.users()
                .insert(id, &format!("{id}@example.com"), name)
                .await
                .unwrap();
        }
        let gateway = Arc::new(gateway);
        let engine = BookingEngine::new(db, gateway.clone())
            .with_payment_timeout(Duration::from_millis(100));
        (engine, gateway)
    }

    async fn event(engine: &BookingEngine, total: i64, price_minor: i64) -> String {
        engine
            .database()
            .events()
            .insert(&NewEvent {
                name: "Launch Party".into(),
                description: None,
                date: Utc::now() + ChronoDuration::days(7),
                location: "Lagos".into(),
                organizer: None,
                price_minor,
                total_tickets: total,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_book_then_already_booked() {
        let (engine, gateway) = setup(MockGateway::approving()).await;
        let event_id = event(&engine, 5, 5_000).await;

        let outcome = engine.book(&event_id, "u1", "ref-1").await.unwrap();
        let ticket = outcome.ticket().unwrap();
        assert_eq!(ticket.payment_reference.as_deref(), Some("ref-1"));
        assert!(matches!(outcome, BookingOutcome::Booked { payment_url: Some(_), .. }));

        let again = engine.book(&event_id, "u1", "ref-2").await.unwrap();
        assert_eq!(again.code(), "ALREADY_BOOKED");
        assert_eq!(gateway.authorize_calls(), 1);

        let summary = engine.event_status(&event_id).await.unwrap();
        assert_eq!(summary.available_tickets, 4);
    }

    #[tokio::test]
    async fn test_free_event_skips_gateway() {
        let (engine, gateway) = setup(MockGateway::approving()).await;
        let event_id = event(&engine, 1, 0).await;

        let outcome = engine.book(&event_id, "u1", "free").await.unwrap();
        assert!(matches!(outcome, BookingOutcome::Booked { payment_url: None, .. }));
        assert_eq!(gateway.authorize_calls(), 0);
        assert_eq!(gateway.confirm_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_user_and_event() {
        let (engine, _) = setup(MockGateway::approving()).await;
        let event_id = event(&engine, 1, 100).await;

        let outcome = engine.book(&event_id, "ghost", "r").await.unwrap();
        assert_eq!(outcome.code(), "NOT_FOUND");

        let outcome = engine.book("no-such-event", "u1", "r").await.unwrap();
        assert_eq!(outcome.code(), "NOT_FOUND");
        assert_eq!(engine.database().locks().active(), 0);
    }

    #[tokio::test]
    async fn test_sold_out_waitlists_once() {
        let (engine, _) = setup(MockGateway::approving()).await;
        let event_id = event(&engine, 1, 100).await;

        engine.book(&event_id, "u1", "r1").await.unwrap();
        let outcome = engine.book(&event_id, "u2", "r2").await.unwrap();
        assert_eq!(outcome.code(), "WAITLISTED");

        let again = engine.book(&event_id, "u2", "r3").await.unwrap();
        assert_eq!(again.code(), "ALREADY_WAITLISTED");
        assert_eq!(engine.waitlist(&event_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_declined_verification_writes_nothing() {
        let (engine, _) = setup(MockGateway::new(MockBehavior::Approve, MockBehavior::Decline)).await;
        let event_id = event(&engine, 2, 100).await;

        let outcome = engine.book(&event_id, "u1", "r").await.unwrap();
        assert_eq!(outcome.code(), "PAYMENT_VERIFY_FAILED");
        assert!(engine.tickets_for_user("u1").await.unwrap().is_empty());
        assert_eq!(engine.event_status(&event_id).await.unwrap().available_tickets, 2);
    }

    #[tokio::test]
    async fn test_authorize_timeout_is_init_failure() {
        let (engine, gateway) = setup(MockGateway::new(
            MockBehavior::Hang(Duration::from_secs(5)),
            MockBehavior::Approve,
        ))
        .await;
        let event_id = event(&engine, 2, 100).await;

        let outcome = engine.book(&event_id, "u1", "r").await.unwrap();
        assert_eq!(outcome.code(), "PAYMENT_INIT_FAILED");
        assert_eq!(gateway.confirm_calls(), 0);
        assert_eq!(engine.event_status(&event_id).await.unwrap().available_tickets, 2);
    }

    #[tokio::test]
    async fn test_deferred_confirmation_skips_verify() {
        let (engine, gateway) = setup(MockGateway::new(
            MockBehavior::Approve,
            MockBehavior::Fail(PaymentError::Timeout),
        ))
        .await;
        let engine = engine.with_confirmation(PaymentConfirmation::Deferred);
        let event_id = event(&engine, 1, 100).await;

        let outcome = engine.book(&event_id, "u1", "pending-ref").await.unwrap();
        assert_eq!(outcome.code(), "BOOKED");
        assert_eq!(gateway.confirm_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_promotes_and_second_cancel_fails() {
        let (engine, _) = setup(MockGateway::approving()).await;
        let event_id = event(&engine, 1, 100).await;

        let booked = engine.book(&event_id, "u1", "r1").await.unwrap();
        let ticket_id = booked.ticket().unwrap().id.clone();
        engine.book(&event_id, "u2", "r2").await.unwrap();

        let outcome = engine.cancel(&ticket_id).await.unwrap();
        let CancelOutcome::Cancelled { ticket, promoted } = outcome else {
            panic!("expected Cancelled");
        };
        assert_eq!(ticket.status, TicketStatus::Cancelled);
        let promoted = promoted.unwrap();
        assert_eq!(promoted.user_id, "u2");
        assert!(promoted.is_promoted());
        assert_eq!(engine.event_status(&event_id).await.unwrap().available_tickets, 0);

        let err = engine.cancel(&ticket_id).await.unwrap_err();
        assert_eq!(err.code(), "TICKET_NOT_BOOKED");

        assert_eq!(engine.cancel("missing").await.unwrap(), CancelOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_withdraw() {
        let (engine, _) = setup(MockGateway::approving()).await;
        let event_id = event(&engine, 1, 100).await;

        engine.book(&event_id, "u1", "r1").await.unwrap();
        engine.book(&event_id, "u2", "r2").await.unwrap();
        engine.book(&event_id, "u3", "r3").await.unwrap();

        engine.withdraw(&event_id, "u2").await.unwrap();
        let queue = engine.waitlist(&event_id).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].user_id, "u3");

        let err = engine.withdraw(&event_id, "u2").await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}
