//! # Event Lifecycle Manager
//!
//! Organizer-facing operations on events, plus the expiry sweep.
//!
//! ## State Machine
//! ```text
//!                 cancel()
//!   ┌────────┐ ─────────────► ┌───────────┐
//!   │ active │                │ cancelled │   (terminal)
//!   └────────┘ ─────────────► └───────────┘
//!        │      sweep_expired()
//!        │      date < now
//!        ▼
//!   ┌─────────┐
//!   │ expired │                                (terminal)
//!   └─────────┘
//! ```
//!
//! Every status change happens under the event lease, so a sweep can never
//! interleave with a booking of the same event.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use boxoffice_core::validation::{validate_event_update, validate_new_event};
use boxoffice_core::{
    ConflictKind, CoreError, Event, EventStatus, EventUpdate, NewEvent, StateKind,
};
use boxoffice_db::{Database, DbError};

use crate::error::EngineResult;

#[derive(Debug, Clone)]
pub struct EventLifecycle {
    db: Database,
}

impl EventLifecycle {
    pub fn new(db: Database) -> Self {
        EventLifecycle { db }
    }

    /// Creates an active event with every ticket available.
    pub async fn create(&self, new: NewEvent) -> EngineResult<Event> {
        validate_new_event(&new).map_err(CoreError::from)?;

        let event = self.db.events().insert(&new).await?;
        info!(
            event_id = %event.id,
            name = %event.name,
            total_tickets = event.total_tickets,
            "Event created"
        );
        Ok(event)
    }

    pub async fn get(&self, event_id: &str) -> EngineResult<Event> {
        Ok(self
            .db
            .events()
            .get_by_id(event_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Event", event_id))?)
    }

    /// All events, optionally filtered by status.
    pub async fn list(&self, status: Option<EventStatus>) -> EngineResult<Vec<Event>> {
        Ok(self.db.events().list(status).await?)
    }

    /// Changes descriptive fields of an active event.
    ///
    /// Capacity cannot be changed. Cancelled and expired events are frozen.
    pub async fn update(&self, event_id: &str, update: EventUpdate) -> EngineResult<Event> {
        validate_event_update(&update).map_err(CoreError::from)?;

        let mut lease = self.db.lock_event(event_id).await?;
        lease.event().ensure_bookable()?;

        if update.is_empty() {
            return Ok(lease.event().clone());
        }

        let mut merged = update.apply_to(lease.event());
        merged.name = merged.name.trim().to_string();
        merged.location = merged.location.trim().to_string();

        let stored = self.db.events().update_details(&merged).await?;
        lease.refresh(stored.clone());

        info!(event_id = %event_id, "Event updated");
        Ok(stored)
    }

    /// Cancels an event. Existing tickets are left as they are.
    ///
    /// Cancelling a cancelled event is a no-op; an expired event cannot be
    /// cancelled.
    pub async fn cancel(&self, event_id: &str) -> EngineResult<Event> {
        let mut lease = self.db.lock_event(event_id).await?;

        match lease.event().status {
            EventStatus::Cancelled => {
                debug!(event_id = %event_id, "Event already cancelled");
                return Ok(lease.event().clone());
            }
            EventStatus::Expired => {
                return Err(CoreError::InvalidState(StateKind::EventNotActive).into());
            }
            EventStatus::Active => {}
        }

        let mut tx = self.db.begin().await?;
        self.db
            .events()
            .set_status(&mut tx, event_id, EventStatus::Active, EventStatus::Cancelled)
            .await?;
        let event = self.db.events().get_in(&mut tx, event_id).await?;
        tx.commit().await?;

        lease.refresh(event.clone());
        info!(event_id = %event_id, "Event cancelled");
        Ok(event)
    }

    /// Deletes an event that never sold a ticket, together with its waitlist.
    ///
    /// ## Errors
    /// `Conflict(EventHasTickets)` if any ticket, booked or cancelled,
    /// references the event.
    pub async fn delete(&self, event_id: &str) -> EngineResult<()> {
        let _lease = self.db.lock_event(event_id).await?;

        let tickets = self.db.tickets().count_for_event(event_id).await?;
        if tickets > 0 {
            debug!(event_id = %event_id, tickets, "Refusing to delete event with tickets");
            return Err(CoreError::Conflict(ConflictKind::EventHasTickets).into());
        }

        let mut tx = self.db.begin().await?;
        let dropped = self.db.waitlist().clear(&mut tx, event_id).await?;
        self.db.events().delete(&mut tx, event_id).await?;
        tx.commit().await?;

        info!(event_id = %event_id, waitlist_dropped = dropped, "Event deleted");
        Ok(())
    }

    // =========================================================================
    // Expiry
    // =========================================================================

    /// Expires every active event whose date has passed.
    pub async fn sweep_expired(&self) -> EngineResult<usize> {
        self.sweep_expired_at(Utc::now()).await
    }

    /// Expires every active event dated strictly before `now`.
    ///
    /// Returns the number of events transitioned; a second run with the same
    /// `now` returns 0.
    pub async fn sweep_expired_at(&self, now: DateTime<Utc>) -> EngineResult<usize> {
        let candidates = self.db.events().expired_candidates(now).await?;
        let mut expired = 0;

        for event_id in candidates {
            let lease = match self.db.lock_event(&event_id).await {
                Ok(lease) => lease,
                Err(DbError::NotFound { .. }) => {
                    debug!(event_id = %event_id, "Event deleted before sweep reached it");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let event = lease.event();
            if event.status != EventStatus::Active || event.date >= now {
                continue;
            }

            let mut tx = self.db.begin().await?;
            let changed = self
                .db
                .events()
                .set_status(&mut tx, &event_id, EventStatus::Active, EventStatus::Expired)
                .await?;
            tx.commit().await?;

            if changed {
                expired += 1;
                debug!(event_id = %event_id, "Event expired");
            } else {
                warn!(event_id = %event_id, "Event changed status under lease");
            }
        }

        if expired > 0 {
            info!(count = expired, cutoff = %now, "Expired past events");
        }
        Ok(expired)
    }
}
