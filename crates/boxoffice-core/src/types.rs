//! # Domain Types
//!
//! Core domain types used throughout Box Office.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Event       │   │     Ticket      │   │  WaitlistEntry  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  event_id (FK)  │   │  position       │       │
//! │  │  total_tickets  │   │  user_id        │   │  event_id (FK)  │       │
//! │  │  available_...  │   │  status         │   │  user_id        │       │
//! │  │  status         │   │  payment_ref    │   │  created_at     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  EventStatus    │   │  TicketStatus   │   │ BookingOutcome  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Active         │   │  Booked         │   │  Booked         │       │
//! │  │  Cancelled      │   │  Cancelled      │   │  Waitlisted     │       │
//! │  │  Expired        │   └─────────────────┘   │  Rejected       │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Inventory Invariant
//! For every event at every commit point:
//! `0 <= available_tickets <= total_tickets` and
//! `available_tickets == total_tickets - count(booked tickets)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::money::Money;

// =============================================================================
// Event Status
// =============================================================================

/// Lifecycle state of an event.
///
/// ## State Machine
/// ```text
///              cancel()
///   Active ─────────────────► Cancelled
///     │
///     │ sweep (date < now)
///     ▼
///   Expired
/// ```
/// Both `Cancelled` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Accepting bookings.
    Active,
    /// Cancelled by the organizer. Existing tickets are left untouched.
    Cancelled,
    /// The event date has passed.
    Expired,
}

impl EventStatus {
    /// Database representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Active => "active",
            EventStatus::Cancelled => "cancelled",
            EventStatus::Expired => "expired",
        }
    }

    /// Whether a transition from `self` to `next` is allowed.
    pub const fn can_transition_to(&self, next: EventStatus) -> bool {
        matches!(
            (self, next),
            (EventStatus::Active, EventStatus::Cancelled) | (EventStatus::Active, EventStatus::Expired)
        )
    }
}

impl Default for EventStatus {
    fn default() -> Self {
        EventStatus::Active
    }
}

// =============================================================================
// Event
// =============================================================================

/// An event with a fixed pool of tickets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Event {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    pub description: Option<String>,

    /// When the event takes place. Used by the expiry sweep.
    pub date: DateTime<Utc>,

    pub location: String,

    /// Organizer display name, if provided.
    pub organizer: Option<String>,

    /// Ticket price in the currency's minor unit.
    pub price_minor: i64,

    /// Capacity. Fixed at creation.
    pub total_tickets: i64,

    /// Remaining capacity. Only the inventory store mutates this.
    pub available_tickets: i64,

    pub status: EventStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Returns the ticket price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_minor(self.price_minor)
    }

    #[inline]
    pub fn is_sold_out(&self) -> bool {
        self.available_tickets == 0
    }

    /// Number of currently booked tickets implied by the counter.
    #[inline]
    pub fn booked_count(&self) -> i64 {
        self.total_tickets - self.available_tickets
    }

    /// Checks that the event accepts new bookings.
    ///
    /// ## Errors
    /// - `InvalidState(EventCancelled)` for cancelled events
    /// - `InvalidState(EventNotActive)` for expired events
    pub fn ensure_bookable(&self) -> Result<(), CoreError> {
        use crate::error::StateKind;
        match self.status {
            EventStatus::Active => Ok(()),
            EventStatus::Cancelled => Err(CoreError::InvalidState(StateKind::EventCancelled)),
            EventStatus::Expired => Err(CoreError::InvalidState(StateKind::EventNotActive)),
        }
    }
}

// =============================================================================
// Ticket Status
// =============================================================================

/// The status of a ticket. `Booked → Cancelled` is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Booked,
    Cancelled,
}

impl TicketStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Booked => "booked",
            TicketStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for TicketStatus {
    fn default() -> Self {
        TicketStatus::Booked
    }
}

// =============================================================================
// Ticket
// =============================================================================

/// A ticket held by a user for an event.
///
/// Cancelled tickets are kept for audit and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Ticket {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub status: TicketStatus,
    /// Gateway reference. `None` for tickets granted by waitlist promotion.
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    #[inline]
    pub fn is_booked(&self) -> bool {
        self.status == TicketStatus::Booked
    }

    /// True when the ticket came from the waitlist rather than a purchase.
    #[inline]
    pub fn is_promoted(&self) -> bool {
        self.payment_reference.is_none()
    }
}

// =============================================================================
// Waitlist Entry
// =============================================================================

/// A user queued for a sold-out event.
///
/// ## Ordering
/// FIFO by `created_at`; `position` is a monotonically increasing sequence
/// that breaks ties between entries created in the same instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct WaitlistEntry {
    pub position: i64,
    pub event_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// User
// =============================================================================

/// Reference copy of a user owned by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    /// Payer email handed to the payment gateway.
    pub email: String,
    pub name: String,
}

// =============================================================================
// Lifecycle Inputs
// =============================================================================

/// Input for creating an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub name: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub location: String,
    pub organizer: Option<String>,
    pub price_minor: i64,
    pub total_tickets: i64,
}

/// Partial update of an event. `None` leaves a field unchanged.
///
/// There is deliberately no capacity field: `total_tickets` is immutable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub organizer: Option<String>,
    pub price_minor: Option<i64>,
}

impl EventUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.date.is_none()
            && self.location.is_none()
            && self.organizer.is_none()
            && self.price_minor.is_none()
    }

    /// Applies the update to an event snapshot, returning the merged event.
    pub fn apply_to(&self, event: &Event) -> Event {
        let mut merged = event.clone();
        if let Some(name) = &self.name {
            merged.name = name.clone();
        }
        if let Some(description) = &self.description {
            merged.description = Some(description.clone());
        }
        if let Some(date) = self.date {
            merged.date = date;
        }
        if let Some(location) = &self.location {
            merged.location = location.clone();
        }
        if let Some(organizer) = &self.organizer {
            merged.organizer = Some(organizer.clone());
        }
        if let Some(price) = self.price_minor {
            merged.price_minor = price;
        }
        merged
    }
}

// =============================================================================
// Queries
// =============================================================================

/// Read-only view of an event's booking state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub name: String,
    pub available_tickets: i64,
    pub status: EventStatus,
    pub waitlist_count: i64,
}

// =============================================================================
// Outcomes
// =============================================================================

/// Why a booking was refused. Any business-level [`CoreError`].
pub type Rejection = CoreError;

/// Result of a booking attempt.
///
/// ## User Workflow
/// ```text
/// book(event, user)
///      │
///      ├── seat free, payment ok ──► Booked { ticket, payment_url }
///      ├── sold out              ──► Waitlisted { entry }
///      └── anything else         ──► Rejected(reason)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingOutcome {
    Booked {
        ticket: Ticket,
        /// Checkout URL from the gateway. `None` for free events.
        payment_url: Option<String>,
    },
    Waitlisted {
        entry: WaitlistEntry,
    },
    Rejected(Rejection),
}

impl BookingOutcome {
    /// Booked and Waitlisted are both successful outcomes.
    pub fn is_success(&self) -> bool {
        !matches!(self, BookingOutcome::Rejected(_))
    }

    /// Stable code: `BOOKED`, `WAITLISTED`, or the rejection's code.
    pub fn code(&self) -> &'static str {
        match self {
            BookingOutcome::Booked { .. } => "BOOKED",
            BookingOutcome::Waitlisted { .. } => "WAITLISTED",
            BookingOutcome::Rejected(reason) => reason.code(),
        }
    }

    pub fn ticket(&self) -> Option<&Ticket> {
        match self {
            BookingOutcome::Booked { ticket, .. } => Some(ticket),
            _ => None,
        }
    }
}

/// Result of cancelling a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled {
        /// The ticket as it now stands (status `cancelled`).
        ticket: Ticket,
        /// Ticket granted to the waitlist head, if anyone was waiting.
        promoted: Option<Ticket>,
    },
    NotFound,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConflictKind, StateKind};
    use chrono::TimeZone;

    fn sample_event(status: EventStatus) -> Event {
        let at = Utc.with_ymd_and_hms(2026, 12, 31, 20, 0, 0).unwrap();
        Event {
            id: "evt-1".into(),
            name: "New Year Concert".into(),
            description: None,
            date: at,
            location: "Lagos".into(),
            organizer: Some("Eko Live".into()),
            price_minor: 500_000,
            total_tickets: 10,
            available_tickets: 4,
            status,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_status_transitions() {
        assert!(EventStatus::Active.can_transition_to(EventStatus::Cancelled));
        assert!(EventStatus::Active.can_transition_to(EventStatus::Expired));
        assert!(!EventStatus::Cancelled.can_transition_to(EventStatus::Active));
        assert!(!EventStatus::Expired.can_transition_to(EventStatus::Cancelled));
        assert!(!EventStatus::Cancelled.can_transition_to(EventStatus::Expired));
    }

    #[test]
    fn test_ensure_bookable() {
        assert!(sample_event(EventStatus::Active).ensure_bookable().is_ok());
        assert_eq!(
            sample_event(EventStatus::Cancelled).ensure_bookable(),
            Err(CoreError::InvalidState(StateKind::EventCancelled))
        );
        assert_eq!(
            sample_event(EventStatus::Expired).ensure_bookable(),
            Err(CoreError::InvalidState(StateKind::EventNotActive))
        );
    }

    #[test]
    fn test_event_counters() {
        let event = sample_event(EventStatus::Active);
        assert_eq!(event.booked_count(), 6);
        assert!(!event.is_sold_out());
        assert_eq!(event.price().major(), 5_000);
    }

    #[test]
    fn test_update_apply_keeps_capacity() {
        let event = sample_event(EventStatus::Active);
        let update = EventUpdate {
            name: Some("NYE Concert".into()),
            price_minor: Some(750_000),
            ..Default::default()
        };
        let merged = update.apply_to(&event);
        assert_eq!(merged.name, "NYE Concert");
        assert_eq!(merged.price_minor, 750_000);
        assert_eq!(merged.total_tickets, event.total_tickets);
        assert_eq!(merged.available_tickets, event.available_tickets);
        assert_eq!(merged.location, event.location);
        assert!(EventUpdate::default().is_empty());
        assert!(!update.is_empty());
    }

    #[test]
    fn test_outcome_codes() {
        let rejected = BookingOutcome::Rejected(CoreError::Conflict(ConflictKind::AlreadyBooked));
        assert_eq!(rejected.code(), "ALREADY_BOOKED");
        assert!(!rejected.is_success());
        assert!(rejected.ticket().is_none());
    }

    #[test]
    fn test_status_serde_names() {
        assert_eq!(
            serde_json::to_string(&EventStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
        assert_eq!(TicketStatus::Booked.as_str(), "booked");
        assert_eq!(EventStatus::default(), EventStatus::Active);
    }
}
