//! # Error Types
//!
//! Domain-specific error types for boxoffice-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  boxoffice-core errors (this file)                                     │
//! │  ├── CoreError        - Domain taxonomy (what callers branch on)       │
//! │  │   ├── NotFound            event / ticket / user / waitlist entry    │
//! │  │   ├── Conflict            AlreadyBooked, AlreadyWaitlisted, ...     │
//! │  │   ├── InvalidState        EventCancelled, EventNotActive, ...       │
//! │  │   ├── Payment             InitFailed, VerifyFailed                  │
//! │  │   └── InvariantViolation  counter left [0, total] (a bug!)          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  boxoffice-db errors (separate crate)                                  │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  boxoffice-engine errors                                               │
//! │  └── EngineError      - Core + Db + Payment + Config                   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stable Codes
//! Every variant maps to a SCREAMING_SNAKE code via [`CoreError::code`].
//! Codes are part of the public contract: messages may be reworded, codes
//! may not.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Category
// =============================================================================

/// Coarse classification of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    NotFound,
    Conflict,
    InvalidState,
    PaymentFailure,
    InternalInvariantViolation,
    Validation,
}

// =============================================================================
// Kinds
// =============================================================================

/// Which uniqueness rule a request collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// The user already holds a booked ticket for this event.
    AlreadyBooked,
    /// The user is already queued on this event's waitlist.
    AlreadyWaitlisted,
    /// The event is still referenced by tickets and cannot be deleted.
    EventHasTickets,
}

impl ConflictKind {
    pub const fn code(&self) -> &'static str {
        match self {
            ConflictKind::AlreadyBooked => "ALREADY_BOOKED",
            ConflictKind::AlreadyWaitlisted => "ALREADY_WAITLISTED",
            ConflictKind::EventHasTickets => "EVENT_HAS_TICKETS",
        }
    }
}

/// Which state rule a request violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    /// The event was cancelled by its organizer.
    EventCancelled,
    /// The event is not accepting bookings (expired).
    EventNotActive,
    /// The ticket is not in `booked` status.
    TicketNotBooked,
}

impl StateKind {
    pub const fn code(&self) -> &'static str {
        match self {
            StateKind::EventCancelled => "EVENT_CANCELLED",
            StateKind::EventNotActive => "EVENT_NOT_ACTIVE",
            StateKind::TicketNotBooked => "TICKET_NOT_BOOKED",
        }
    }
}

/// Which payment step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentFailure {
    /// `authorize` failed, errored or timed out.
    InitFailed,
    /// `confirm` returned false, errored or timed out.
    VerifyFailed,
}

impl PaymentFailure {
    pub const fn code(&self) -> &'static str {
        match self {
            PaymentFailure::InitFailed => "PAYMENT_INIT_FAILED",
            PaymentFailure::VerifyFailed => "PAYMENT_VERIFY_FAILED",
        }
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Domain errors.
///
/// These are the reasons a booking, cancellation or lifecycle operation is
/// refused. All but `InvariantViolation` are ordinary business outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Event, ticket, user or waitlist entry does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A uniqueness rule would be broken.
    ///
    /// ## User Workflow
    /// ```text
    /// book(event, alice)  ──► Booked
    ///      │
    ///      ▼
    /// book(event, alice)  ──► Rejected(Conflict(AlreadyBooked))
    /// ```
    #[error("Conflict: {}", .0.code())]
    Conflict(ConflictKind),

    /// The target is in a state that forbids the operation.
    #[error("Invalid state: {}", .0.code())]
    InvalidState(StateKind),

    /// The payment gateway refused or could not be reached.
    #[error("Payment failed ({}): {detail}", .failure.code())]
    Payment {
        failure: PaymentFailure,
        detail: String,
    },

    /// The inventory counter would leave `[0, total_tickets]`.
    ///
    /// ## When This Occurs
    /// Never, if locking discipline holds. Seeing this means a bug: it is
    /// logged at error level and the enclosing transaction is rolled back.
    #[error("Inventory invariant violated: {0}")]
    InvariantViolation(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a payment error for the given step.
    pub fn payment(failure: PaymentFailure, detail: impl Into<String>) -> Self {
        CoreError::Payment {
            failure,
            detail: detail.into(),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::Conflict(kind) => kind.code(),
            CoreError::InvalidState(kind) => kind.code(),
            CoreError::Payment { failure, .. } => failure.code(),
            CoreError::InvariantViolation(_) => "INTERNAL_INVARIANT_VIOLATION",
            CoreError::Validation(_) => "VALIDATION_FAILED",
        }
    }

    /// Coarse category for callers that only need to branch broadly.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::NotFound { .. } => ErrorCategory::NotFound,
            CoreError::Conflict(_) => ErrorCategory::Conflict,
            CoreError::InvalidState(_) => ErrorCategory::InvalidState,
            CoreError::Payment { .. } => ErrorCategory::PaymentFailure,
            CoreError::InvariantViolation(_) => ErrorCategory::InternalInvariantViolation,
            CoreError::Validation(_) => ErrorCategory::Validation,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when organizer input doesn't meet requirements.
/// Used for early validation before anything touches the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
