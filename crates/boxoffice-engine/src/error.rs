//! # Engine Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Engine Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │     Domain      │  │    Database     │  │     Configuration       │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  CoreError      │  │  DbError        │  │  Config(String)         │ │
//! │  │  (NotFound,     │  │  (connection,   │  │  (bad TOML, bad URL,    │ │
//! │  │   Conflict,...) │  │   query, pool)  │  │   missing secret)       │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │    Payment      │   Gateway construction failures only. Payment     │
//! │  │  PaymentError   │   failures during `book` become                   │
//! │  └─────────────────┘   BookingOutcome::Rejected(Payment { .. }).       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use boxoffice_core::CoreError;
use boxoffice_db::DbError;

use crate::payment::PaymentError;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Error type for every engine operation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A domain rule refused the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The store failed.
    #[error("Database error: {0}")]
    Db(DbError),

    /// Invalid or unreadable configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The payment gateway could not be set up.
    #[error("Payment gateway error: {0}")]
    Payment(#[from] PaymentError),

    /// A background task's control channel is closed.
    #[error("Channel error: {0}")]
    Channel(String),
}

impl EngineError {
    /// The domain error, if this is one.
    pub fn core(&self) -> Option<&CoreError> {
        match self {
            EngineError::Core(err) => Some(err),
            _ => None,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Core(err) => err.code(),
            EngineError::Db(_) => "DATABASE_ERROR",
            EngineError::Config(_) => "CONFIG_ERROR",
            EngineError::Payment(_) => "PAYMENT_GATEWAY_ERROR",
            EngineError::Channel(_) => "CHANNEL_ERROR",
        }
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

/// Missing rows and counter-guard failures are domain errors; everything else
/// stays a database error.
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::Core(CoreError::NotFound { entity, id }),
            DbError::InvariantViolation { event_id, detail } => EngineError::Core(
                CoreError::InvariantViolation(format!("event {event_id}: {detail}")),
            ),
            DbError::CheckViolation { message } => {
                EngineError::Core(CoreError::InvariantViolation(message))
            }
            other => EngineError::Db(other),
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<url::ParseError> for EngineError {
    fn from(err: url::ParseError) -> Self {
        EngineError::Config(format!("invalid URL: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxoffice_core::{ConflictKind, ErrorCategory};

    #[test]
    fn test_counter_guard_becomes_invariant_violation() {
        let err: EngineError = DbError::invariant("evt-1", "below zero").into();
        let core = err.core().unwrap();
        assert_eq!(core.category(), ErrorCategory::InternalInvariantViolation);
        assert_eq!(err.code(), "INTERNAL_INVARIANT_VIOLATION");
    }

    #[test]
    fn test_other_db_errors_stay_db_errors() {
        let err: EngineError = DbError::PoolExhausted.into();
        assert!(err.core().is_none());
        assert_eq!(err.code(), "DATABASE_ERROR");
    }

    #[test]
    fn test_missing_rows_are_domain_not_found() {
        let err: EngineError = DbError::not_found("Event", "evt-9").into();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[test]
    fn test_core_errors_are_transparent() {
        let err: EngineError = CoreError::Conflict(ConflictKind::AlreadyBooked).into();
        assert_eq!(err.to_string(), "Conflict: ALREADY_BOOKED");
    }
}
