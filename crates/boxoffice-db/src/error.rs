//! # Store Errors
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sqlx::Error ──► DbError ──► EngineError ──► Rejected / Err            │
//! │                                                                         │
//! │  Constraint failures are classified here so the engine can tell a      │
//! │  double booking (unique index) from a broken counter (CHECK) without   │
//! │  looking at SQLite's message text itself.                              │
//! │                                                                         │
//! │  idx_tickets_one_booked    ─► UniqueViolation  ─► AlreadyBooked        │
//! │  waitlist UNIQUE           ─► UniqueViolation  ─► AlreadyWaitlisted    │
//! │  available_within_capacity ─► CheckViolation   ─► InvariantViolation   │
//! │  guarded UPDATE, 0 rows    ─► InvariantViolation                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::error::ErrorKind;
use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A unique index rejected the row. `constraint` is SQLite's column list,
    /// e.g. `tickets.event_id, tickets.user_id`.
    #[error("Unique constraint failed on {constraint}")]
    UniqueViolation { constraint: String },

    /// A ticket or queue row points at a missing event or user, or an event
    /// with tickets was deleted.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A table CHECK fired. For `events` this means the counter guard was
    /// bypassed.
    #[error("Check constraint failed: {message}")]
    CheckViolation { message: String },

    /// A guarded counter update matched no row.
    #[error("Invariant violation on event {event_id}: {detail}")]
    InvariantViolation { event_id: String, detail: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Any other statement failure reported by SQLite.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// No pooled connection became free within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn invariant(event_id: impl Into<String>, detail: impl Into<String>) -> Self {
        DbError::InvariantViolation {
            event_id: event_id.into(),
            detail: detail.into(),
        }
    }

    /// True for unique violations, whichever index raised them.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }

    /// Classifies a driver-level failure by SQLite's extended result code,
    /// falling back to the message for drivers that report `Other`.
    fn from_database(err: &dyn sqlx::error::DatabaseError) -> Self {
        let message = err.message();
        let kind = match err.kind() {
            ErrorKind::Other if message.starts_with("UNIQUE constraint failed") => {
                ErrorKind::UniqueViolation
            }
            ErrorKind::Other if message.starts_with("CHECK constraint failed") => {
                ErrorKind::CheckViolation
            }
            ErrorKind::Other if message.starts_with("FOREIGN KEY constraint failed") => {
                ErrorKind::ForeignKeyViolation
            }
            kind => kind,
        };

        match kind {
            ErrorKind::UniqueViolation => DbError::UniqueViolation {
                constraint: message
                    .split_once(": ")
                    .map(|(_, columns)| columns)
                    .unwrap_or(message)
                    .to_string(),
            },
            ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation {
                message: message.to_string(),
            },
            ErrorKind::CheckViolation => DbError::CheckViolation {
                message: message.to_string(),
            },
            _ => DbError::QueryFailed(message.to_string()),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "unknown"),
            sqlx::Error::Database(db_err) => DbError::from_database(db_err.as_ref()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".into()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_errors() {
        assert!(matches!(
            DbError::from(sqlx::Error::RowNotFound),
            DbError::NotFound { .. }
        ));
        assert!(matches!(
            DbError::from(sqlx::Error::PoolTimedOut),
            DbError::PoolExhausted
        ));
        assert!(matches!(
            DbError::from(sqlx::Error::PoolClosed),
            DbError::ConnectionFailed(_)
        ));
    }

    #[test]
    fn test_invariant_message() {
        let err = DbError::invariant("evt-1", "available_tickets would drop below 0");
        assert_eq!(
            err.to_string(),
            "Invariant violation on event evt-1: available_tickets would drop below 0"
        );
        assert!(!err.is_unique_violation());
    }
}
