//! # Store Handle
//!
//! `Database` bundles the SQLite pool with the event lease registry. Every
//! clone shares both, so a lease taken through one clone excludes holders
//! of any other.
//!
//! ```text
//!   book / cancel / update / sweep
//!          │
//!          ▼
//!   lock_event(id) ──► EventLocks        (one holder per event id)
//!          │
//!          ▼
//!   begin() ──► SqlitePool (WAL) ──► UPDATE/INSERT ... COMMIT
//!
//!   availability + waitlist reads go straight to the pool, no lease
//! ```
//!
//! SQLite serializes writers. The busy timeout lets a second writer wait
//! for the lock instead of failing with `SQLITE_BUSY`.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::locks::{EventLease, EventLocks};
use crate::migrations;
use crate::repository::event::EventRepository;
use crate::repository::ticket::TicketRepository;
use crate::repository::user::UserRepository;
use crate::repository::waitlist::WaitlistRepository;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Pool and connection settings.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/boxoffice/boxoffice.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, or `:memory:`.
    pub database_path: PathBuf,

    /// Default 5.
    pub max_connections: u32,
    /// Default 1.
    pub min_connections: u32,
    /// Acquire timeout for a pooled connection. Default 30s.
    pub connect_timeout: Duration,
    /// Default 10 minutes. Ignored for in-memory stores.
    pub idle_timeout: Duration,

    /// How long a writer waits on SQLite's write lock before failing.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Apply embedded migrations in `Database::new`. Default true.
    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed store; the file is created on first connect.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Private in-memory store for tests. It exists only as long as its
    /// connection, so the pool holds exactly one that never idles out.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(MEMORY_PATH),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(3600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }
}

// =============================================================================
// Database
// =============================================================================

/// Repository access plus per-event leases.
///
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("boxoffice.db")).await?;
///
/// let lease = db.lock_event(&event_id).await?;   // same-event exclusion
/// let mut tx = db.begin().await?;
/// db.tickets().insert_booked(&mut tx, lease.event_id(), &user_id, None).await?;
/// db.events().decrement_available(&mut tx, lease.event_id(), 1).await?;
/// tx.commit().await?;
/// drop(lease);
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    locks: EventLocks,
}

impl Database {
    /// Opens the pool (WAL, `synchronous = NORMAL`, foreign keys on) and
    /// applies migrations unless disabled.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening box office store");

        let connect_url = if config.is_in_memory() {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{}?mode=rwc", config.database_path.display())
        };

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout);
        pool_options = if config.is_in_memory() {
            pool_options
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            pool_options.idle_timeout(Some(config.idle_timeout))
        };

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(max_connections = config.max_connections, "Store pool ready");

        let db = Database {
            pool,
            locks: EventLocks::new(),
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Starts a transaction. Rolled back on drop unless committed.
    pub async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// Takes the exclusive lease on an event and reads its row.
    ///
    /// ## Ordering
    /// The lease is acquired before any connection is checked out, so a
    /// task parked here holds nothing the pool needs.
    ///
    /// ## Errors
    /// `DbError::NotFound` if the event does not exist. The lease is
    /// released before returning.
    pub async fn lock_event(&self, event_id: &str) -> DbResult<EventLease> {
        let guard = self.locks.acquire(event_id).await;

        let event = self
            .events()
            .get_by_id(event_id)
            .await?
            .ok_or_else(|| DbError::not_found("Event", event_id))?;

        Ok(EventLease::new(event, guard))
    }

    /// The lease registry, shared with every clone of this handle.
    pub fn locks(&self) -> &EventLocks {
        &self.locks
    }

    pub fn events(&self) -> EventRepository {
        EventRepository::new(self.pool.clone())
    }

    pub fn tickets(&self) -> TicketRepository {
        TicketRepository::new(self.pool.clone())
    }

    pub fn waitlist(&self) -> WaitlistRepository {
        WaitlistRepository::new(self.pool.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    /// Closes the pool. Later repository calls fail with `ConnectionFailed`.
    pub async fn close(&self) {
        info!("Closing box office store");
        self.pool.close().await;
    }

    /// True if a trivial query succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);
    }

    #[tokio::test]
    async fn test_file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boxoffice.db");

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        db.users()
            .insert("u-1", "ada@example.com", "Ada")
            .await
            .unwrap();
        db.close().await;

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        assert!(db.users().get_by_id("u-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_lock_missing_event_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.lock_event("nope").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert_eq!(db.locks().active(), 0);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .busy_timeout(Duration::from_secs(1));

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }
}
