//! Schema migrations, embedded at compile time from `migrations/`.
//!
//! ```text
//! 001_initial_schema.sql
//!   users     id, email UNIQUE
//!   events    total_tickets, available_tickets, status
//!             CHECK 0 <= available_tickets <= total_tickets
//!   tickets   partial UNIQUE (event_id, user_id) WHERE status = 'booked'
//!   waitlist  UNIQUE (event_id, user_id), FIFO by (created_at, position)
//! ```
//!
//! Files are append-only. A schema change is a new `NNN_name.sql`.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Applied versus embedded migration counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaVersion {
    pub embedded: usize,
    pub applied: usize,
}

impl SchemaVersion {
    pub fn is_current(&self) -> bool {
        self.applied >= self.embedded
    }
}

/// Brings the schema up to date. Already-applied files are skipped.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let before = schema_version(pool).await.ok();
    debug!(?before, "Applying box office schema");

    MIGRATOR.run(pool).await?;

    let after = schema_version(pool).await?;
    info!(applied = after.applied, "Schema is current");
    Ok(())
}

/// Reads `_sqlx_migrations`. Fails if migrations have never run.
pub async fn schema_version(pool: &SqlitePool) -> DbResult<SchemaVersion> {
    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?;

    Ok(SchemaVersion {
        embedded: MIGRATOR.migrations.len(),
        applied: applied as usize,
    })
}
