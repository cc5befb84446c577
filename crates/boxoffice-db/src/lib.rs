//! # boxoffice-db: Inventory Store and Waitlist Queue
//!
//! This crate provides all persistence for Box Office: events and their
//! ticket counter, tickets, the per-event waitlist, and the user reference
//! table. It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Box Office Data Flow                             │
//! │                                                                         │
//! │  BookingEngine::book(event, user, reference)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  boxoffice-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ EventRepo     │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ TicketRepo    │    │   _schema    │  │   │
//! │  │   │ EventLocks    │    │ WaitlistRepo  │    │              │  │   │
//! │  │   │ (locks.rs)    │    │ UserRepo      │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`locks`] - Per-event leases
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use boxoffice_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("boxoffice.db")).await?;
//!
//! let lease = db.lock_event(&event_id).await?;
//! println!("{} left", lease.event().available_tickets);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod locks;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use locks::{EventLease, EventLocks};
pub use migrations::SchemaVersion;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::event::EventRepository;
pub use repository::ticket::TicketRepository;
pub use repository::user::UserRepository;
pub use repository::waitlist::WaitlistRepository;
