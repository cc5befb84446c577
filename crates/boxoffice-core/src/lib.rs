//! # boxoffice-core: Pure Domain Model for Box Office
//!
//! This crate is the vocabulary shared by every other crate in the
//! workspace: events, tickets, waitlist entries, the outcome of a booking,
//! and the error taxonomy callers branch on. It performs no I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Box Office Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            boxoffice-engine (Booking Engine, Lifecycle)         │   │
//! │  │        book() ─► cancel() ─► withdraw() ─► sweep_expired()      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ boxoffice-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   error   │  │ validation│  │   │
//! │  │   │  Event    │  │   Money   │  │ CoreError │  │   rules   │  │   │
//! │  │   │  Ticket   │  │  (minor)  │  │ Rejection │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 boxoffice-db (Inventory Store)                  │   │
//! │  │          SQLite tables, migrations, per-event leases            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities (Event, Ticket, WaitlistEntry) and outcomes
//! - [`money`] - Money in the currency's minor unit (no floating point)
//! - [`error`] - Error taxonomy with stable machine codes
//! - [`validation`] - Input validation for event creation/update
//!
//! ## Example Usage
//!
//! ```rust
//! use boxoffice_core::money::Money;
//!
//! // Prices are stored in minor units (kobo, cents)
//! let price = Money::from_minor(500_000); // 5,000.00
//! assert_eq!(price.major(), 5_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{
    ConflictKind, CoreError, CoreResult, ErrorCategory, PaymentFailure, StateKind, ValidationError,
};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum capacity a single event may be created with.
///
/// ## Business Reason
/// Guards against typos (an extra zero) turning a club night into a stadium.
pub const MAX_EVENT_CAPACITY: i64 = 1_000_000;
