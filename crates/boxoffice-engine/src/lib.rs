//! # boxoffice-engine: Ticket-Inventory Transaction Engine
//!
//! Booking, cancellation with waitlist promotion, event lifecycle, payments
//! and the expiry sweeper, on top of `boxoffice-db`.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            BoxOffice                                    │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ BookingEngine  │  │ EventLifecycle │  │  ExpirySweeper         │    │
//! │  │                │  │                │  │                        │    │
//! │  │ book / cancel  │  │ create/update  │  │ interval loop calling  │    │
//! │  │ withdraw       │  │ cancel/delete  │  │ sweep_expired()        │    │
//! │  │ queries        │  │ sweep_expired  │  │                        │    │
//! │  └───────┬────────┘  └───────┬────────┘  └────────────────────────┘    │
//! │          │                   │                                          │
//! │          ▼                   ▼                                          │
//! │  ┌─────────────────────────────────────────┐  ┌─────────────────────┐  │
//! │  │   boxoffice-db: Database + EventLocks   │  │  PaymentGateway     │  │
//! │  └─────────────────────────────────────────┘  │  paystack | mock    │  │
//! │                                               └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`booking`] - `BookingEngine`
//! - [`lifecycle`] - `EventLifecycle`
//! - [`payment`] - Gateway trait, Paystack client, mock
//! - [`sweeper`] - Background expiry sweep
//! - [`config`] - TOML + environment configuration
//! - [`service`] - `BoxOffice` wiring
//! - [`error`] - Engine error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use boxoffice_engine::{BoxOffice, BoxOfficeConfig};
//!
//! let office = BoxOffice::open(BoxOfficeConfig::load(None)?).await?;
//!
//! match office.booking().book(&event_id, &user_id, &reference).await? {
//!     BookingOutcome::Booked { ticket, payment_url } => { /* ... */ }
//!     BookingOutcome::Waitlisted { entry } => { /* ... */ }
//!     BookingOutcome::Rejected(reason) => println!("{}", reason.code()),
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod booking;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod payment;
pub mod service;
pub mod sweeper;

// =============================================================================
// Re-exports
// =============================================================================

pub use booking::BookingEngine;
pub use config::{
    BoxOfficeConfig, DatabaseSettings, PaymentConfirmation, PaymentProvider, PaymentSettings,
    SweeperSettings,
};
pub use error::{EngineError, EngineResult};
pub use lifecycle::EventLifecycle;
pub use payment::{
    build_gateway, MockBehavior, MockGateway, PaymentError, PaymentGateway, PaystackGateway,
};
pub use service::{open_database, BoxOffice};
pub use sweeper::{ExpirySweeper, SweeperHandle};
