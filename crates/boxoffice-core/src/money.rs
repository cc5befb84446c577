//! # Money Module
//!
//! Provides the `Money` type for ticket prices.
//!
//! ## Why Minor Units?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PRICES NEVER TOUCH FLOATING POINT                                      │
//! │                                                                         │
//! │  Event.price_minor (i64) ──► Money ──► gateway amount (minor units)    │
//! │                                                                         │
//! │  5,000.00 NGN  =  500_000 kobo                                          │
//! │                                                                         │
//! │  The payment provider expects the minor unit, the database stores     │
//! │  the minor unit, only display code ever divides by 100.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use boxoffice_core::money::Money;
//!
//! let price = Money::from_minor(250_050);
//! assert_eq!(price.major(), 2_500);
//! assert_eq!(price.minor_part(), 50);
//! assert_eq!(price.to_string(), "2500.50");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in the currency's smallest unit (kobo, cents).
///
/// Ticket prices are never negative; refunds are out of scope, so unlike a
/// ledger amount this type is only ever built from validated prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    ///
    /// This is what gets sent to the payment gateway.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns the whole major-unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor-unit remainder (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Free events skip the payment gateway entirely.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering, no currency symbol (the currency is a deployment
/// concern, not a domain one).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Multiplication by a ticket count (revenue reporting).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, count: i64) -> Self {
        Money(self.0 * count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
