//! # Validation Module
//!
//! Input validation for organizer-supplied event data and user emails.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (HTTP layer, out of scope)                            │
//! │  └── Deserialization, authentication                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Lifecycle manager                                            │
//! │  └── THIS MODULE: business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK (0 <= available <= total)                        │
//! │  ├── partial UNIQUE (event_id, user_id) WHERE status = 'booked'        │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use boxoffice_core::validation::{validate_capacity, validate_event_name};
//!
//! validate_event_name("Afrobeats Live").unwrap();
//! assert!(validate_capacity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{EventUpdate, NewEvent};
use crate::MAX_EVENT_CAPACITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_LOCATION_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 5_000;
const MAX_EMAIL_LEN: usize = 254;

// =============================================================================
// String Validators
// =============================================================================

fn required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates an event name: non-empty, at most 200 characters.
///
/// ## Example
/// ```rust
/// use boxoffice_core::validation::validate_event_name;
///
/// assert!(validate_event_name("Lagos Jazz Night").is_ok());
/// assert!(validate_event_name("   ").is_err());
/// ```
pub fn validate_event_name(name: &str) -> ValidationResult<()> {
    required_text("name", name, MAX_NAME_LEN)
}

/// Validates an event location: non-empty, at most 200 characters.
pub fn validate_location(location: &str) -> ValidationResult<()> {
    required_text("location", location, MAX_LOCATION_LEN)
}

pub fn validate_description(description: &str) -> ValidationResult<()> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: MAX_DESCRIPTION_LEN,
        });
    }
    Ok(())
}

/// Validates a payer email.
///
/// Deliberately shallow: one `@`, non-empty local part, a dot in the domain.
/// The identity service owns real verification.
///
/// ## Example
/// ```rust
/// use boxoffice_core::validation::validate_email;
///
/// assert!(validate_email("ada@example.com").is_ok());
/// assert!(validate_email("ada.example.com").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    required_text("email", email, MAX_EMAIL_LEN)?;

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    let email = email.trim();
    let (local, domain) = email.split_once('@').ok_or_else(|| invalid("missing @"))?;

    if local.is_empty() || domain.contains('@') {
        return Err(invalid("must be local@domain"));
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid("domain must contain a dot"));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain whitespace"));
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates event capacity.
///
/// ## Rules
/// - Must be at least 1
/// - Must not exceed [`MAX_EVENT_CAPACITY`]
pub fn validate_capacity(total_tickets: i64) -> ValidationResult<()> {
    if !(1..=MAX_EVENT_CAPACITY).contains(&total_tickets) {
        return Err(ValidationError::OutOfRange {
            field: "total_tickets".to_string(),
            min: 1,
            max: MAX_EVENT_CAPACITY,
        });
    }
    Ok(())
}

/// Validates a ticket price in minor units. Zero means a free event.
pub fn validate_price_minor(price_minor: i64) -> ValidationResult<()> {
    if price_minor < 0 {
        return Err(ValidationError::Negative {
            field: "price_minor".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Aggregate Validators
// =============================================================================

/// Validates every field of a new event.
pub fn validate_new_event(event: &NewEvent) -> ValidationResult<()> {
    validate_event_name(&event.name)?;
    validate_location(&event.location)?;
    if let Some(description) = &event.description {
        validate_description(description)?;
    }
    if let Some(organizer) = &event.organizer {
        required_text("organizer", organizer, MAX_NAME_LEN)?;
    }
    validate_price_minor(event.price_minor)?;
    validate_capacity(event.total_tickets)?;
    Ok(())
}

/// Validates the fields present in a partial update.
pub fn validate_event_update(update: &EventUpdate) -> ValidationResult<()> {
    if let Some(name) = &update.name {
        validate_event_name(name)?;
    }
    if let Some(location) = &update.location {
        validate_location(location)?;
    }
    if let Some(description) = &update.description {
        validate_description(description)?;
    }
    if let Some(organizer) = &update.organizer {
        required_text("organizer", organizer, MAX_NAME_LEN)?;
    }
    if let Some(price) = update.price_minor {
        validate_price_minor(price)?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
