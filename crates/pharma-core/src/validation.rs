//! # Validation Module
//!
//! Field-level validation for catalog records and order input.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Presentation collaborator                                    │
//! │  └── Form checks, immediate feedback                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: pharma-core (THIS MODULE)                                    │
//! │  └── Length limits, required fields, positive quantities               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE constraints                                     │
//! │  └── CHECK (units_committed <= units_on_hand)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lengths are counted in characters, not bytes: dispensary and medication
//! names routinely carry accents.

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{Dispensary, NewCategory, NewMedication, NewSupplier, PostalAddress};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field limits
// =============================================================================

pub const DISPENSARY_CODE_MAX: usize = 5;
pub const DISPENSARY_NAME_MAX: usize = 40;
pub const CONTACT_MAX: usize = 30;
pub const PHONE_MAX: usize = 24;
pub const STREET_MAX: usize = 60;
pub const CITY_MAX: usize = 15;
pub const POSTAL_CODE_MAX: usize = 10;
pub const RECIPIENT_MAX: usize = 40;
pub const CATALOG_NAME_MAX: usize = 255;

// =============================================================================
// String Validators
// =============================================================================

fn required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    optional(field, Some(value), max)
}

fn optional(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Validates a dispensary code.
///
/// ## Example
/// ```rust
/// use pharma_core::validation::validate_dispensary_code;
///
/// assert!(validate_dispensary_code("ALFKI").is_ok());
/// assert!(validate_dispensary_code("").is_err());
/// assert!(validate_dispensary_code("TOOLONG").is_err());
/// ```
pub fn validate_dispensary_code(code: &str) -> ValidationResult<()> {
    required("code", code, DISPENSARY_CODE_MAX)
}

pub fn validate_address(address: &PostalAddress) -> ValidationResult<()> {
    optional("street", address.street.as_deref(), STREET_MAX)?;
    optional("city", address.city.as_deref(), CITY_MAX)?;
    optional("region", address.region.as_deref(), CITY_MAX)?;
    optional("postal_code", address.postal_code.as_deref(), POSTAL_CODE_MAX)?;
    optional("country", address.country.as_deref(), CITY_MAX)
}

pub fn validate_dispensary(dispensary: &Dispensary) -> ValidationResult<()> {
    validate_dispensary_code(&dispensary.code)?;
    required("name", &dispensary.name, DISPENSARY_NAME_MAX)?;
    optional("contact", dispensary.contact.as_deref(), CONTACT_MAX)?;
    optional("title", dispensary.title.as_deref(), CONTACT_MAX)?;
    optional("phone", dispensary.phone.as_deref(), PHONE_MAX)?;
    optional("fax", dispensary.fax.as_deref(), PHONE_MAX)?;
    validate_address(&dispensary.address)
}

pub fn validate_recipient(recipient: Option<&str>) -> ValidationResult<()> {
    optional("recipient", recipient, RECIPIENT_MAX)
}

pub fn validate_category(category: &NewCategory) -> ValidationResult<()> {
    required("label", &category.label, CATALOG_NAME_MAX)
}

/// Validates a supplier before insert.
///
/// The e-mail is only checked for shape; delivery is the notifier's problem.
pub fn validate_supplier(supplier: &NewSupplier) -> ValidationResult<()> {
    required("name", &supplier.name, CATALOG_NAME_MAX)?;
    if let Some(email) = supplier.email.as_deref() {
        let well_formed = email
            .split_once('@')
            .map(|(local, domain)| !local.is_empty() && domain.contains('.'))
            .unwrap_or(false);
        if !well_formed {
            return Err(ValidationError::InvalidFormat {
                field: "email".to_string(),
                reason: "must look like name@domain.tld".to_string(),
            });
        }
    }
    Ok(())
}

pub fn validate_medication(medication: &NewMedication) -> ValidationResult<()> {
    required("name", &medication.name, CATALOG_NAME_MAX)?;
    validate_non_negative("unit_price_cents", medication.unit_price_cents)?;
    validate_non_negative("units_on_hand", medication.units_on_hand)?;
    validate_non_negative("reorder_threshold", medication.reorder_threshold)
}

// =============================================================================
// Numeric Validators
// =============================================================================

pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a line quantity.
///
/// Unlike the field validators this reports a business rule, not a
/// malformed record, so it returns [`CoreError::InvalidQuantity`].
pub fn validate_quantity(qty: i64) -> CoreResult<()> {
    if qty <= 0 {
        return Err(CoreError::InvalidQuantity { quantity: qty });
    }
    Ok(())
}

pub fn validate_discount_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "discount_bps".to_string(),
            min: 0,
            max: 10_000,
        });
    }
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a line id (UUID string).
pub fn validate_line_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "line id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "line id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
