//! # Error Types
//!
//! Domain-specific error types for pharma-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  pharma-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  pharma-db errors (separate crate)                                     │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── ServiceError     - Rule(CoreError) | Storage(DbError)             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → Collaborator       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Every variant except [`CoreError::LedgerInvariant`] is a business-rule
/// violation the caller is expected to see and act on.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced entity (dispensary, medication, order) does not exist.
    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    /// Line quantities must be strictly positive.
    #[error("Invalid quantity {quantity}: must be greater than zero")]
    InvalidQuantity { quantity: i64 },

    /// The medication is flagged unavailable and cannot be ordered.
    #[error("Medication {name} ({reference}) is unavailable")]
    Unavailable { reference: i64, name: String },

    /// Not enough uncommitted stock for the requested quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// add_line(order, Paracetamol, 999)
    ///      │
    ///      ▼
    /// on hand 500, committed 13 → available 487
    ///      │
    ///      ▼
    /// OutOfStock { available: 487, requested: 999 }
    /// ```
    #[error("Insufficient stock for {name} ({reference}): available {available}, requested {requested}")]
    OutOfStock {
        reference: i64,
        name: String,
        available: i64,
        requested: i64,
    },

    /// The order has shipped; it and its lines are frozen.
    #[error("Order {number} has already shipped")]
    OrderShipped { number: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A stock counter would leave its legal range.
    ///
    /// This can only happen if persisted state was corrupted or a caller
    /// bypassed the ledger. It is not a user-facing condition.
    #[error("Stock ledger invariant broken for medication {reference}: {detail}")]
    LedgerInvariant { reference: i64, detail: String },
}

impl CoreError {
    pub fn not_found(entity: &str, key: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            key: key.to_string(),
        }
    }

    /// True for violations the caller caused, false for internal breaches.
    pub fn is_business_rule(&self) -> bool {
        !matches!(self, Self::LedgerInvariant { .. })
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when data doesn't meet field requirements.
/// Used at construction boundaries before anything reaches storage.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., invalid UUID, invalid e-mail).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., two lines for the same medication).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
