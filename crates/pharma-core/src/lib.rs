//! # pharma-core: Pure Business Logic for the Pharmacy Order Engine
//!
//! This crate holds the rules of the order/inventory engine as pure code
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Pharmacy Order Engine                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │        Presentation / Notifier (external collaborators)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │      pharma-db: OrderService, ReplenishmentQuery, repositories  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ pharma-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   stock   │  │   order   │  │ validation│  │   │
//! │  │   │Dispensary │  │StockLevels│  │   Order   │  │   rules   │  │   │
//! │  │   │Medication │  │  reserve  │  │   Line    │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Catalog types (Dispensary, Medication, Category, Supplier)
//! - [`stock`] - Stock counters and the reserve/release/fulfill rules
//! - [`order`] - Order aggregate, Line items, discount policy
//! - [`replenishment`] - Grouping low-stock medications by supplier
//! - [`money`] - Money and discount rates in integer units
//! - [`error`] - Domain error types
//! - [`validation`] - Field-level validation
//!
//! ## Example Usage
//!
//! ```rust
//! use pharma_core::stock::StockLevels;
//!
//! let mut stock = StockLevels::new(500, 50).unwrap();
//! stock.reserve(10).unwrap();
//! stock.reserve(3).unwrap();
//! assert_eq!(stock.units_committed(), 13);
//!
//! // 500 < 13 + 999
//! assert!(stock.reserve(999).is_err());
//! assert_eq!(stock.units_committed(), 13);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod order;
pub mod replenishment;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{DiscountRate, Money};
pub use order::{DiscountPolicy, Line, LineReduction, Order, OrderDraft, OrderHeader, OrderStatus};
pub use stock::StockLevels;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Shipped units a dispensary must exceed before new orders get a discount.
pub const DEFAULT_DISCOUNT_THRESHOLD_UNITS: i64 = 100;

/// Loyalty discount in basis points (1500 = 15%).
pub const DEFAULT_DISCOUNT_BPS: u32 = 1500;
