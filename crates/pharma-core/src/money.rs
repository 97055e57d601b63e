//! # Money Module
//!
//! Integer money and discount rates.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  0.1 + 0.2 = 0.30000000000000004  ❌                                    │
//! │                                                                         │
//! │  Unit prices are stored as i64 cents, discounts as basis points.        │
//! │  A 15% discount is DiscountRate(1500), never 0.15.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use pharma_core::money::{DiscountRate, Money};
//!
//! let price = Money::from_cents(1099); // €10.99
//! assert_eq!(price.cents(), 1099);
//! assert_eq!(DiscountRate::from_bps(1500).to_string(), "15.00%");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }
}

// =============================================================================
// Discount Rate
// =============================================================================

/// Discount rate in basis points.
///
/// 1 basis point = 0.01%, so 1500 bps = 15%. Rates above 10000 are clamped
/// on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountRate(u32);

impl DiscountRate {
    pub const MAX_BPS: u32 = 10_000;

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        if bps > Self::MAX_BPS {
            DiscountRate(Self::MAX_BPS)
        } else {
            DiscountRate(bps)
        }
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn none() -> Self {
        DiscountRate(0)
    }

    #[inline]
    pub const fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for DiscountRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_keeps_cents() {
        assert_eq!(Money::from_cents(1099).cents(), 1099);
        assert_eq!(Money::from_cents(-550).cents(), -550);
    }

    #[test]
    fn test_discount_rate_display() {
        assert_eq!(DiscountRate::from_bps(1500).to_string(), "15.00%");
        assert_eq!(DiscountRate::from_bps(5).to_string(), "0.05%");
        assert_eq!(DiscountRate::none().to_string(), "0.00%");
    }

    #[test]
    fn test_discount_rate_is_clamped() {
        assert_eq!(DiscountRate::from_bps(25_000).bps(), DiscountRate::MAX_BPS);
        assert!(DiscountRate::default().is_none());
    }
}
