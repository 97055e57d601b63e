//! # Stock Ledger Rules
//!
//! Per-medication stock counters and the only legal ways to move them.
//!
//! ## Counter Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         StockLevels                                     │
//! │                                                                         │
//! │   0 ≤ committed ≤ on_hand                                               │
//! │                                                                         │
//! │   reserve(q)  : committed += q          (line added to open order)     │
//! │   release(q)  : committed -= q          (line removed)                 │
//! │   fulfill(q)  : on_hand -= q,           (order shipped)                │
//! │                 committed -= q                                          │
//! │                                                                         │
//! │   available = on_hand - committed                                       │
//! │   low stock ⇔ on_hand < reorder_threshold                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `reserve` is the only rule a caller can legitimately fail. `release` and
//! `fulfill` move stock that was previously reserved, so a failure there
//! means the counters were already wrong.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::Medication;
use crate::validation::validate_quantity;

/// Why a counter adjustment was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("invalid quantity {0}")]
    InvalidQuantity(i64),

    #[error("medication is unavailable")]
    Unavailable,

    #[error("available {available}, requested {requested}")]
    Insufficient { available: i64, requested: i64 },

    #[error("{counter} would drop to {would_be}")]
    Underflow {
        counter: &'static str,
        would_be: i64,
    },
}

/// Stock counters for one medication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockLevels {
    units_on_hand: i64,
    units_committed: i64,
    reorder_threshold: i64,
    unavailable: bool,
}

impl StockLevels {
    /// Fresh counters with nothing committed.
    pub fn new(units_on_hand: i64, reorder_threshold: i64) -> CoreResult<Self> {
        Self::restore(units_on_hand, 0, reorder_threshold, false)
    }

    /// Rebuilds counters read from storage, rejecting impossible states.
    pub fn restore(
        units_on_hand: i64,
        units_committed: i64,
        reorder_threshold: i64,
        unavailable: bool,
    ) -> CoreResult<Self> {
        for (field, value) in [
            ("units_on_hand", units_on_hand),
            ("units_committed", units_committed),
            ("reorder_threshold", reorder_threshold),
        ] {
            if value < 0 {
                return Err(ValidationError::Negative {
                    field: field.to_string(),
                }
                .into());
            }
        }
        if units_committed > units_on_hand {
            return Err(ValidationError::OutOfRange {
                field: "units_committed".to_string(),
                min: 0,
                max: units_on_hand,
            }
            .into());
        }
        Ok(Self {
            units_on_hand,
            units_committed,
            reorder_threshold,
            unavailable,
        })
    }

    #[inline]
    pub fn units_on_hand(&self) -> i64 {
        self.units_on_hand
    }

    #[inline]
    pub fn units_committed(&self) -> i64 {
        self.units_committed
    }

    #[inline]
    pub fn reorder_threshold(&self) -> i64 {
        self.reorder_threshold
    }

    #[inline]
    pub fn is_unavailable(&self) -> bool {
        self.unavailable
    }

    /// Uncommitted stock.
    #[inline]
    pub fn available(&self) -> i64 {
        self.units_on_hand - self.units_committed
    }

    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.units_on_hand < self.reorder_threshold
    }

    /// Pledges `qty` more units to an open order.
    ///
    /// The check is against the additional quantity only: units already
    /// committed (by this order or any other) are in `units_committed`.
    pub fn reserve(&mut self, qty: i64) -> Result<(), StockError> {
        if qty <= 0 {
            return Err(StockError::InvalidQuantity(qty));
        }
        if self.unavailable {
            return Err(StockError::Unavailable);
        }
        let wanted = self.units_committed.checked_add(qty).ok_or(StockError::Insufficient {
            available: self.available(),
            requested: qty,
        })?;
        if self.units_on_hand < wanted {
            return Err(StockError::Insufficient {
                available: self.available(),
                requested: qty,
            });
        }
        self.units_committed = wanted;
        Ok(())
    }

    /// Returns `qty` previously reserved units.
    pub fn release(&mut self, qty: i64) -> Result<(), StockError> {
        if qty <= 0 {
            return Err(StockError::InvalidQuantity(qty));
        }
        let committed = self.units_committed - qty;
        if committed < 0 {
            return Err(StockError::Underflow {
                counter: "units_committed",
                would_be: committed,
            });
        }
        self.units_committed = committed;
        Ok(())
    }

    /// Consumes `qty` reserved units at shipment.
    pub fn fulfill(&mut self, qty: i64) -> Result<(), StockError> {
        if qty <= 0 {
            return Err(StockError::InvalidQuantity(qty));
        }
        let committed = self.units_committed - qty;
        if committed < 0 {
            return Err(StockError::Underflow {
                counter: "units_committed",
                would_be: committed,
            });
        }
        let on_hand = self.units_on_hand - qty;
        if on_hand < 0 {
            return Err(StockError::Underflow {
                counter: "units_on_hand",
                would_be: on_hand,
            });
        }
        self.units_committed = committed;
        self.units_on_hand = on_hand;
        Ok(())
    }

    /// Replaces on-hand stock after a physical count or a delivery.
    pub fn recount(&mut self, units_on_hand: i64) -> CoreResult<()> {
        if units_on_hand < 0 {
            return Err(ValidationError::Negative {
                field: "units_on_hand".to_string(),
            }
            .into());
        }
        if units_on_hand < self.units_committed {
            return Err(ValidationError::OutOfRange {
                field: "units_on_hand".to_string(),
                min: self.units_committed,
                max: i64::MAX,
            }
            .into());
        }
        self.units_on_hand = units_on_hand;
        Ok(())
    }

    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }
}

// =============================================================================
// Medication wrappers
// =============================================================================
// Same rules, with the medication's identity attached to the error.

impl Medication {
    pub fn reserve(&mut self, qty: i64) -> CoreResult<()> {
        validate_quantity(qty)?;
        self.stock.reserve(qty).map_err(|e| self.stock_error(e))
    }

    pub fn release(&mut self, qty: i64) -> CoreResult<()> {
        validate_quantity(qty)?;
        self.stock.release(qty).map_err(|e| self.stock_error(e))
    }

    pub fn fulfill(&mut self, qty: i64) -> CoreResult<()> {
        validate_quantity(qty)?;
        self.stock.fulfill(qty).map_err(|e| self.stock_error(e))
    }

    /// Fails with [`CoreError::Unavailable`] if the medication is flagged.
    pub fn ensure_available(&self) -> CoreResult<()> {
        if self.stock.is_unavailable() {
            return Err(self.stock_error(StockError::Unavailable));
        }
        Ok(())
    }

    fn stock_error(&self, err: StockError) -> CoreError {
        match err {
            StockError::InvalidQuantity(quantity) => CoreError::InvalidQuantity { quantity },
            StockError::Unavailable => CoreError::Unavailable {
                reference: self.reference,
                name: self.name.clone(),
            },
            StockError::Insufficient {
                available,
                requested,
            } => CoreError::OutOfStock {
                reference: self.reference,
                name: self.name.clone(),
                available,
                requested,
            },
            underflow @ StockError::Underflow { .. } => CoreError::LedgerInvariant {
                reference: self.reference,
                detail: underflow.to_string(),
            },
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
