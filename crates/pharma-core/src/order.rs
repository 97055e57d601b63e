//! # Order Aggregate
//!
//! An Order and the Lines it owns.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   OrderDraft ──insert──► Order (Open) ──ship(today)──► Order (Shipped) │
//! │                            │    ▲                          frozen       │
//! │            add_or_increment_line / remove_line                          │
//! │                                                                         │
//! │   Lines are keyed by id. At most one line per medication: adding a     │
//! │   medication that is already on the order grows its line instead.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The aggregate knows nothing about stock. Callers pair every line change
//! with the matching stock ledger call.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::DiscountRate;
use crate::types::{Dispensary, LineId, MedicationRef, OrderNumber, PostalAddress};
use crate::validation::{validate_address, validate_line_id, validate_quantity, validate_recipient};
use crate::{DEFAULT_DISCOUNT_BPS, DEFAULT_DISCOUNT_THRESHOLD_UNITS};

// =============================================================================
// Order Status
// =============================================================================

/// Derived from the ship date. One-way: Open → Shipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    Shipped,
}

// =============================================================================
// Line
// =============================================================================

/// One medication/quantity entry within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Line {
    pub id: LineId,
    pub order_number: OrderNumber,
    pub medication_ref: MedicationRef,
    pub quantity: i64,
}

/// Effect of [`Order::reduce_line`]. Both variants carry the medication and
/// the number of units that left the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineReduction {
    /// The line stays with a smaller quantity. `quantity` is the amount taken off.
    Reduced(Line),
    /// The whole line was dropped.
    Removed(Line),
}

impl LineReduction {
    pub fn released(&self) -> &Line {
        match self {
            LineReduction::Reduced(line) | LineReduction::Removed(line) => line,
        }
    }
}

// =============================================================================
// Discount Policy
// =============================================================================

/// Loyalty discount applied when an order is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountPolicy {
    /// Shipped units a dispensary must strictly exceed.
    pub threshold_units: i64,
    pub rate: DiscountRate,
}

impl Default for DiscountPolicy {
    fn default() -> Self {
        Self {
            threshold_units: DEFAULT_DISCOUNT_THRESHOLD_UNITS,
            rate: DiscountRate::from_bps(DEFAULT_DISCOUNT_BPS),
        }
    }
}

impl DiscountPolicy {
    /// Rate for a dispensary given its historical shipped units.
    ///
    /// ```rust
    /// use pharma_core::order::DiscountPolicy;
    ///
    /// let policy = DiscountPolicy::default();
    /// assert_eq!(policy.rate_for(150).bps(), 1500);
    /// assert_eq!(policy.rate_for(100).bps(), 0);
    /// assert_eq!(policy.rate_for(40).bps(), 0);
    /// ```
    pub fn rate_for(&self, shipped_units: i64) -> DiscountRate {
        if shipped_units > self.threshold_units {
            self.rate
        } else {
            DiscountRate::none()
        }
    }
}

// =============================================================================
// Order Header
// =============================================================================

/// The order row without its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderHeader {
    pub number: OrderNumber,
    pub dispensary_code: String,
    #[ts(as = "String")]
    pub entry_date: NaiveDate,
    #[ts(as = "Option<String>")]
    pub ship_date: Option<NaiveDate>,
    pub recipient: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub delivery_address: PostalAddress,
    pub discount_bps: u32,
    pub version: i64,
}

impl OrderHeader {
    #[inline]
    pub fn discount(&self) -> DiscountRate {
        DiscountRate::from_bps(self.discount_bps)
    }

    #[inline]
    pub fn is_shipped(&self) -> bool {
        self.ship_date.is_some()
    }
}

// =============================================================================
// Order Draft
// =============================================================================

/// An order that has not been assigned a number yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub dispensary_code: String,
    pub entry_date: NaiveDate,
    pub recipient: Option<String>,
    pub delivery_address: PostalAddress,
    pub discount: DiscountRate,
}

impl OrderDraft {
    /// New order for `dispensary`, delivering to a copy of its address.
    pub fn for_dispensary(dispensary: &Dispensary, entry_date: NaiveDate, discount: DiscountRate) -> Self {
        Self {
            dispensary_code: dispensary.code.clone(),
            entry_date,
            recipient: None,
            delivery_address: dispensary.address.clone(),
            discount,
        }
    }

    /// Empty open order once storage has assigned `number`.
    pub fn into_order(self, number: OrderNumber) -> Order {
        Order {
            header: OrderHeader {
                number,
                dispensary_code: self.dispensary_code,
                entry_date: self.entry_date,
                ship_date: None,
                recipient: self.recipient,
                delivery_address: self.delivery_address,
                discount_bps: self.discount.bps(),
                version: 0,
            },
            lines: BTreeMap::new(),
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// Aggregate root over an order's lines.
///
/// Built only by [`Order::restore`] and [`OrderDraft::into_order`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct Order {
    #[serde(flatten)]
    header: OrderHeader,
    lines: BTreeMap<LineId, Line>,
}

impl Order {
    /// Reassembles an order read from storage.
    pub fn restore(header: OrderHeader, lines: Vec<Line>) -> CoreResult<Self> {
        let mut order = Order {
            header,
            lines: BTreeMap::new(),
        };
        for line in lines {
            validate_line_id(&line.id)?;
            validate_quantity(line.quantity)?;
            if line.order_number != order.header.number {
                return Err(ValidationError::InvalidFormat {
                    field: "order_number".to_string(),
                    reason: format!("line {} belongs to order {}", line.id, line.order_number),
                }
                .into());
            }
            if order.line_for(line.medication_ref).is_some() {
                return Err(ValidationError::Duplicate {
                    field: "medication_ref".to_string(),
                    value: line.medication_ref.to_string(),
                }
                .into());
            }
            order.lines.insert(line.id.clone(), line);
        }
        Ok(order)
    }

    pub fn header(&self) -> &OrderHeader {
        &self.header
    }

    #[inline]
    pub fn number(&self) -> OrderNumber {
        self.header.number
    }

    pub fn dispensary_code(&self) -> &str {
        &self.header.dispensary_code
    }

    pub fn entry_date(&self) -> NaiveDate {
        self.header.entry_date
    }

    pub fn ship_date(&self) -> Option<NaiveDate> {
        self.header.ship_date
    }

    pub fn status(&self) -> OrderStatus {
        if self.header.is_shipped() {
            OrderStatus::Shipped
        } else {
            OrderStatus::Open
        }
    }

    pub fn is_shipped(&self) -> bool {
        self.header.is_shipped()
    }

    pub fn discount(&self) -> DiscountRate {
        self.header.discount()
    }

    pub fn delivery_address(&self) -> &PostalAddress {
        &self.header.delivery_address
    }

    pub fn recipient(&self) -> Option<&str> {
        self.header.recipient.as_deref()
    }

    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.values()
    }

    pub fn line(&self, id: &str) -> Option<&Line> {
        self.lines.get(id)
    }

    pub fn line_for(&self, medication: MedicationRef) -> Option<&Line> {
        self.lines.values().find(|l| l.medication_ref == medication)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn total_units(&self) -> i64 {
        self.lines.values().map(|l| l.quantity).sum()
    }

    /// Fails with [`CoreError::OrderShipped`] once the ship date is set.
    pub fn ensure_open(&self) -> CoreResult<()> {
        if self.is_shipped() {
            return Err(CoreError::OrderShipped {
                number: self.header.number,
            });
        }
        Ok(())
    }

    /// Adds `qty` of a medication, merging into its existing line if any.
    pub fn add_or_increment_line(&mut self, medication: MedicationRef, qty: i64) -> CoreResult<&Line> {
        self.ensure_open()?;
        validate_quantity(qty)?;

        let existing = self.line_for(medication).map(|l| l.id.clone());
        let id = match existing {
            Some(id) => {
                if let Some(line) = self.lines.get_mut(&id) {
                    line.quantity = line
                        .quantity
                        .checked_add(qty)
                        .ok_or(CoreError::InvalidQuantity { quantity: qty })?;
                }
                id
            }
            None => {
                let id = Uuid::new_v4().to_string();
                self.lines.insert(
                    id.clone(),
                    Line {
                        id: id.clone(),
                        order_number: self.header.number,
                        medication_ref: medication,
                        quantity: qty,
                    },
                );
                id
            }
        };

        self.lines
            .get(&id)
            .ok_or_else(|| CoreError::not_found("Line", &id))
    }

    /// Removes a line. Absent ids are ignored and yield `None`.
    pub fn remove_line(&mut self, id: &str) -> CoreResult<Option<Line>> {
        self.ensure_open()?;
        Ok(self.lines.remove(id))
    }

    /// Takes `qty` units off a line. Reducing by the whole quantity (or
    /// more) removes the line; the returned line says what was dropped.
    pub fn reduce_line(&mut self, id: &str, qty: i64) -> CoreResult<Option<LineReduction>> {
        self.ensure_open()?;
        validate_quantity(qty)?;

        let Some(line) = self.lines.get_mut(id) else {
            return Ok(None);
        };
        if qty < line.quantity {
            line.quantity -= qty;
            let mut released = line.clone();
            released.quantity = qty;
            return Ok(Some(LineReduction::Reduced(released)));
        }
        Ok(self.lines.remove(id).map(LineReduction::Removed))
    }

    /// Marks the order shipped on `today`. Not idempotent.
    pub fn ship(&mut self, today: NaiveDate) -> CoreResult<()> {
        self.ensure_open()?;
        self.header.ship_date = Some(today);
        Ok(())
    }

    /// Redirects delivery. Only open orders can be redirected.
    pub fn set_delivery_address(&mut self, address: PostalAddress, recipient: Option<String>) -> CoreResult<()> {
        self.ensure_open()?;
        validate_address(&address)?;
        validate_recipient(recipient.as_deref())?;
        self.header.delivery_address = address;
        self.header.recipient = recipient;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
