//! # Catalog Types
//!
//! Records the order engine reads from the catalog store.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Catalog Graph                                  │
//! │                                                                         │
//! │   Dispensary ──(code)──► Order ──(id)──► Line ──(reference)──►         │
//! │                                                                         │
//! │   Medication ──(category_code)──► Category ◄──(link)── Supplier        │
//! │                                                                         │
//! │   All edges are ids. "Suppliers for a medication" is a query,          │
//! │   not a back-pointer.                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::stock::StockLevels;

/// Surrogate key of a medication.
pub type MedicationRef = i64;

/// Surrogate key of an order.
pub type OrderNumber = i64;

/// Surrogate key of a category.
pub type CategoryCode = i64;

/// Surrogate key of a supplier.
pub type SupplierId = i64;

/// Line ids are UUID v4 strings.
pub type LineId = String;

// =============================================================================
// Postal Address
// =============================================================================

/// A postal address. Embedded in dispensaries and copied into orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PostalAddress {
    pub street: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

// =============================================================================
// Dispensary
// =============================================================================

/// An ordering client location, identified by a short code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Dispensary {
    /// Business key, 1 to 5 characters.
    pub code: String,
    pub name: String,
    pub contact: Option<String>,
    /// Job title of the contact.
    pub title: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub address: PostalAddress,
    pub phone: Option<String>,
    pub fax: Option<String>,
}

/// Mutable contact fields of a dispensary. The code never changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DispensaryContact {
    pub name: String,
    pub contact: Option<String>,
    pub title: Option<String>,
    pub address: PostalAddress,
    pub phone: Option<String>,
    pub fax: Option<String>,
}

// =============================================================================
// Category & Supplier
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub code: CategoryCode,
    pub label: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCategory {
    pub label: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSupplier {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// A supplier together with every category it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SupplierCoverage {
    pub supplier: Supplier,
    pub categories: Vec<Category>,
}

impl SupplierCoverage {
    pub fn covers(&self, category: CategoryCode) -> bool {
        self.categories.iter().any(|c| c.code == category)
    }
}

// =============================================================================
// Medication
// =============================================================================

/// A catalog item with stock counters.
///
/// Stock fields live in [`StockLevels`]; they change only through the
/// ledger methods in [`crate::stock`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Medication {
    pub reference: MedicationRef,
    pub name: String,
    pub category_code: CategoryCode,
    /// Packaging, e.g. "Box of 12".
    pub quantity_per_unit: String,
    pub unit_price_cents: i64,
    pub image_url: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub stock: StockLevels,
    /// Bumped on every stock write; guards against lost updates.
    pub version: i64,
}

impl Medication {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Orderable right now: not flagged and some stock is uncommitted.
    pub fn is_orderable(&self) -> bool {
        !self.stock.is_unavailable() && self.stock.available() > 0
    }
}

/// Catalog input for a new medication.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewMedication {
    pub name: String,
    pub category_code: CategoryCode,
    #[serde(default = "default_quantity_per_unit")]
    pub quantity_per_unit: String,
    #[serde(default = "default_unit_price_cents")]
    pub unit_price_cents: i64,
    #[serde(default)]
    pub units_on_hand: i64,
    #[serde(default)]
    pub reorder_threshold: i64,
    #[serde(default)]
    pub unavailable: bool,
    #[serde(default)]
    pub image_url: Option<String>,
}

fn default_quantity_per_unit() -> String {
    "Box of 12".to_string()
}

fn default_unit_price_cents() -> i64 {
    1000
}

impl NewMedication {
    pub fn new(name: impl Into<String>, category_code: CategoryCode) -> Self {
        Self {
            name: name.into(),
            category_code,
            quantity_per_unit: default_quantity_per_unit(),
            unit_price_cents: default_unit_price_cents(),
            units_on_hand: 0,
            reorder_threshold: 0,
            unavailable: false,
            image_url: None,
        }
    }

    pub fn with_stock(mut self, units_on_hand: i64, reorder_threshold: i64) -> Self {
        self.units_on_hand = units_on_hand;
        self.reorder_threshold = reorder_threshold;
        self
    }

    pub fn with_price_cents(mut self, cents: i64) -> Self {
        self.unit_price_cents = cents;
        self
    }
}

/// Units ordered per medication within a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct UnitsOrdered {
    pub name: String,
    pub units: i64,
}
