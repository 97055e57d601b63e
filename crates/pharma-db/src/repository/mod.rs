//! # Repository Module
//!
//! SQL for the catalog, the orders and the stock ledger.
//!
//! ## Two Kinds of Access
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Pool-backed handles (reads, standalone catalog writes)                │
//! │       db.catalog().get_medication(7)                                   │
//! │       db.orders().in_progress_for("ALFKI")                             │
//! │       db.stock().low_stock()                                           │
//! │                                                                         │
//! │  Connection-scoped functions (inside a service transaction)            │
//! │       order::claim_order(&mut *tx, 42)                                 │
//! │       StockLedger::reserve(&mut *tx, &mut medication, 10)              │
//! │       order::save_order(&mut *tx, &order)                              │
//! │                                                                         │
//! │  The second kind never begins or commits; the caller owns the tx.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`catalog::CatalogRepository`] - Dispensaries, categories, suppliers, medications
//! - [`order::OrderRepository`] - Order reads
//! - [`stock::StockLedger`] - Stock counter writes and the low-stock stream

/// Medication row selection shared by every medication query. Child modules
/// declared below see it through textual macro scope.
macro_rules! medication_select {
    () => {
        "SELECT reference, name, category_code, quantity_per_unit, unit_price_cents, image_url, \
         units_on_hand, units_committed, reorder_threshold, unavailable, version \
         FROM medications"
    };
}

pub mod catalog;
pub mod order;
pub mod stock;
