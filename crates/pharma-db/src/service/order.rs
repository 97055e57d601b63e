//! # Order Service
//!
//! Transactional operations over orders and the stock ledger.
//!
//! ## Transaction Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        add_line(42, 7, 10)                              │
//! │                                                                         │
//! │  validate qty                              InvalidQuantity              │
//! │  BEGIN                                                                  │
//! │  UPDATE orders SET version+1 WHERE 42      ← write lock taken here     │
//! │  load medication 7                         NotFound                     │
//! │  ensure available                          Unavailable                  │
//! │  order claimed?                            NotFound                     │
//! │  load order 42, ensure open                OrderShipped                 │
//! │  reserve 10 (version-guarded write)        OutOfStock                   │
//! │  merge line, save order                                                 │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error drops the transaction: nothing is written.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Claiming the root row first means a transaction holds SQLite's write
//! lock before it reads anything it will later write. Concurrent writers
//! queue on `busy_timeout` instead of racing on stale reads.

use chrono::{Local, NaiveDate};
use sqlx::SqlitePool;
use tracing::{debug, info};

use pharma_core::validation::validate_quantity;
use pharma_core::{
    CoreError, DiscountPolicy, Line, LineReduction, MedicationRef, Order, OrderDraft, OrderNumber, PostalAddress,
};

use crate::error::{DbError, ServiceResult};
use crate::repository::stock::StockLedger;
use crate::repository::{catalog, order as orders};
use crate::service::logged;

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Order operations, each one atomic.
///
/// ## Usage
/// ```rust,ignore
/// let service = db.order_service();
///
/// let order = service.create_order("ALFKI").await?;
/// let line = service.add_line(order.number(), 7, 10).await?;
/// service.ship_order(order.number()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct OrderService {
    pool: SqlitePool,
    policy: DiscountPolicy,
    clock: fn() -> NaiveDate,
}

impl OrderService {
    pub fn new(pool: SqlitePool) -> Self {
        OrderService {
            pool,
            policy: DiscountPolicy::default(),
            clock: today,
        }
    }

    pub fn with_discount_policy(mut self, policy: DiscountPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the source of entry and ship dates.
    pub fn with_clock(mut self, clock: fn() -> NaiveDate) -> Self {
        self.clock = clock;
        self
    }

    pub fn discount_policy(&self) -> DiscountPolicy {
        self.policy
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Opens an empty order for a dispensary, delivering to its address.
    ///
    /// The discount is decided here, from the units the dispensary has
    /// received on shipped orders.
    pub async fn create_order(&self, dispensary_code: &str) -> ServiceResult<Order> {
        logged("create_order", self.try_create_order(dispensary_code).await)
    }

    async fn try_create_order(&self, dispensary_code: &str) -> ServiceResult<Order> {
        let mut tx = self.pool.begin().await?;
        if !catalog::claim_dispensary(&mut tx, dispensary_code).await? {
            return Err(CoreError::not_found("Dispensary", dispensary_code).into());
        }
        let dispensary = catalog::find_dispensary(&mut tx, dispensary_code)
            .await?
            .ok_or_else(|| DbError::not_found("Dispensary", dispensary_code))?;

        let shipped_units = orders::shipped_units_for(&mut tx, dispensary_code).await?;
        let discount = self.policy.rate_for(shipped_units);

        let draft = OrderDraft::for_dispensary(&dispensary, (self.clock)(), discount);
        let created = orders::insert_order(&mut tx, draft).await?;
        tx.commit().await?;

        info!(
            number = created.number(),
            dispensary = %dispensary_code,
            shipped_units,
            discount = %discount,
            "Order created"
        );
        Ok(created)
    }

    /// Adds `qty` units of a medication to an open order, merging into the
    /// medication's line if it already has one. Returns the resulting line.
    pub async fn add_line(&self, number: OrderNumber, medication_ref: MedicationRef, qty: i64) -> ServiceResult<Line> {
        logged("add_line", self.try_add_line(number, medication_ref, qty).await)
    }

    async fn try_add_line(&self, number: OrderNumber, medication_ref: MedicationRef, qty: i64) -> ServiceResult<Line> {
        validate_quantity(qty)?;

        let mut tx = self.pool.begin().await?;
        let claimed = orders::claim_order(&mut tx, number).await?;

        let mut medication = StockLedger::load(&mut tx, medication_ref).await?;
        medication.ensure_available()?;

        if !claimed {
            return Err(CoreError::not_found("Order", number).into());
        }
        let mut order = orders::load_order(&mut tx, number)
            .await?
            .ok_or_else(|| DbError::not_found("Order", number))?;
        order.ensure_open()?;

        StockLedger::reserve(&mut tx, &mut medication, qty).await?;
        let line = order.add_or_increment_line(medication_ref, qty)?.clone();
        orders::save_order(&mut tx, &order).await?;
        tx.commit().await?;

        info!(
            number,
            medication = medication_ref,
            qty,
            line_quantity = line.quantity,
            committed = medication.stock.units_committed(),
            "Line added"
        );
        Ok(line)
    }

    /// Deletes a line and releases its stock. `None` if there is no such line.
    pub async fn remove_line(&self, line_id: &str) -> ServiceResult<Option<Line>> {
        logged("remove_line", self.try_remove_line(line_id).await)
    }

    async fn try_remove_line(&self, line_id: &str) -> ServiceResult<Option<Line>> {
        let mut tx = self.pool.begin().await?;
        let Some(number) = orders::claim_order_of_line(&mut tx, line_id).await? else {
            debug!(line = %line_id, "No such line, nothing to remove");
            return Ok(None);
        };
        let mut order = orders::load_order(&mut tx, number)
            .await?
            .ok_or_else(|| DbError::not_found("Order", number))?;

        let Some(line) = order.remove_line(line_id)? else {
            return Ok(None);
        };
        let mut medication = StockLedger::load(&mut tx, line.medication_ref).await?;
        StockLedger::release(&mut tx, &mut medication, line.quantity).await?;
        orders::save_order(&mut tx, &order).await?;
        tx.commit().await?;

        info!(number, line = %line_id, released = line.quantity, "Line removed");
        Ok(Some(line))
    }

    /// Takes `qty` units off a line and releases them. Reducing by the whole
    /// quantity removes the line. `None` if there is no such line.
    pub async fn reduce_line(&self, line_id: &str, qty: i64) -> ServiceResult<Option<LineReduction>> {
        logged("reduce_line", self.try_reduce_line(line_id, qty).await)
    }

    async fn try_reduce_line(&self, line_id: &str, qty: i64) -> ServiceResult<Option<LineReduction>> {
        validate_quantity(qty)?;

        let mut tx = self.pool.begin().await?;
        let Some(number) = orders::claim_order_of_line(&mut tx, line_id).await? else {
            return Ok(None);
        };
        let mut order = orders::load_order(&mut tx, number)
            .await?
            .ok_or_else(|| DbError::not_found("Order", number))?;

        let Some(reduction) = order.reduce_line(line_id, qty)? else {
            return Ok(None);
        };
        let released = reduction.released();
        let mut medication = StockLedger::load(&mut tx, released.medication_ref).await?;
        StockLedger::release(&mut tx, &mut medication, released.quantity).await?;
        orders::save_order(&mut tx, &order).await?;
        tx.commit().await?;

        info!(number, line = %line_id, released = released.quantity, "Line reduced");
        Ok(Some(reduction))
    }

    /// Ships an open order: every line's units leave the stock for good.
    pub async fn ship_order(&self, number: OrderNumber) -> ServiceResult<Order> {
        logged("ship_order", self.try_ship_order(number).await)
    }

    async fn try_ship_order(&self, number: OrderNumber) -> ServiceResult<Order> {
        let mut tx = self.pool.begin().await?;
        if !orders::claim_order(&mut tx, number).await? {
            return Err(CoreError::not_found("Order", number).into());
        }
        let mut order = orders::load_order(&mut tx, number)
            .await?
            .ok_or_else(|| DbError::not_found("Order", number))?;
        order.ensure_open()?;

        let lines: Vec<Line> = order.lines().cloned().collect();
        for line in &lines {
            let mut medication = StockLedger::load(&mut tx, line.medication_ref).await?;
            StockLedger::fulfill(&mut tx, &mut medication, line.quantity).await?;
        }
        order.ship((self.clock)())?;
        orders::save_order(&mut tx, &order).await?;
        tx.commit().await?;

        info!(
            number,
            lines = lines.len(),
            units = order.total_units(),
            ship_date = ?order.ship_date(),
            "Order shipped"
        );
        Ok(order)
    }

    /// Redirects an open order to another address.
    pub async fn update_delivery_address(
        &self,
        number: OrderNumber,
        address: PostalAddress,
        recipient: Option<String>,
    ) -> ServiceResult<Order> {
        logged(
            "update_delivery_address",
            self.try_update_delivery_address(number, address, recipient).await,
        )
    }

    async fn try_update_delivery_address(
        &self,
        number: OrderNumber,
        address: PostalAddress,
        recipient: Option<String>,
    ) -> ServiceResult<Order> {
        let mut tx = self.pool.begin().await?;
        if !orders::claim_order(&mut tx, number).await? {
            return Err(CoreError::not_found("Order", number).into());
        }
        let mut order = orders::load_order(&mut tx, number)
            .await?
            .ok_or_else(|| DbError::not_found("Order", number))?;
        order.set_delivery_address(address, recipient)?;
        orders::save_order(&mut tx, &order).await?;
        tx.commit().await?;

        info!(number, "Delivery address updated");
        Ok(order)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_order(&self, number: OrderNumber) -> ServiceResult<Order> {
        logged("get_order", self.try_get_order(number).await)
    }

    async fn try_get_order(&self, number: OrderNumber) -> ServiceResult<Order> {
        let mut conn = self.pool.acquire().await?;
        orders::load_order(&mut conn, number)
            .await?
            .ok_or_else(|| CoreError::not_found("Order", number).into())
    }

    /// Unshipped orders of a dispensary, newest first. Empty for an unknown
    /// dispensary.
    pub async fn orders_in_progress_for(&self, dispensary_code: &str) -> ServiceResult<Vec<Order>> {
        logged(
            "orders_in_progress_for",
            self.try_orders_in_progress_for(dispensary_code).await,
        )
    }

    async fn try_orders_in_progress_for(&self, dispensary_code: &str) -> ServiceResult<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::in_progress_for(&mut conn, dispensary_code).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use pharma_core::{DiscountRate, Dispensary, NewCategory, NewMedication};

    fn pinned() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 4).unwrap()
    }

    async fn setup() -> (Database, MedicationRef) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();
        catalog
            .insert_dispensary(&Dispensary {
                code: "QUICK".to_string(),
                name: "Pharmacie Quick".to_string(),
                contact: None,
                title: None,
                address: PostalAddress {
                    city: Some("Cunewalde".to_string()),
                    ..Default::default()
                },
                phone: None,
                fax: None,
            })
            .await
            .unwrap();
        let category = catalog
            .insert_category(&NewCategory {
                label: "Antalgique".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let med = catalog
            .insert_medication(&NewMedication::new("Doliprane", category.code).with_stock(50, 0))
            .await
            .unwrap();
        (db, med.reference)
    }

    #[tokio::test]
    async fn test_clock_sets_entry_and_ship_dates() {
        let (db, med) = setup().await;
        let service = db.order_service().with_clock(pinned);

        let order = service.create_order("QUICK").await.unwrap();
        assert_eq!(order.entry_date(), pinned());
        service.add_line(order.number(), med, 2).await.unwrap();
        let shipped = service.ship_order(order.number()).await.unwrap();
        assert_eq!(shipped.ship_date(), Some(pinned()));
    }

    #[tokio::test]
    async fn test_custom_discount_policy() {
        let (db, med) = setup().await;
        let service = db.order_service().with_discount_policy(DiscountPolicy {
            threshold_units: 1,
            rate: DiscountRate::from_bps(500),
        });

        let first = service.create_order("QUICK").await.unwrap();
        service.add_line(first.number(), med, 2).await.unwrap();
        service.ship_order(first.number()).await.unwrap();

        let second = service.create_order("QUICK").await.unwrap();
        assert_eq!(second.discount().bps(), 500);
    }

    #[tokio::test]
    async fn test_reduce_line_releases_stock() {
        let (db, med) = setup().await;
        let service = db.order_service();
        let order = service.create_order("QUICK").await.unwrap();
        let line = service.add_line(order.number(), med, 10).await.unwrap();

        let reduced = service.reduce_line(&line.id, 4).await.unwrap().unwrap();
        assert!(matches!(reduced, LineReduction::Reduced(_)));
        let stored = db.catalog().get_medication(med).await.unwrap().unwrap();
        assert_eq!(stored.stock.units_committed(), 6);
        assert_eq!(service.get_order(order.number()).await.unwrap().total_units(), 6);

        let removed = service.reduce_line(&line.id, 6).await.unwrap().unwrap();
        assert!(matches!(removed, LineReduction::Removed(_)));
        let stored = db.catalog().get_medication(med).await.unwrap().unwrap();
        assert_eq!(stored.stock.units_committed(), 0);
        assert!(service.reduce_line(&line.id, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_delivery_address() {
        let (db, _) = setup().await;
        let service = db.order_service();
        let order = service.create_order("QUICK").await.unwrap();

        let elsewhere = PostalAddress {
            city: Some("Leipzig".to_string()),
            ..Default::default()
        };
        let updated = service
            .update_delivery_address(order.number(), elsewhere, Some("Horst Kloss".to_string()))
            .await
            .unwrap();
        assert_eq!(updated.delivery_address().city.as_deref(), Some("Leipzig"));

        // The dispensary keeps its own address
        let dispensary = db.catalog().get_dispensary("QUICK").await.unwrap().unwrap();
        assert_eq!(dispensary.address.city.as_deref(), Some("Cunewalde"));

        let stored = service.get_order(order.number()).await.unwrap();
        assert_eq!(stored.recipient(), Some("Horst Kloss"));
    }
}
