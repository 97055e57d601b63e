//! # Order Repository
//!
//! Persistence for the Order aggregate: the `orders` header row and its
//! `order_lines`.
//!
//! ## Saving an Aggregate
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  save_order(&mut *tx, &order)                                          │
//! │    1. UPDATE orders        header fields (ship date, address, ...)     │
//! │    2. DELETE order_lines   ids no longer in the aggregate              │
//! │    3. UPSERT order_lines   every line in the aggregate                 │
//! │                                                                         │
//! │  Deletes run before upserts so UNIQUE(order_number, medication_ref)   │
//! │  never sees a removed line and its replacement at the same time.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{HashMap, HashSet};

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use pharma_core::{Line, LineId, Order, OrderDraft, OrderHeader, OrderNumber};

use crate::error::{DbError, DbResult};

macro_rules! header_select {
    () => {
        "SELECT number, dispensary_code, entry_date, ship_date, recipient, \
         street, city, region, postal_code, country, discount_bps, version \
         FROM orders"
    };
}

// =============================================================================
// Connection-scoped operations
// =============================================================================

/// Takes the write lock through the order row. False if it is absent.
pub(crate) async fn claim_order(conn: &mut SqliteConnection, number: OrderNumber) -> DbResult<bool> {
    let result = sqlx::query("UPDATE orders SET version = version + 1 WHERE number = ?1")
        .bind(number)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Claims the order owning `line_id`. `None` if the line is absent.
pub(crate) async fn claim_order_of_line(conn: &mut SqliteConnection, line_id: &str) -> DbResult<Option<OrderNumber>> {
    let number = sqlx::query_scalar::<_, OrderNumber>(
        r#"
        UPDATE orders SET version = version + 1
        WHERE number = (SELECT order_number FROM order_lines WHERE id = ?1)
        RETURNING number
        "#,
    )
    .bind(line_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(number)
}

pub(crate) async fn load_order(conn: &mut SqliteConnection, number: OrderNumber) -> DbResult<Option<Order>> {
    let header = sqlx::query_as::<_, OrderHeader>(concat!(header_select!(), " WHERE number = ?1"))
        .bind(number)
        .fetch_optional(&mut *conn)
        .await?;
    let Some(header) = header else {
        return Ok(None);
    };

    let lines = sqlx::query_as::<_, Line>(
        "SELECT id, order_number, medication_ref, quantity FROM order_lines WHERE order_number = ?1 ORDER BY id",
    )
    .bind(number)
    .fetch_all(&mut *conn)
    .await?;

    restore(header, lines).map(Some)
}

/// Inserts a fresh order and returns it with its storage-assigned number.
pub(crate) async fn insert_order(conn: &mut SqliteConnection, draft: OrderDraft) -> DbResult<Order> {
    let address = &draft.delivery_address;
    let number = sqlx::query_scalar::<_, OrderNumber>(
        r#"
        INSERT INTO orders (
            dispensary_code, entry_date, ship_date, recipient,
            street, city, region, postal_code, country,
            discount_bps
        ) VALUES (?1, ?2, NULL, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        RETURNING number
        "#,
    )
    .bind(&draft.dispensary_code)
    .bind(draft.entry_date)
    .bind(&draft.recipient)
    .bind(&address.street)
    .bind(&address.city)
    .bind(&address.region)
    .bind(&address.postal_code)
    .bind(&address.country)
    .bind(draft.discount.bps())
    .fetch_one(&mut *conn)
    .await?;

    debug!(number, dispensary = %draft.dispensary_code, "Order inserted");
    Ok(draft.into_order(number))
}

/// Writes the aggregate back: header fields, removed lines, current lines.
pub(crate) async fn save_order(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    let header = order.header();
    let address = &header.delivery_address;
    let result = sqlx::query(
        r#"
        UPDATE orders SET
            ship_date = ?2,
            recipient = ?3,
            street = ?4, city = ?5, region = ?6, postal_code = ?7, country = ?8,
            discount_bps = ?9
        WHERE number = ?1
        "#,
    )
    .bind(header.number)
    .bind(header.ship_date)
    .bind(&header.recipient)
    .bind(&address.street)
    .bind(&address.city)
    .bind(&address.region)
    .bind(&address.postal_code)
    .bind(&address.country)
    .bind(header.discount_bps)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Order", header.number));
    }

    let stored: Vec<LineId> = sqlx::query_scalar("SELECT id FROM order_lines WHERE order_number = ?1")
        .bind(header.number)
        .fetch_all(&mut *conn)
        .await?;
    let current: HashSet<&str> = order.lines().map(|l| l.id.as_str()).collect();

    for id in stored.iter().filter(|id| !current.contains(id.as_str())) {
        sqlx::query("DELETE FROM order_lines WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
    }

    for line in order.lines() {
        sqlx::query(
            r#"
            INSERT INTO order_lines (id, order_number, medication_ref, quantity)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (id) DO UPDATE SET quantity = excluded.quantity
            "#,
        )
        .bind(&line.id)
        .bind(line.order_number)
        .bind(line.medication_ref)
        .bind(line.quantity)
        .execute(&mut *conn)
        .await?;
    }

    debug!(number = header.number, lines = order.line_count(), "Order saved");
    Ok(())
}

/// Sum of line quantities over the dispensary's shipped orders.
pub(crate) async fn shipped_units_for(conn: &mut SqliteConnection, dispensary_code: &str) -> DbResult<i64> {
    let units: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(l.quantity), 0)
        FROM order_lines l
        JOIN orders o ON o.number = l.order_number
        WHERE o.dispensary_code = ?1 AND o.ship_date IS NOT NULL
        "#,
    )
    .bind(dispensary_code)
    .fetch_one(&mut *conn)
    .await?;
    Ok(units)
}

pub(crate) async fn in_progress_for(conn: &mut SqliteConnection, dispensary_code: &str) -> DbResult<Vec<Order>> {
    let headers = sqlx::query_as::<_, OrderHeader>(concat!(
        header_select!(),
        " WHERE dispensary_code = ?1 AND ship_date IS NULL ORDER BY number DESC"
    ))
    .bind(dispensary_code)
    .fetch_all(&mut *conn)
    .await?;
    if headers.is_empty() {
        return Ok(Vec::new());
    }

    let lines = sqlx::query_as::<_, Line>(
        r#"
        SELECT l.id, l.order_number, l.medication_ref, l.quantity
        FROM order_lines l
        JOIN orders o ON o.number = l.order_number
        WHERE o.dispensary_code = ?1 AND o.ship_date IS NULL
        ORDER BY l.id
        "#,
    )
    .bind(dispensary_code)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_order: HashMap<OrderNumber, Vec<Line>> = HashMap::new();
    for line in lines {
        by_order.entry(line.order_number).or_default().push(line);
    }

    headers
        .into_iter()
        .map(|header| {
            let lines = by_order.remove(&header.number).unwrap_or_default();
            restore(header, lines)
        })
        .collect()
}

/// Stored rows that break the aggregate's invariants are a storage fault.
fn restore(header: OrderHeader, lines: Vec<Line>) -> DbResult<Order> {
    let number = header.number;
    Order::restore(header, lines).map_err(|e| DbError::Internal(format!("order {number} is corrupt: {e}")))
}

// =============================================================================
// OrderRepository
// =============================================================================

/// Read-only order queries over the pool.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    pub async fn get(&self, number: OrderNumber) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        load_order(&mut conn, number).await
    }

    /// Unshipped orders of a dispensary, newest first.
    pub async fn in_progress_for(&self, dispensary_code: &str) -> DbResult<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        in_progress_for(&mut conn, dispensary_code).await
    }

    pub async fn shipped_units_for(&self, dispensary_code: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        shipped_units_for(&mut conn, dispensary_code).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
