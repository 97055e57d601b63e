//! # Stock Ledger
//!
//! The only code that writes `units_on_hand`, `units_committed` and
//! `unavailable`.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  StockLedger::load(&mut *tx, 7)          medication + version N        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Medication::reserve(10)                 pharma-core rule, in memory   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE medications SET ..., version = N + 1                           │
//! │   WHERE reference = 7 AND version = N    0 rows → DbError::Conflict    │
//! │                                                                         │
//! │  CHECK (units_committed <= units_on_hand) backs the rule up in SQL.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use pharma_core::{CoreError, Medication, MedicationRef};

use crate::error::{DbError, DbResult, ServiceResult};
use crate::repository::catalog::find_medication;

/// Stock counter persistence.
///
/// The pool-backed side serves reads. Counter writes are associated
/// functions over a connection the caller's transaction already holds.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
}

impl StockLedger {
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger { pool }
    }

    /// Medications whose on-hand stock is below their reorder threshold,
    /// streamed row by row.
    pub fn low_stock(&self) -> BoxStream<'_, DbResult<Medication>> {
        debug!("Streaming low-stock medications");
        sqlx::query_as::<_, Medication>(concat!(
            medication_select!(),
            " WHERE units_on_hand < reorder_threshold ORDER BY reference"
        ))
        .fetch(&self.pool)
        .map_err(DbError::from)
        .boxed()
    }

    /// Loads a medication for update. Fails with [`CoreError::NotFound`].
    pub async fn load(conn: &mut SqliteConnection, reference: MedicationRef) -> ServiceResult<Medication> {
        find_medication(conn, reference)
            .await?
            .ok_or_else(|| CoreError::not_found("Medication", reference).into())
    }

    /// Commits `qty` more units of `medication` to an open order.
    pub async fn reserve(conn: &mut SqliteConnection, medication: &mut Medication, qty: i64) -> ServiceResult<()> {
        medication.reserve(qty)?;
        persist(conn, medication).await?;
        Ok(())
    }

    /// Returns `qty` committed units.
    pub async fn release(conn: &mut SqliteConnection, medication: &mut Medication, qty: i64) -> ServiceResult<()> {
        medication.release(qty)?;
        persist(conn, medication).await?;
        Ok(())
    }

    /// Consumes `qty` committed units at shipment.
    pub async fn fulfill(conn: &mut SqliteConnection, medication: &mut Medication, qty: i64) -> ServiceResult<()> {
        medication.fulfill(qty)?;
        persist(conn, medication).await?;
        Ok(())
    }
}

/// Writes the stock fields of `medication` if nobody wrote them since it
/// was loaded, and advances its in-memory version.
pub(crate) async fn persist(conn: &mut SqliteConnection, medication: &mut Medication) -> DbResult<()> {
    let stock = medication.stock;
    debug!(
        reference = medication.reference,
        on_hand = stock.units_on_hand(),
        committed = stock.units_committed(),
        "Writing stock counters"
    );

    let result = sqlx::query(
        r#"
        UPDATE medications SET
            units_on_hand = ?1,
            units_committed = ?2,
            unavailable = ?3,
            version = version + 1
        WHERE reference = ?4 AND version = ?5
        "#,
    )
    .bind(stock.units_on_hand())
    .bind(stock.units_committed())
    .bind(stock.is_unavailable())
    .bind(medication.reference)
    .bind(medication.version)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::conflict("Medication", medication.reference));
    }
    medication.version += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::pool::{Database, DbConfig};
    use pharma_core::{NewCategory, NewMedication};

    async fn seeded() -> (Database, MedicationRef) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let catalog = db.catalog();
        let category = catalog
            .insert_category(&NewCategory {
                label: "Antalgique".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let med = catalog
            .insert_medication(&NewMedication::new("Doliprane", category.code).with_stock(500, 50))
            .await
            .unwrap();
        (db, med.reference)
    }

    #[tokio::test]
    async fn test_reserve_persists_and_bumps_version() {
        let (db, reference) = seeded().await;
        let mut tx = db.pool().begin().await.unwrap();
        let mut med = StockLedger::load(&mut tx, reference).await.unwrap();
        let version = med.version;
        StockLedger::reserve(&mut tx, &mut med, 10).await.unwrap();
        tx.commit().await.unwrap();

        let stored = db.catalog().get_medication(reference).await.unwrap().unwrap();
        assert_eq!(stored.stock.units_committed(), 10);
        assert_eq!(stored.version, version + 1);
        assert_eq!(med.version, stored.version);
    }

    #[tokio::test]
    async fn test_stale_version_is_conflict() {
        let (db, reference) = seeded().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let mut stale = StockLedger::load(&mut conn, reference).await.unwrap();
        let mut fresh = stale.clone();
        StockLedger::reserve(&mut conn, &mut fresh, 5).await.unwrap();

        let err = StockLedger::reserve(&mut conn, &mut stale, 5).await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(DbError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let (db, _) = seeded().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let err = StockLedger::load(&mut conn, 999).await.unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_low_stock_stream() {
        let (db, reference) = seeded().await;
        let catalog = db.catalog();
        let code = catalog.get_medication(reference).await.unwrap().unwrap().category_code;
        catalog
            .insert_medication(&NewMedication::new("Kardegic", code).with_stock(5, 10))
            .await
            .unwrap();

        let low: Vec<Medication> = db.stock().low_stock().try_collect().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "Kardegic");
    }
}
