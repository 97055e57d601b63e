//! # Replenishment Query
//!
//! Read-only queries for the supplier notifier.
//!
//! ```text
//!   notifier ──► low_stock_medications()      on_hand < reorder_threshold
//!            ──► suppliers_for(&[refs])       suppliers + their categories
//!            ──► restock_plan()               both, grouped per supplier
//! ```

use futures_util::TryStreamExt;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use pharma_core::replenishment::{plan_restock, RestockPlan};
use pharma_core::{Medication, MedicationRef, SupplierCoverage};

use crate::error::ServiceResult;
use crate::repository::catalog::CatalogRepository;
use crate::repository::stock::StockLedger;
use crate::service::logged;

#[derive(Debug, Clone)]
pub struct ReplenishmentQuery {
    stock: StockLedger,
    catalog: CatalogRepository,
}

impl ReplenishmentQuery {
    pub fn new(pool: SqlitePool) -> Self {
        ReplenishmentQuery {
            stock: StockLedger::new(pool.clone()),
            catalog: CatalogRepository::new(pool),
        }
    }

    /// Medications whose on-hand stock is below their reorder threshold.
    pub async fn low_stock_medications(&self) -> ServiceResult<Vec<Medication>> {
        let result = self.stock.low_stock().try_collect::<Vec<_>>().await;
        logged("low_stock_medications", result.map_err(Into::into))
    }

    /// Distinct suppliers covering the category of any of `medications`,
    /// each with all of its categories, ordered by name.
    pub async fn suppliers_for(&self, medications: &[MedicationRef]) -> ServiceResult<Vec<SupplierCoverage>> {
        let result = self.catalog.suppliers_covering(medications).await;
        logged("suppliers_for", result.map_err(Into::into))
    }

    /// Low-stock medications grouped by the suppliers able to deliver them.
    pub async fn restock_plan(&self) -> ServiceResult<RestockPlan> {
        let low = self.low_stock_medications().await?;
        if low.is_empty() {
            debug!("Nothing below reorder threshold");
            return Ok(RestockPlan::default());
        }

        let refs: Vec<MedicationRef> = low.iter().map(|m| m.reference).collect();
        let coverage = self.suppliers_for(&refs).await?;
        let plan = plan_restock(low, &coverage);

        for medication in &plan.unsupplied {
            warn!(
                reference = medication.reference,
                name = %medication.name,
                category = medication.category_code,
                "Low stock with no covering supplier"
            );
        }
        info!(
            suppliers = plan.requests.len(),
            unsupplied = plan.unsupplied.len(),
            "Restock plan built"
        );
        Ok(plan)
    }
}
