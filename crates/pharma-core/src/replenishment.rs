//! # Restock Planning
//!
//! Groups low-stock medications by the suppliers able to deliver them, so a
//! notifier can send one request per supplier.
//!
//! ```text
//!   low stock: Kardegic (cardio), Doliprane (antalgic), Orphan (no supplier)
//!   coverage:  Pfizer → {cardio}, Sanofi → {cardio, antalgic}
//!
//!   Pfizer  → [Kardegic]
//!   Sanofi  → [Kardegic, Doliprane]
//!   unsupplied: [Orphan]
//! ```

use serde::Serialize;
use ts_rs::TS;

use crate::types::{Medication, Supplier, SupplierCoverage};

/// Medications one supplier should be asked to deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct RestockRequest {
    pub supplier: Supplier,
    pub medications: Vec<Medication>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct RestockPlan {
    /// One entry per supplier with something to deliver, in coverage order.
    pub requests: Vec<RestockRequest>,
    /// Low-stock medications no supplier covers.
    pub unsupplied: Vec<Medication>,
}

impl RestockPlan {
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty() && self.unsupplied.is_empty()
    }
}

/// Builds the plan. A medication is listed under every supplier covering
/// its category.
pub fn plan_restock(low_stock: Vec<Medication>, coverage: &[SupplierCoverage]) -> RestockPlan {
    let mut requests: Vec<RestockRequest> = coverage
        .iter()
        .map(|c| RestockRequest {
            supplier: c.supplier.clone(),
            medications: Vec::new(),
        })
        .collect();
    let mut unsupplied = Vec::new();

    for medication in low_stock {
        let mut supplied = false;
        for (request, covered) in requests.iter_mut().zip(coverage) {
            if covered.covers(medication.category_code) {
                request.medications.push(medication.clone());
                supplied = true;
            }
        }
        if !supplied {
            unsupplied.push(medication);
        }
    }

    requests.retain(|r| !r.medications.is_empty());
    RestockPlan {
        requests,
        unsupplied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stock::StockLevels;
    use crate::types::Category;

    fn category(code: i64, label: &str) -> Category {
        Category {
            code,
            label: label.to_string(),
            description: None,
        }
    }

    fn supplier(id: i64, name: &str) -> Supplier {
        Supplier {
            id,
            name: name.to_string(),
            email: None,
            phone: None,
        }
    }

    fn low(reference: i64, name: &str, category_code: i64) -> Medication {
        Medication {
            reference,
            name: name.to_string(),
            category_code,
            quantity_per_unit: "Box of 12".to_string(),
            unit_price_cents: 1000,
            image_url: None,
            stock: StockLevels::new(5, 10).unwrap(),
            version: 0,
        }
    }

    #[test]
    fn test_groups_by_covering_supplier() {
        let coverage = vec![
            SupplierCoverage {
                supplier: supplier(1, "Pfizer"),
                categories: vec![category(1, "Cardiologie")],
            },
            SupplierCoverage {
                supplier: supplier(2, "Sanofi"),
                categories: vec![category(1, "Cardiologie"), category(2, "Antalgique")],
            },
            SupplierCoverage {
                supplier: supplier(3, "Idle"),
                categories: vec![category(4, "Dermatologie")],
            },
        ];
        let plan = plan_restock(
            vec![
                low(10, "Kardegic", 1),
                low(11, "Doliprane", 2),
                low(12, "Orphan", 3),
            ],
            &coverage,
        );

        assert_eq!(plan.requests.len(), 2);
        assert_eq!(plan.requests[0].supplier.name, "Pfizer");
        assert_eq!(plan.requests[0].medications.len(), 1);
        assert_eq!(plan.requests[1].supplier.name, "Sanofi");
        let sanofi: Vec<_> = plan.requests[1].medications.iter().map(|m| m.reference).collect();
        assert_eq!(sanofi, vec![10, 11]);
        assert_eq!(plan.unsupplied.len(), 1);
        assert_eq!(plan.unsupplied[0].name, "Orphan");
    }

    #[test]
    fn test_nothing_low_is_empty_plan() {
        let plan = plan_restock(Vec::new(), &[]);
        assert!(plan.is_empty());
    }
}
