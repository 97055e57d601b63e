//! # Catalog Repository
//!
//! Dispensaries, categories, suppliers and medications.
//!
//! ## Coverage Graph
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  medications.category_code ──► categories.code                         │
//! │                                     ▲                                   │
//! │                                     │                                   │
//! │          supplier_categories (supplier_id, category_code)              │
//! │                                     │                                   │
//! │                                     ▼                                   │
//! │                               suppliers.id                              │
//! │                                                                         │
//! │  suppliers_covering([7, 9]):                                           │
//! │    categories of 7 and 9 → suppliers linked to any of them             │
//! │    → each supplier with ALL of its categories                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use pharma_core::validation::{validate_category, validate_dispensary, validate_medication, validate_supplier};
use pharma_core::{
    Category, CategoryCode, CoreError, Dispensary, DispensaryContact, Medication, MedicationRef, NewCategory,
    NewMedication, NewSupplier, StockLevels, Supplier, SupplierCoverage, SupplierId, UnitsOrdered,
};

use crate::error::{DbError, DbResult, ServiceResult};
use crate::repository::stock;

macro_rules! dispensary_select {
    () => {
        "SELECT code, name, contact, title, street, city, region, postal_code, country, phone, fax \
         FROM dispensaries"
    };
}

// =============================================================================
// Connection-scoped lookups
// =============================================================================

pub(crate) async fn find_dispensary(conn: &mut SqliteConnection, code: &str) -> DbResult<Option<Dispensary>> {
    let dispensary = sqlx::query_as::<_, Dispensary>(concat!(dispensary_select!(), " WHERE code = ?1"))
        .bind(code)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(dispensary)
}

pub(crate) async fn find_medication(
    conn: &mut SqliteConnection,
    reference: MedicationRef,
) -> DbResult<Option<Medication>> {
    let medication = sqlx::query_as::<_, Medication>(concat!(medication_select!(), " WHERE reference = ?1"))
        .bind(reference)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(medication)
}

/// Takes the write lock through the dispensary row. False if it is absent.
pub(crate) async fn claim_dispensary(conn: &mut SqliteConnection, code: &str) -> DbResult<bool> {
    let result = sqlx::query("UPDATE dispensaries SET version = version + 1 WHERE code = ?1")
        .bind(code)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Takes the write lock through the medication row. False if it is absent.
pub(crate) async fn claim_medication(conn: &mut SqliteConnection, reference: MedicationRef) -> DbResult<bool> {
    let result = sqlx::query("UPDATE medications SET version = version + 1 WHERE reference = ?1")
        .bind(reference)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

// =============================================================================
// CatalogRepository
// =============================================================================

/// Repository for catalog records.
///
/// ## Usage
/// ```rust,ignore
/// let catalog = db.catalog();
///
/// let cardio = catalog.insert_category(&NewCategory { label: "Cardiologie".into(), description: None }).await?;
/// let kardegic = catalog
///     .insert_medication(&NewMedication::new("Kardegic", cardio.code).with_stock(5, 10))
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Dispensaries
    // -------------------------------------------------------------------------

    pub async fn insert_dispensary(&self, dispensary: &Dispensary) -> ServiceResult<Dispensary> {
        validate_dispensary(dispensary)?;
        debug!(code = %dispensary.code, "Inserting dispensary");

        let address = &dispensary.address;
        sqlx::query(
            r#"
            INSERT INTO dispensaries (
                code, name, contact, title,
                street, city, region, postal_code, country,
                phone, fax
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&dispensary.code)
        .bind(&dispensary.name)
        .bind(&dispensary.contact)
        .bind(&dispensary.title)
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.region)
        .bind(&address.postal_code)
        .bind(&address.country)
        .bind(&dispensary.phone)
        .bind(&dispensary.fax)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, dispensary.code.clone()),
            other => other,
        })?;

        Ok(dispensary.clone())
    }

    pub async fn get_dispensary(&self, code: &str) -> DbResult<Option<Dispensary>> {
        let mut conn = self.pool.acquire().await?;
        find_dispensary(&mut conn, code).await
    }

    pub async fn list_dispensaries(&self) -> DbResult<Vec<Dispensary>> {
        let dispensaries = sqlx::query_as::<_, Dispensary>(concat!(dispensary_select!(), " ORDER BY code"))
            .fetch_all(&self.pool)
            .await?;
        Ok(dispensaries)
    }

    /// Replaces a dispensary's contact fields. Existing orders keep the
    /// address they copied at creation.
    pub async fn update_dispensary_contact(&self, code: &str, contact: &DispensaryContact) -> ServiceResult<Dispensary> {
        let updated = Dispensary {
            code: code.to_string(),
            name: contact.name.clone(),
            contact: contact.contact.clone(),
            title: contact.title.clone(),
            address: contact.address.clone(),
            phone: contact.phone.clone(),
            fax: contact.fax.clone(),
        };
        validate_dispensary(&updated)?;

        let address = &updated.address;
        let result = sqlx::query(
            r#"
            UPDATE dispensaries SET
                name = ?2, contact = ?3, title = ?4,
                street = ?5, city = ?6, region = ?7, postal_code = ?8, country = ?9,
                phone = ?10, fax = ?11,
                version = version + 1
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .bind(&updated.name)
        .bind(&updated.contact)
        .bind(&updated.title)
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.region)
        .bind(&address.postal_code)
        .bind(&address.country)
        .bind(&updated.phone)
        .bind(&updated.fax)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("Dispensary", code).into());
        }
        info!(code = %code, "Dispensary contact updated");
        Ok(updated)
    }

    // -------------------------------------------------------------------------
    // Categories
    // -------------------------------------------------------------------------

    pub async fn insert_category(&self, category: &NewCategory) -> ServiceResult<Category> {
        validate_category(category)?;
        debug!(label = %category.label, "Inserting category");

        let inserted = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (label, description) VALUES (?1, ?2) RETURNING code, label, description",
        )
        .bind(category.label.trim())
        .bind(&category.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, category.label.clone()),
            other => other,
        })?;
        Ok(inserted)
    }

    pub async fn get_category(&self, code: CategoryCode) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT code, label, description FROM categories WHERE code = ?1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    pub async fn list_categories(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>("SELECT code, label, description FROM categories ORDER BY label")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    // -------------------------------------------------------------------------
    // Suppliers
    // -------------------------------------------------------------------------

    /// Inserts a supplier and links it to `categories` in one transaction.
    pub async fn insert_supplier(&self, supplier: &NewSupplier, categories: &[CategoryCode]) -> ServiceResult<Supplier> {
        validate_supplier(supplier)?;
        debug!(name = %supplier.name, categories = categories.len(), "Inserting supplier");

        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query_as::<_, Supplier>(
            "INSERT INTO suppliers (name, email, phone) VALUES (?1, ?2, ?3) RETURNING id, name, email, phone",
        )
        .bind(supplier.name.trim())
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, supplier.name.clone()),
            other => other,
        })?;

        for code in categories {
            link(&mut tx, inserted.id, *code).await?;
        }
        tx.commit().await?;

        Ok(inserted)
    }

    pub async fn get_supplier(&self, id: SupplierId) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>("SELECT id, name, email, phone FROM suppliers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(supplier)
    }

    /// Records that a supplier covers a category. Linking twice is a no-op.
    pub async fn link_supplier(&self, supplier: SupplierId, category: CategoryCode) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        link(&mut conn, supplier, category).await
    }

    /// Suppliers covering the category of any of `medications`, each with
    /// every category it covers. Ordered by supplier name.
    pub async fn suppliers_covering(&self, medications: &[MedicationRef]) -> DbResult<Vec<SupplierCoverage>> {
        if medications.is_empty() {
            return Ok(Vec::new());
        }
        debug!(medications = medications.len(), "Looking up covering suppliers");

        let mut conn = self.pool.acquire().await?;

        let mut query = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT DISTINCT s.id, s.name, s.email, s.phone
            FROM suppliers s
            JOIN supplier_categories sc ON sc.supplier_id = s.id
            JOIN medications m ON m.category_code = sc.category_code
            WHERE m.reference IN (
            "#,
        );
        let mut refs = query.separated(", ");
        for reference in medications {
            refs.push_bind(*reference);
        }
        refs.push_unseparated(") ORDER BY s.name");
        let suppliers = query.build_query_as::<Supplier>().fetch_all(&mut *conn).await?;

        if suppliers.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT sc.supplier_id, c.code, c.label, c.description
            FROM supplier_categories sc
            JOIN categories c ON c.code = sc.category_code
            WHERE sc.supplier_id IN (
            "#,
        );
        let mut ids = query.separated(", ");
        for supplier in &suppliers {
            ids.push_bind(supplier.id);
        }
        ids.push_unseparated(") ORDER BY c.label");
        let links = query
            .build_query_as::<CoverageRow>()
            .fetch_all(&mut *conn)
            .await?;

        let mut by_supplier: HashMap<SupplierId, Vec<Category>> = HashMap::new();
        for row in links {
            by_supplier.entry(row.supplier_id).or_default().push(Category {
                code: row.code,
                label: row.label,
                description: row.description,
            });
        }

        Ok(suppliers
            .into_iter()
            .map(|supplier| SupplierCoverage {
                categories: by_supplier.remove(&supplier.id).unwrap_or_default(),
                supplier,
            })
            .collect())
    }

    // -------------------------------------------------------------------------
    // Medications
    // -------------------------------------------------------------------------

    pub async fn insert_medication(&self, medication: &NewMedication) -> ServiceResult<Medication> {
        validate_medication(medication)?;
        StockLevels::new(medication.units_on_hand, medication.reorder_threshold)?;
        debug!(name = %medication.name, category = medication.category_code, "Inserting medication");

        let inserted = sqlx::query_as::<_, Medication>(
            r#"
            INSERT INTO medications (
                name, category_code, quantity_per_unit, unit_price_cents,
                units_on_hand, units_committed, reorder_threshold, unavailable, image_url
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8)
            RETURNING reference, name, category_code, quantity_per_unit, unit_price_cents, image_url,
                      units_on_hand, units_committed, reorder_threshold, unavailable, version
            "#,
        )
        .bind(medication.name.trim())
        .bind(medication.category_code)
        .bind(&medication.quantity_per_unit)
        .bind(medication.unit_price_cents)
        .bind(medication.units_on_hand)
        .bind(medication.reorder_threshold)
        .bind(medication.unavailable)
        .bind(&medication.image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, medication.name.clone()),
            other => other,
        })?;
        Ok(inserted)
    }

    pub async fn get_medication(&self, reference: MedicationRef) -> DbResult<Option<Medication>> {
        let mut conn = self.pool.acquire().await?;
        find_medication(&mut conn, reference).await
    }

    pub async fn list_medications(&self) -> DbResult<Vec<Medication>> {
        let medications = sqlx::query_as::<_, Medication>(concat!(medication_select!(), " ORDER BY name"))
            .fetch_all(&self.pool)
            .await?;
        Ok(medications)
    }

    /// Orderable right now: not flagged and with uncommitted stock.
    pub async fn available_medications(&self) -> DbResult<Vec<Medication>> {
        let medications = sqlx::query_as::<_, Medication>(concat!(
            medication_select!(),
            " WHERE unavailable = 0 AND units_on_hand > units_committed ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(medications)
    }

    /// Flags or unflags a medication. Open orders keep their reservations.
    pub async fn set_unavailable(&self, reference: MedicationRef, unavailable: bool) -> ServiceResult<Medication> {
        let mut tx = self.pool.begin().await?;
        if !claim_medication(&mut tx, reference).await? {
            return Err(CoreError::not_found("Medication", reference).into());
        }
        let mut medication = find_medication(&mut tx, reference)
            .await?
            .ok_or_else(|| DbError::not_found("Medication", reference))?;
        medication.stock.set_unavailable(unavailable);
        stock::persist(&mut tx, &mut medication).await?;
        tx.commit().await?;

        info!(reference, unavailable, "Medication availability changed");
        Ok(medication)
    }

    /// Records a physical count or a delivery. On-hand may not drop below
    /// what open orders have committed.
    pub async fn recount_stock(&self, reference: MedicationRef, units_on_hand: i64) -> ServiceResult<Medication> {
        let mut tx = self.pool.begin().await?;
        if !claim_medication(&mut tx, reference).await? {
            return Err(CoreError::not_found("Medication", reference).into());
        }
        let mut medication = find_medication(&mut tx, reference)
            .await?
            .ok_or_else(|| DbError::not_found("Medication", reference))?;
        let before = medication.stock.units_on_hand();
        medication.stock.recount(units_on_hand)?;
        stock::persist(&mut tx, &mut medication).await?;
        tx.commit().await?;

        info!(reference, before, after = units_on_hand, "Stock recounted");
        Ok(medication)
    }

    /// Units ordered per medication of a category, across every order,
    /// largest first.
    pub async fn units_ordered_by_category(&self, category: CategoryCode) -> DbResult<Vec<UnitsOrdered>> {
        let rows = sqlx::query_as::<_, UnitsOrdered>(
            r#"
            SELECT m.name AS name, SUM(l.quantity) AS units
            FROM order_lines l
            JOIN medications m ON m.reference = l.medication_ref
            WHERE m.category_code = ?1
            GROUP BY m.reference, m.name
            ORDER BY units DESC, m.name
            "#,
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[derive(sqlx::FromRow)]
struct CoverageRow {
    supplier_id: SupplierId,
    code: CategoryCode,
    label: String,
    description: Option<String>,
}

async fn link(conn: &mut SqliteConnection, supplier: SupplierId, category: CategoryCode) -> DbResult<()> {
    sqlx::query("INSERT OR IGNORE INTO supplier_categories (supplier_id, category_code) VALUES (?1, ?2)")
        .bind(supplier)
        .bind(category)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::pool::{Database, DbConfig};
    use pharma_core::{PostalAddress, ValidationError};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn category(label: &str) -> NewCategory {
        NewCategory {
            label: label.to_string(),
            description: None,
        }
    }

    fn supplier(name: &str) -> NewSupplier {
        NewSupplier {
            name: name.to_string(),
            email: None,
            phone: None,
        }
    }

    fn alfki() -> Dispensary {
        Dispensary {
            code: "ALFKI".to_string(),
            name: "Pharmacie Alfred".to_string(),
            contact: Some("Maria Anders".to_string()),
            title: None,
            address: PostalAddress {
                street: Some("Obere Str. 57".to_string()),
                city: Some("Berlin".to_string()),
                region: None,
                postal_code: Some("12209".to_string()),
                country: Some("Germany".to_string()),
            },
            phone: None,
            fax: None,
        }
    }

    #[tokio::test]
    async fn test_dispensary_roundtrip_and_update() {
        let catalog = db().await.catalog();
        catalog.insert_dispensary(&alfki()).await.unwrap();

        let stored = catalog.get_dispensary("ALFKI").await.unwrap().unwrap();
        assert_eq!(stored, alfki());

        let mut contact = DispensaryContact {
            name: "Pharmacie Alfred".to_string(),
            ..Default::default()
        };
        contact.address.city = Some("Potsdam".to_string());
        let updated = catalog.update_dispensary_contact("ALFKI", &contact).await.unwrap();
        assert_eq!(updated.address.city.as_deref(), Some("Potsdam"));

        let err = catalog.update_dispensary_contact("NONE", &contact).await.unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_dispensary_code() {
        let catalog = db().await.catalog();
        catalog.insert_dispensary(&alfki()).await.unwrap();
        let err = catalog.insert_dispensary(&alfki()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(DbError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn test_invalid_dispensary_code_is_rule() {
        let catalog = db().await.catalog();
        let mut dispensary = alfki();
        dispensary.code = "TOOLONG".to_string();
        let err = catalog.insert_dispensary(&dispensary).await.unwrap_err();
        assert!(matches!(
            err.rule(),
            Some(CoreError::Validation(ValidationError::TooLong { .. }))
        ));
    }

    #[tokio::test]
    async fn test_insert_medication_validates_stock() {
        let catalog = db().await.catalog();
        let cardio = catalog.insert_category(&category("Cardiologie")).await.unwrap();

        let med = catalog
            .insert_medication(&NewMedication::new("Kardegic", cardio.code).with_stock(5, 10))
            .await
            .unwrap();
        assert_eq!(med.stock.units_on_hand(), 5);
        assert_eq!(med.stock.units_committed(), 0);
        assert!(med.stock.is_low_stock());

        let err = catalog
            .insert_medication(&NewMedication::new("Tahor", cardio.code).with_stock(-1, 0))
            .await
            .unwrap_err();
        assert!(err.is_business());

        let err = catalog
            .insert_medication(&NewMedication::new("Kardegic", cardio.code))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Storage(DbError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn test_unknown_category_is_foreign_key_violation() {
        let catalog = db().await.catalog();
        let err = catalog
            .insert_medication(&NewMedication::new("Orphan", 42))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Storage(DbError::ForeignKeyViolation { .. })));
    }

    #[tokio::test]
    async fn test_available_medications() {
        let catalog = db().await.catalog();
        let cardio = catalog.insert_category(&category("Cardiologie")).await.unwrap();
        let tahor = catalog
            .insert_medication(&NewMedication::new("Tahor", cardio.code).with_stock(20, 5))
            .await
            .unwrap();
        catalog
            .insert_medication(&NewMedication::new("Empty", cardio.code))
            .await
            .unwrap();
        let kardegic = catalog
            .insert_medication(&NewMedication::new("Kardegic", cardio.code).with_stock(5, 10))
            .await
            .unwrap();
        catalog.set_unavailable(kardegic.reference, true).await.unwrap();

        let available = catalog.available_medications().await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].reference, tahor.reference);
    }

    #[tokio::test]
    async fn test_recount_stock() {
        let catalog = db().await.catalog();
        let cardio = catalog.insert_category(&category("Cardiologie")).await.unwrap();
        let med = catalog
            .insert_medication(&NewMedication::new("Tahor", cardio.code).with_stock(20, 5))
            .await
            .unwrap();

        let recounted = catalog.recount_stock(med.reference, 35).await.unwrap();
        assert_eq!(recounted.stock.units_on_hand(), 35);
        assert!(recounted.version > med.version);

        let err = catalog.recount_stock(med.reference, -3).await.unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::Validation(_))));
        let err = catalog.recount_stock(999, 3).await.unwrap_err();
        assert!(matches!(err.rule(), Some(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_suppliers_covering() {
        let catalog = db().await.catalog();
        let cardio = catalog.insert_category(&category("Cardiologie")).await.unwrap();
        let pain = catalog.insert_category(&category("Antalgique")).await.unwrap();
        let derma = catalog.insert_category(&category("Dermatologie")).await.unwrap();

        catalog.insert_supplier(&supplier("Sanofi"), &[cardio.code, pain.code]).await.unwrap();
        let pfizer = catalog.insert_supplier(&supplier("Pfizer"), &[cardio.code]).await.unwrap();
        catalog.insert_supplier(&supplier("Bioderma"), &[derma.code]).await.unwrap();
        catalog.link_supplier(pfizer.id, cardio.code).await.unwrap();

        let kardegic = catalog
            .insert_medication(&NewMedication::new("Kardegic", cardio.code))
            .await
            .unwrap();
        let doliprane = catalog
            .insert_medication(&NewMedication::new("Doliprane", pain.code))
            .await
            .unwrap();

        let coverage = catalog.suppliers_covering(&[kardegic.reference]).await.unwrap();
        let names: Vec<_> = coverage.iter().map(|c| c.supplier.name.as_str()).collect();
        assert_eq!(names, vec!["Pfizer", "Sanofi"]);
        // Sanofi comes with everything it covers, not only the matched category
        assert_eq!(coverage[1].categories.len(), 2);
        assert!(coverage[1].covers(pain.code));

        let coverage = catalog
            .suppliers_covering(&[kardegic.reference, doliprane.reference])
            .await
            .unwrap();
        assert_eq!(coverage.len(), 2);

        assert!(catalog.suppliers_covering(&[]).await.unwrap().is_empty());
        assert!(catalog.suppliers_covering(&[999]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_category_and_supplier_lookups() {
        let catalog = db().await.catalog();
        let pain = catalog.insert_category(&category("Antalgique")).await.unwrap();
        let cardio = catalog.insert_category(&category("Cardiologie")).await.unwrap();
        catalog.insert_category(&category("Anesthesie")).await.unwrap();

        assert_eq!(catalog.get_category(cardio.code).await.unwrap(), Some(cardio.clone()));
        assert!(catalog.get_category(999).await.unwrap().is_none());

        let labels: Vec<_> = catalog
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.label)
            .collect();
        assert_eq!(labels, vec!["Anesthesie", "Antalgique", "Cardiologie"]);

        let mut new = supplier("Sanofi");
        new.email = Some("supply@sanofi.example".to_string());
        let sanofi = catalog.insert_supplier(&new, &[pain.code]).await.unwrap();
        let stored = catalog.get_supplier(sanofi.id).await.unwrap().unwrap();
        assert_eq!(stored, sanofi);
        assert_eq!(stored.email.as_deref(), Some("supply@sanofi.example"));
        assert!(catalog.get_supplier(sanofi.id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_medications_by_name() {
        let catalog = db().await.catalog();
        let cardio = catalog.insert_category(&category("Cardiologie")).await.unwrap();
        for name in ["Tahor", "Kardegic", "Plavix"] {
            catalog
                .insert_medication(&NewMedication::new(name, cardio.code).with_stock(10, 0))
                .await
                .unwrap();
        }

        let names: Vec<_> = catalog
            .list_medications()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Kardegic", "Plavix", "Tahor"]);
    }

    #[tokio::test]
    async fn test_units_ordered_by_category() {
        let db = db().await;
        let catalog = db.catalog();
        catalog.insert_dispensary(&alfki()).await.unwrap();
        let pain = catalog.insert_category(&category("Antalgique")).await.unwrap();
        let cardio = catalog.insert_category(&category("Cardiologie")).await.unwrap();
        let derma = catalog.insert_category(&category("Dermatologie")).await.unwrap();

        let mut refs = HashMap::new();
        for (name, code) in [
            ("Doliprane", pain.code),
            ("Efferalgan", pain.code),
            ("Dafalgan", pain.code),
            ("Kardegic", cardio.code),
        ] {
            let med = catalog
                .insert_medication(&NewMedication::new(name, code).with_stock(100, 0))
                .await
                .unwrap();
            refs.insert(name, med.reference);
        }

        let service = db.order_service();
        let first = service.create_order("ALFKI").await.unwrap();
        service.add_line(first.number(), refs["Doliprane"], 5).await.unwrap();
        service.add_line(first.number(), refs["Kardegic"], 50).await.unwrap();
        service.ship_order(first.number()).await.unwrap();

        let second = service.create_order("ALFKI").await.unwrap();
        service.add_line(second.number(), refs["Doliprane"], 7).await.unwrap();
        service.add_line(second.number(), refs["Efferalgan"], 20).await.unwrap();

        // Summed across shipped and open orders, largest first
        let units = catalog.units_ordered_by_category(pain.code).await.unwrap();
        assert_eq!(
            units,
            vec![
                UnitsOrdered {
                    name: "Efferalgan".to_string(),
                    units: 20,
                },
                UnitsOrdered {
                    name: "Doliprane".to_string(),
                    units: 12,
                },
            ]
        );

        let units = catalog.units_ordered_by_category(cardio.code).await.unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].units, 50);

        assert!(catalog.units_ordered_by_category(derma.code).await.unwrap().is_empty());
    }
}

