//! # Seed Data Loader
//!
//! Populates the database with a demo catalog and a couple of orders.
//!
//! ## Usage
//! ```bash
//! # Built-in demo catalog, database from config (or ./pharma.db)
//! cargo run -p pharma-db --bin seed
//!
//! # Specify database path
//! cargo run -p pharma-db --bin seed -- --db ./data/pharma.db
//!
//! # Load the catalog from a JSON document
//! cargo run -p pharma-db --bin seed -- --data ./catalog.json
//! ```
//!
//! ## Data File Shape
//! ```json
//! {
//!   "categories":   [{ "label": "Cardiologie", "description": null }],
//!   "suppliers":    [{ "name": "Pfizer", "email": "orders@pfizer.example", "categories": ["Cardiologie"] }],
//!   "medications":  [{ "name": "Kardegic", "category": "Cardiologie", "units_on_hand": 5, "reorder_threshold": 10 }],
//!   "dispensaries": [{ "code": "ALFKI", "name": "Pharmacie Alfred", "address": { "city": "Berlin" } }]
//! }
//! ```
//!
//! After loading, one demo order is placed and shipped and a second one is
//! left open. The restock plan is logged last.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pharma_core::{Dispensary, NewCategory, NewMedication, NewSupplier, PostalAddress};
use pharma_db::{Database, PharmaConfig};

#[derive(Debug, Deserialize)]
struct SeedData {
    #[serde(default)]
    categories: Vec<NewCategory>,
    #[serde(default)]
    suppliers: Vec<SeedSupplier>,
    #[serde(default)]
    medications: Vec<SeedMedication>,
    #[serde(default)]
    dispensaries: Vec<Dispensary>,
}

#[derive(Debug, Deserialize)]
struct SeedSupplier {
    name: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    /// Category labels.
    #[serde(default)]
    categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SeedMedication {
    name: String,
    /// Category label.
    category: String,
    #[serde(default)]
    quantity_per_unit: Option<String>,
    #[serde(default)]
    unit_price_cents: Option<i64>,
    #[serde(default)]
    units_on_hand: i64,
    #[serde(default)]
    reorder_threshold: i64,
    #[serde(default)]
    unavailable: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut db_path: Option<PathBuf> = None;
    let mut data_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--data" => {
                if i + 1 < args.len() {
                    data_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("PharmaNet Seed Data Loader");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  Config file (default: platform config dir)");
                println!("  -d, --db <PATH>      Database file path (overrides config)");
                println!("      --data <PATH>    JSON catalog to load instead of the demo data");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let mut config = PharmaConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    let data = match &data_path {
        Some(path) => {
            info!(path = %path.display(), "Reading seed data");
            serde_json::from_str(&std::fs::read_to_string(path)?)?
        }
        None => demo_data(),
    };

    let db = Database::new(config.db_config()).await?;
    info!(path = %config.database.path.display(), "Connected, migrations applied");

    if !db.catalog().list_dispensaries().await?.is_empty() {
        warn!("Database already has dispensaries, skipping seed. Delete the database file to regenerate.");
        return Ok(());
    }

    load(&db, data).await?;
    place_demo_orders(&db, &config).await?;

    let plan = db.replenishment().restock_plan().await?;
    for request in &plan.requests {
        let names: Vec<&str> = request.medications.iter().map(|m| m.name.as_str()).collect();
        info!(
            supplier = %request.supplier.name,
            email = request.supplier.email.as_deref().unwrap_or("-"),
            medications = ?names,
            "Restock request"
        );
    }

    info!("Seed complete");
    Ok(())
}

/// `RUST_LOG` wins over the built-in filter.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,pharma_db=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn load(db: &Database, data: SeedData) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = db.catalog();

    let mut categories = HashMap::new();
    for category in &data.categories {
        let inserted = catalog.insert_category(category).await?;
        categories.insert(inserted.label.clone(), inserted.code);
    }
    info!(count = categories.len(), "Categories loaded");

    let code_of = |label: &str| {
        categories
            .get(label)
            .copied()
            .ok_or_else(|| format!("unknown category '{label}'"))
    };

    for supplier in &data.suppliers {
        let codes = supplier
            .categories
            .iter()
            .map(|label| code_of(label.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        catalog
            .insert_supplier(
                &NewSupplier {
                    name: supplier.name.clone(),
                    email: supplier.email.clone(),
                    phone: supplier.phone.clone(),
                },
                &codes,
            )
            .await?;
    }
    info!(count = data.suppliers.len(), "Suppliers loaded");

    for medication in &data.medications {
        let mut new = NewMedication::new(&medication.name, code_of(medication.category.as_str())?)
            .with_stock(medication.units_on_hand, medication.reorder_threshold);
        if let Some(cents) = medication.unit_price_cents {
            new = new.with_price_cents(cents);
        }
        if let Some(packaging) = &medication.quantity_per_unit {
            new.quantity_per_unit = packaging.clone();
        }
        new.unavailable = medication.unavailable;
        catalog.insert_medication(&new).await?;
    }
    info!(count = data.medications.len(), "Medications loaded");

    for dispensary in &data.dispensaries {
        catalog.insert_dispensary(dispensary).await?;
    }
    info!(count = data.dispensaries.len(), "Dispensaries loaded");

    Ok(())
}

/// Ships one order and leaves one open for the first dispensary, using
/// the first orderable medications that are not already low on stock.
async fn place_demo_orders(db: &Database, config: &PharmaConfig) -> Result<(), Box<dyn std::error::Error>> {
    let Some(dispensary) = db.catalog().list_dispensaries().await?.into_iter().next() else {
        warn!("No dispensary to place demo orders for");
        return Ok(());
    };
    let stocked: Vec<_> = db
        .catalog()
        .available_medications()
        .await?
        .into_iter()
        .filter(|m| !m.stock.is_low_stock() && m.stock.available() >= 4)
        .take(2)
        .collect();
    if stocked.is_empty() {
        warn!("No stocked medication to place demo orders with");
        return Ok(());
    }

    let service = db.order_service().with_discount_policy(config.discount_policy());

    let shipped = service.create_order(&dispensary.code).await?;
    for medication in &stocked {
        service.add_line(shipped.number(), medication.reference, 2).await?;
    }
    service.ship_order(shipped.number()).await?;

    let open = service.create_order(&dispensary.code).await?;
    service.add_line(open.number(), stocked[0].reference, 1).await?;

    Ok(())
}

fn demo_data() -> SeedData {
    fn category(label: &str, description: &str) -> NewCategory {
        NewCategory {
            label: label.to_string(),
            description: Some(description.to_string()),
        }
    }

    fn medication(name: &str, category: &str, on_hand: i64, threshold: i64, cents: i64) -> SeedMedication {
        SeedMedication {
            name: name.to_string(),
            category: category.to_string(),
            quantity_per_unit: None,
            unit_price_cents: Some(cents),
            units_on_hand: on_hand,
            reorder_threshold: threshold,
            unavailable: false,
        }
    }

    fn dispensary(code: &str, name: &str, street: &str, city: &str, postal_code: &str) -> Dispensary {
        Dispensary {
            code: code.to_string(),
            name: name.to_string(),
            contact: None,
            title: None,
            address: PostalAddress {
                street: Some(street.to_string()),
                city: Some(city.to_string()),
                region: None,
                postal_code: Some(postal_code.to_string()),
                country: Some("France".to_string()),
            },
            phone: None,
            fax: None,
        }
    }

    SeedData {
        categories: vec![
            category("Cardiologie", "Antiplatelets, statins"),
            category("Antalgique", "Pain relief"),
            category("Dermatologie", "Creams and ointments"),
        ],
        suppliers: vec![
            SeedSupplier {
                name: "Pfizer".to_string(),
                email: Some("orders@pfizer.example".to_string()),
                phone: None,
                categories: vec!["Cardiologie".to_string()],
            },
            SeedSupplier {
                name: "Sanofi".to_string(),
                email: Some("supply@sanofi.example".to_string()),
                phone: None,
                categories: vec!["Cardiologie".to_string(), "Antalgique".to_string()],
            },
        ],
        medications: vec![
            medication("Kardegic", "Cardiologie", 5, 10, 312),
            medication("Tahor", "Cardiologie", 20, 5, 1250),
            medication("Doliprane", "Antalgique", 500, 50, 218),
            medication("Cicalfate", "Dermatologie", 2, 4, 790),
        ],
        dispensaries: vec![
            dispensary("ALFKI", "Pharmacie Alfred", "12 rue des Lilas", "Albi", "81000"),
            dispensary("BONAP", "Pharmacie Bon Port", "3 quai du Port", "Marseille", "13002"),
        ],
    }
}
