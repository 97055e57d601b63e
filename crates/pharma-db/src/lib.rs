//! # pharma-db: Persistence and Services for the Pharmacy Order Engine
//!
//! This crate runs the order engine against SQLite. It owns the connection
//! pool, the schema, the repositories, and the transactional services that
//! combine `pharma-core` rules with storage.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Pharmacy Order Engine                               │
//! │                                                                         │
//! │  Presentation layer (add_line)      Notifier (restock_plan)            │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    pharma-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐   ┌───────────────┐   ┌──────────────┐      │   │
//! │  │   │   service    │   │  repository   │   │   Database   │      │   │
//! │  │   │              │   │               │   │   (pool.rs)  │      │   │
//! │  │   │ OrderService │──►│ catalog       │──►│ SqlitePool   │      │   │
//! │  │   │ Replenishment│   │ order, stock  │   │ migrations   │      │   │
//! │  │   └──────────────┘   └───────────────┘   └──────────────┘      │   │
//! │  │          │                                                      │   │
//! │  │          ▼  rules                                               │   │
//! │  │     pharma-core (StockLevels, Order, DiscountPolicy)            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Storage and service error types
//! - [`repository`] - Catalog, order and stock ledger persistence
//! - [`service`] - Order service and replenishment queries
//!
//! ## Concurrency
//!
//! Every service mutation is one transaction that takes SQLite's write lock
//! with its first statement. SQLite has a single write lock per database, so
//! writers on unrelated orders and medications still run one at a time,
//! queuing for up to `busy_timeout`. Reads never wait on writers in WAL mode.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pharma_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("pharma.db")).await?;
//!
//! let orders = db.order_service();
//! let order = orders.create_order("ALFKI").await?;
//! orders.add_line(order.number(), 7, 10).await?;
//! orders.ship_order(order.number()).await?;
//!
//! let low = db.replenishment().low_stock_medications().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, PharmaConfig};
pub use error::{DbError, DbResult, ServiceError, ServiceResult};
pub use pool::{Database, DbConfig};

pub use repository::catalog::CatalogRepository;
pub use repository::order::OrderRepository;
pub use repository::stock::StockLedger;
pub use service::order::OrderService;
pub use service::replenishment::ReplenishmentQuery;
