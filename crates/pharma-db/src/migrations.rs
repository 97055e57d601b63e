//! # Database Migrations
//!
//! The schema ships inside the binary via `sqlx::migrate!`.
//!
//! ```text
//!   migrations/sqlite/
//!   └── 001_initial_schema.sql   dispensaries, categories, suppliers,
//!                                medications (+ stock CHECKs), orders, lines
//! ```
//!
//! New schema changes go in a new `NNN_description.sql` file. Applied files
//! are checksummed in `_sqlx_migrations` and must never be edited.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every migration not yet recorded. A no-op on an up-to-date schema.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let pending = pending_migrations(pool).await?;
    if pending.is_empty() {
        debug!("Schema is up to date");
        return Ok(());
    }

    for (version, description) in &pending {
        info!(version, description = %description, "Applying migration");
    }
    MIGRATOR.run(pool).await?;
    info!(applied = pending.len(), "Schema migrated");
    Ok(())
}

/// Embedded migrations missing from `_sqlx_migrations`, as (version, description).
pub async fn pending_migrations(pool: &SqlitePool) -> DbResult<Vec<(i64, String)>> {
    let tracked: Option<String> =
        sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'")
            .fetch_optional(pool)
            .await?;

    let applied: Vec<i64> = if tracked.is_some() {
        sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?
    } else {
        Vec::new()
    };

    Ok(MIGRATOR
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .map(|m| (m.version, m.description.to_string()))
        .collect())
}
