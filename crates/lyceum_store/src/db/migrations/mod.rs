//! Catalog migration registry and executor for the SQLite client.
//!
//! # Responsibility
//! - Register catalog schema migrations in strictly increasing order.
//! - Apply pending migrations atomically.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - Only the bookkeeping tables live here; document tables are created by
//!   provisioning, never by migrations.

use crate::error::{StoreError, StoreResult};
use rusqlite::Connection;

use super::map_sqlite_error;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("0001_catalog.sql"),
}];

/// Returns the latest catalog version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Applies all pending catalog migrations on the provided connection.
pub fn apply_migrations(conn: &mut Connection) -> StoreResult<()> {
    let current_version = current_user_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        return Err(StoreError::UnsupportedCatalogVersion {
            found: current_version,
            latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    let tx = conn.transaction().map_err(map_sqlite_error)?;
    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        tx.execute_batch(migration.sql).map_err(map_sqlite_error)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
            .map_err(map_sqlite_error)?;
    }
    tx.commit().map_err(map_sqlite_error)?;

    Ok(())
}

/// Reads the catalog version recorded in `PRAGMA user_version`.
pub fn current_user_version(conn: &Connection) -> StoreResult<u32> {
    conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))
        .map_err(map_sqlite_error)
}
