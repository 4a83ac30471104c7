//! Session bootstrap for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas and the per-call busy deadline.
//! - Apply catalog migrations, then provision the Lyceum schema on connect.
//!
//! # Invariants
//! - Returned sessions have `foreign_keys=ON` and migrations fully applied.
//! - `connect` returns only after provisioning succeeded.

use super::migrations::apply_migrations;
use super::session::SqliteSession;
use crate::config::ConnectOptions;
use crate::error::{StoreError, StoreResult};
use crate::logging::Diagnostics;
use crate::service::provisioning::{ProvisioningService, LYCEUM_TABLES};
use rusqlite::Connection;
use std::time::{Duration, Instant};

/// Opens the store named by `options.db_url` and applies catalog migrations.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_session(
    options: &ConnectOptions,
    diagnostics: &Diagnostics,
) -> StoreResult<SqliteSession> {
    let started_at = Instant::now();
    let mode = if options.is_memory() { "memory" } else { "file" };
    diagnostics.info(format_args!("event=db_open module=db status=start mode={mode}"));

    let opened = if options.is_memory() {
        Connection::open_in_memory()
    } else {
        Connection::open(&options.db_url)
    };
    let mut conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            diagnostics.error(format_args!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            ));
            return Err(StoreError::Connection(format!(
                "failed to open `{}`: {err}",
                options.db_url
            )));
        }
    };

    match bootstrap_connection(&mut conn, options.busy_timeout()) {
        Ok(()) => {
            diagnostics.info(format_args!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            ));
            Ok(SqliteSession::new(conn))
        }
        Err(err) => {
            diagnostics.error(format_args!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            ));
            Err(err)
        }
    }
}

/// Opens a session and provisions `options.database` with the Lyceum tables.
///
/// # Side effects
/// - May create the database and any missing tables.
/// - Emits `db_connect` logging events with duration and status.
pub fn connect(options: &ConnectOptions, diagnostics: &Diagnostics) -> StoreResult<SqliteSession> {
    let started_at = Instant::now();
    diagnostics.debug(format_args!(
        "event=db_connect module=db status=start database={}",
        options.database
    ));

    let session = open_session(options, diagnostics)?;
    let provisioning = ProvisioningService::new(diagnostics.clone());
    if let Err(err) = provisioning.initialize(&session, &options.database, LYCEUM_TABLES) {
        diagnostics.error(format_args!(
            "event=db_connect module=db status=error duration_ms={} error_code=provision_failed error={}",
            started_at.elapsed().as_millis(),
            err
        ));
        return Err(err);
    }

    diagnostics.debug(format_args!(
        "event=db_connect module=db status=ok database={} duration_ms={}",
        options.database,
        started_at.elapsed().as_millis()
    ));
    Ok(session)
}

fn bootstrap_connection(conn: &mut Connection, busy_timeout: Duration) -> StoreResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(super::map_sqlite_error)?;
    conn.busy_timeout(busy_timeout)
        .map_err(super::map_sqlite_error)?;
    apply_migrations(conn)?;
    Ok(())
}
