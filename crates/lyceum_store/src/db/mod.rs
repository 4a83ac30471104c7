//! SQLite-backed document session.
//!
//! # Responsibility
//! - Provide the production `DocumentClient` on top of `rusqlite`.
//! - Open and configure connections, apply catalog migrations, provision.
//!
//! # Invariants
//! - Catalog version is tracked via `PRAGMA user_version`.
//! - Documents are stored as JSON text keyed by their `id` field.
//! - SQLite busy/locked failures surface as `StoreError::Timeout`.

use crate::error::StoreError;
use rusqlite::ErrorCode;

pub mod migrations;
mod open;
mod session;

pub use open::{connect, open_session};
pub use session::SqliteSession;

pub(crate) fn map_sqlite_error(err: rusqlite::Error) -> StoreError {
    let code = match &err {
        rusqlite::Error::SqliteFailure(failure, _) => Some(failure.code),
        _ => None,
    };

    match code {
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
            StoreError::Timeout(err.to_string())
        }
        Some(
            ErrorCode::CannotOpen
            | ErrorCode::NotADatabase
            | ErrorCode::PermissionDenied
            | ErrorCode::SystemIoFailure,
        ) => StoreError::Connection(err.to_string()),
        _ => StoreError::Query(err.to_string()),
    }
}
