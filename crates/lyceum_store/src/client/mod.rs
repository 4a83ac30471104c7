//! Session capability set consumed by the adapter.
//!
//! # Responsibility
//! - Describe the outbound contract to a document database client.
//! - Keep query-language details behind one object-safe trait, so the
//!   production client and recording fakes are interchangeable.
//!
//! # Invariants
//! - Implementations are `Send + Sync`; the adapter adds no locking.
//! - Every returned `Cursor` is released by the caller (explicitly or on drop).

pub mod cursor;

use crate::error::StoreResult;
use crate::model::table::TableRef;
use crate::model::write::WriteSummary;
use serde_json::Value;

pub use cursor::Cursor;

/// Live handle to one document database server.
pub trait DocumentClient: Send + Sync {
    /// Lists database names visible to this session.
    fn list_databases(&self) -> StoreResult<Cursor>;

    /// Creates a database; the cursor yields one confirmation row.
    fn create_database(&self, name: &str) -> StoreResult<Cursor>;

    /// Lists table names inside `database`.
    fn list_tables(&self, database: &str) -> StoreResult<Cursor>;

    /// Creates a table; the cursor yields one confirmation row.
    fn create_table(&self, database: &str, table: &str) -> StoreResult<Cursor>;

    fn insert(&self, table: &TableRef, document: Value) -> StoreResult<WriteSummary>;

    /// Point lookup by primary key.
    fn get(&self, table: &TableRef, key: &str) -> StoreResult<Cursor>;

    /// Merges `patch` into the document stored at `key`.
    fn update(&self, table: &TableRef, key: &str, patch: Value) -> StoreResult<WriteSummary>;

    fn delete(&self, table: &TableRef, key: &str) -> StoreResult<Cursor>;

    /// Unfiltered scan of `table`, in whatever order the store yields.
    fn scan(&self, table: &TableRef) -> StoreResult<Cursor>;
}
