//! Document store adapter for Lyceum.
//!
//! Provides idempotent provisioning of databases/tables and a uniform CRUD
//! contract over any `DocumentClient`, plus a SQLite-backed client.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use client::{Cursor, DocumentClient};
pub use config::ConnectOptions;
pub use db::{connect, open_session, SqliteSession};
pub use error::{CatalogKind, ProvisionTarget, StoreError, StoreResult, WriteOp};
pub use logging::{init_logging, Diagnostics, LogSettings};
pub use model::table::TableRef;
pub use model::write::WriteSummary;
pub use repo::document_store::DocumentStore;
pub use service::provisioning::{ProvisioningService, LYCEUM_TABLES};

/// Returns the store crate version.
pub fn store_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
