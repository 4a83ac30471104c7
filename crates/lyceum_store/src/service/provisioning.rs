//! Idempotent database/table provisioning.
//!
//! # Responsibility
//! - Ensure a named database and a fixed list of tables exist before use.
//! - Skip every catalog entry that already exists.
//!
//! # Invariants
//! - Existence is decided by exact name match against a fresh listing.
//! - Every creation must be confirmed by exactly one result row.
//! - Failures are never swallowed; tables created before a failure remain.
//!
//! # Concurrency
//! Check-then-create is not atomic. Call `initialize` once at startup, before
//! concurrent CRUD traffic begins; two racing initializers may see one of
//! them fail with `AlreadyExists`.

use crate::client::{Cursor, DocumentClient};
use crate::error::{CatalogKind, ProvisionTarget, StoreError, StoreResult};
use crate::logging::Diagnostics;
use serde_json::Value;

/// Tables required by the Lyceum application, in creation order.
pub const LYCEUM_TABLES: &[&str] = &[
    "artifact",
    "item",
    "library",
    "organization",
    "role",
    "user",
];

/// Creates missing catalog entries through a `DocumentClient`.
#[derive(Debug, Clone, Default)]
pub struct ProvisioningService {
    diagnostics: Diagnostics,
}

impl ProvisioningService {
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self { diagnostics }
    }

    /// Ensures `database` and each of `tables` exist, in caller order.
    ///
    /// # Errors
    /// - Listing or creation failures, wrapped in `StoreError::Provision`
    ///   naming the database or table; `StoreError::root()` yields the kind.
    /// - `EmptyConfirmation` when a creation returned no result row.
    pub fn initialize(
        &self,
        session: &dyn DocumentClient,
        database: &str,
        tables: &[&str],
    ) -> StoreResult<()> {
        self.diagnostics.debug(format_args!(
            "event=provision module=service status=start database={database} tables={}",
            tables.len()
        ));

        let database_target = ProvisionTarget::Database(database.to_string());
        self.ensure_database(session, database)
            .map_err(|err| StoreError::provisioning(database_target, err))?;

        for table in tables {
            let table_target = ProvisionTarget::Table {
                database: database.to_string(),
                table: (*table).to_string(),
            };
            self.ensure_table(session, database, table)
                .map_err(|err| StoreError::provisioning(table_target, err))?;
        }

        self.diagnostics.debug(format_args!(
            "event=provision module=service status=ok database={database}"
        ));
        Ok(())
    }

    fn ensure_database(&self, session: &dyn DocumentClient, name: &str) -> StoreResult<()> {
        if contains_name(session.list_databases()?, name)? {
            return Ok(());
        }

        self.diagnostics.debug(format_args!(
            "event=create_database module=service status=start database={name}"
        ));
        let confirmation = session.create_database(name);
        self.confirm(confirmation, CatalogKind::Database, name)
    }

    fn ensure_table(
        &self,
        session: &dyn DocumentClient,
        database: &str,
        name: &str,
    ) -> StoreResult<()> {
        if contains_name(session.list_tables(database)?, name)? {
            return Ok(());
        }

        self.diagnostics.debug(format_args!(
            "event=create_table module=service status=start database={database} table={name}"
        ));
        let confirmation = session.create_table(database, name);
        self.confirm(confirmation, CatalogKind::Table, name)
    }

    fn confirm(
        &self,
        confirmation: StoreResult<Cursor>,
        kind: CatalogKind,
        name: &str,
    ) -> StoreResult<()> {
        let mut cursor = confirmation?;
        let row = cursor.one::<Value>();
        cursor.close();

        match row? {
            Some(_) => Ok(()),
            None => {
                self.diagnostics.debug(format_args!(
                    "event=create_{kind} module=service status=empty_result name={name}"
                ));
                Err(StoreError::EmptyConfirmation {
                    kind,
                    name: name.to_string(),
                })
            }
        }
    }
}

fn contains_name(mut listing: Cursor, name: &str) -> StoreResult<bool> {
    let names = listing.all::<String>();
    listing.close();
    Ok(names?.iter().any(|candidate| candidate == name))
}
