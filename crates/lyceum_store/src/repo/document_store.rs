//! CRUD over the tables of a document session.
//!
//! # Responsibility
//! - Provide Create/Read/ReadAll/Update/Delete with typed `serde` documents.
//! - Enforce exact affected counts on insert and update.
//!
//! # Invariants
//! - Create and Update read the stored document back before returning, so
//!   callers see server-assigned keys and defaults.
//! - No read-back is attempted after a count mismatch.
//! - Every cursor is released on every exit path.
//! - Delete does not check how many documents were removed.

use crate::client::DocumentClient;
use crate::error::{StoreError, StoreResult, WriteOp};
use crate::logging::Diagnostics;
use crate::model::table::TableRef;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Typed CRUD entry points borrowing a shared session.
pub struct DocumentStore<'s> {
    session: &'s dyn DocumentClient,
    diagnostics: Diagnostics,
}

impl<'s> DocumentStore<'s> {
    pub fn new(session: &'s dyn DocumentClient, diagnostics: Diagnostics) -> Self {
        Self {
            session,
            diagnostics,
        }
    }

    /// Inserts `document` and returns it as stored, decoded into `T`.
    ///
    /// The key is the one generated by the store, or the document's own `id`
    /// when it supplied one.
    ///
    /// # Errors
    /// - `CountMismatch` when the insert did not report exactly one row.
    /// - `MissingGeneratedKey` when no key can be determined.
    pub fn create<D, T>(&self, table: &TableRef, document: &D) -> StoreResult<T>
    where
        D: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let document = serde_json::to_value(document).map_err(StoreError::Encode)?;
        let supplied_key = document
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string);

        let summary = self
            .session
            .insert(table, document)
            .map_err(|err| self.failed("insert", table, err))?;
        if summary.inserted != 1 {
            self.diagnostics.error(format_args!(
                "event=insert module=repo status=error table={} inserted={} first_error={}",
                qualified(table),
                summary.inserted,
                summary.first_error.as_deref().unwrap_or("-")
            ));
            return Err(StoreError::CountMismatch {
                operation: WriteOp::Insert,
                count: summary.inserted,
            });
        }

        let key = summary
            .generated_keys
            .into_iter()
            .next()
            .or(supplied_key)
            .ok_or_else(|| StoreError::MissingGeneratedKey {
                table: table.clone(),
            })?;
        self.read(table, &key)
    }

    /// Reads the document stored at `key`.
    ///
    /// # Errors
    /// - `NotFound` when no document has that key.
    /// - `Decode` when the stored document does not fit `T`.
    pub fn read<T: DeserializeOwned>(&self, table: &TableRef, key: &str) -> StoreResult<T> {
        let mut cursor = self
            .session
            .get(table, key)
            .map_err(|err| self.failed("get", table, err))?;
        let document = cursor.one::<T>();
        cursor.close();

        document?.ok_or_else(|| StoreError::NotFound {
            table: table.clone(),
            key: key.to_string(),
        })
    }

    /// Reads every document in `table`, in the order the store yields them.
    pub fn read_all<T: DeserializeOwned>(&self, table: &TableRef) -> StoreResult<Vec<T>> {
        let mut cursor = self
            .session
            .scan(table)
            .map_err(|err| self.failed("scan", table, err))?;
        let documents = cursor.all::<T>();
        cursor.close();

        documents.map_err(|err| {
            self.diagnostics.error(format_args!(
                "event=scan module=repo status=error table={} error_code=decode_failed error={err}",
                qualified(table)
            ));
            err
        })
    }

    /// Merges `patch` into the document at `key` and returns the result.
    ///
    /// # Errors
    /// - `CountMismatch` unless exactly one document reports as replaced;
    ///   a patch that changes nothing counts as zero.
    pub fn update<D, T>(&self, table: &TableRef, key: &str, patch: &D) -> StoreResult<T>
    where
        D: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let patch = serde_json::to_value(patch).map_err(StoreError::Encode)?;
        let summary = self
            .session
            .update(table, key, patch)
            .map_err(|err| self.failed("update", table, err))?;
        if summary.replaced != 1 {
            self.diagnostics.error(format_args!(
                "event=update module=repo status=error table={} replaced={} skipped={} unchanged={}",
                qualified(table),
                summary.replaced,
                summary.skipped,
                summary.unchanged
            ));
            return Err(StoreError::CountMismatch {
                operation: WriteOp::Update,
                count: summary.replaced,
            });
        }

        self.read(table, key)
    }

    /// Deletes the document at `key`; a missing key is not an error.
    pub fn delete(&self, table: &TableRef, key: &str) -> StoreResult<()> {
        let cursor = self
            .session
            .delete(table, key)
            .map_err(|err| self.failed("delete", table, err))?;
        cursor.close();
        Ok(())
    }

    fn failed(&self, event: &str, table: &TableRef, err: StoreError) -> StoreError {
        self.diagnostics.error(format_args!(
            "event={event} module=repo status=error table={} error={err}",
            qualified(table)
        ));
        err
    }
}

fn qualified(table: &TableRef) -> String {
    format!("{}.{}", table.database(), table.table())
}
