//! `DocumentClient` implementation over one SQLite connection.
//!
//! # Responsibility
//! - Emulate a document database catalog (databases, tables) in SQLite.
//! - Store documents as JSON text and report document-database style
//!   write summaries.
//!
//! # Invariants
//! - Each logical table maps to one physical `doc_<uuid>` table recorded in
//!   `_lyceum_tables`; logical names never reach SQL text.
//! - Creating an existing database/table fails with `AlreadyExists`.
//! - Updates deep-merge objects and never change a document's `id`.
//! - Scans yield documents in insertion order.

use super::map_sqlite_error;
use crate::client::{Cursor, DocumentClient};
use crate::error::{CatalogKind, StoreError, StoreResult};
use crate::model::table::{validate_name, TableRef};
use crate::model::write::WriteSummary;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use serde_json::{json, Value};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const PRIMARY_KEY: &str = "id";

/// Production session backed by SQLite.
///
/// The connection sits behind a mutex, so a session can be shared across
/// threads (`Arc<SqliteSession>`); calls are serialized per session.
#[derive(Debug)]
pub struct SqliteSession {
    conn: Mutex<Connection>,
}

impl SqliteSession {
    pub(crate) fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Connection("session lock poisoned".to_string()))
    }
}

impl DocumentClient for SqliteSession {
    fn list_databases(&self) -> StoreResult<Cursor> {
        let conn = self.lock()?;
        let names = query_names(&conn, "SELECT name FROM _lyceum_databases ORDER BY name;", [])?;
        Ok(Cursor::new(names.into_iter().map(Value::String)))
    }

    fn create_database(&self, name: &str) -> StoreResult<Cursor> {
        validate_name(name)?;
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(map_sqlite_error)?;

        if database_exists(&tx, name)? {
            return Err(already_exists(CatalogKind::Database, name));
        }

        let id = Uuid::new_v4().to_string();
        tx.execute(
            "INSERT INTO _lyceum_databases (name, id) VALUES (?1, ?2);",
            params![name, id],
        )
        .map_err(|err| catalog_write_error(err, CatalogKind::Database, name))?;
        tx.commit().map_err(map_sqlite_error)?;

        Ok(Cursor::new([json!({
            "dbs_created": 1,
            "config_changes": [{
                "old_val": null,
                "new_val": { "id": id, "name": name },
            }],
        })]))
    }

    fn list_tables(&self, database: &str) -> StoreResult<Cursor> {
        let conn = self.lock()?;
        require_database(&conn, database)?;
        let names = query_names(
            &conn,
            "SELECT name FROM _lyceum_tables WHERE database_name = ?1 ORDER BY name;",
            [database],
        )?;
        Ok(Cursor::new(names.into_iter().map(Value::String)))
    }

    fn create_table(&self, database: &str, table: &str) -> StoreResult<Cursor> {
        validate_name(table)?;
        let mut conn = self.lock()?;
        // Check and catalog insert run under one write lock across sessions.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(map_sqlite_error)?;
        require_database(&tx, database)?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM _lyceum_tables WHERE database_name = ?1 AND name = ?2;",
                [database, table],
                |_| Ok(()),
            )
            .optional()
            .map_err(map_sqlite_error)?
            .is_some();
        if exists {
            return Err(already_exists(CatalogKind::Table, table));
        }

        let id = Uuid::new_v4();
        let physical_name = format!("doc_{}", id.simple());
        tx.execute_batch(&format!(
            "CREATE TABLE \"{physical_name}\" (
                id TEXT PRIMARY KEY NOT NULL,
                body TEXT NOT NULL
            );"
        ))
        .map_err(map_sqlite_error)?;
        tx.execute(
            "INSERT INTO _lyceum_tables (database_name, name, id, physical_name)
             VALUES (?1, ?2, ?3, ?4);",
            params![database, table, id.to_string(), physical_name],
        )
        .map_err(|err| catalog_write_error(err, CatalogKind::Table, table))?;
        tx.commit().map_err(map_sqlite_error)?;

        Ok(Cursor::new([json!({
            "tables_created": 1,
            "config_changes": [{
                "old_val": null,
                "new_val": {
                    "id": id.to_string(),
                    "db": database,
                    "name": table,
                    "primary_key": PRIMARY_KEY,
                },
            }],
        })]))
    }

    fn insert(&self, table: &TableRef, document: Value) -> StoreResult<WriteSummary> {
        let mut fields = match document {
            Value::Object(fields) => fields,
            other => {
                return Ok(WriteSummary::failed(format!(
                    "expected a JSON object, found `{other}`"
                )));
            }
        };

        let (key, generated) = match fields.get(PRIMARY_KEY) {
            None => {
                let key = Uuid::new_v4().to_string();
                fields.insert(PRIMARY_KEY.to_string(), Value::String(key.clone()));
                (key, true)
            }
            Some(Value::String(key)) => (key.clone(), false),
            Some(other) => {
                return Ok(WriteSummary::failed(format!(
                    "primary key `{PRIMARY_KEY}` must be a string, found `{other}`"
                )));
            }
        };
        let body = serde_json::to_string(&Value::Object(fields)).map_err(StoreError::Encode)?;

        let conn = self.lock()?;
        let physical_name = physical_table(&conn, table)?;
        let inserted = conn.execute(
            &format!("INSERT INTO \"{physical_name}\" (id, body) VALUES (?1, ?2);"),
            params![key, body],
        );

        match inserted {
            Ok(_) => Ok(WriteSummary::inserted(generated.then_some(key))),
            Err(rusqlite::Error::SqliteFailure(failure, _))
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Ok(WriteSummary::failed(format!(
                    "duplicate primary key `{PRIMARY_KEY}`: {key}"
                )))
            }
            Err(err) => Err(map_sqlite_error(err)),
        }
    }

    fn get(&self, table: &TableRef, key: &str) -> StoreResult<Cursor> {
        let conn = self.lock()?;
        let physical_name = physical_table(&conn, table)?;
        let document = load_document(&conn, &physical_name, key)?;
        Ok(Cursor::new(document))
    }

    fn update(&self, table: &TableRef, key: &str, patch: Value) -> StoreResult<WriteSummary> {
        if !patch.is_object() {
            return Ok(WriteSummary::failed(format!(
                "expected a JSON object, found `{patch}`"
            )));
        }

        let mut conn = self.lock()?;
        let physical_name = physical_table(&conn, table)?;
        let tx = conn.transaction().map_err(map_sqlite_error)?;

        let Some(original) = load_document(&tx, &physical_name, key)? else {
            return Ok(WriteSummary {
                skipped: 1,
                ..WriteSummary::default()
            });
        };

        let mut merged = original.clone();
        merge_json(&mut merged, patch);

        if merged.get(PRIMARY_KEY) != original.get(PRIMARY_KEY) {
            return Ok(WriteSummary::failed(format!(
                "primary key `{PRIMARY_KEY}` cannot be changed"
            )));
        }
        if merged == original {
            return Ok(WriteSummary {
                unchanged: 1,
                ..WriteSummary::default()
            });
        }

        let body = serde_json::to_string(&merged).map_err(StoreError::Encode)?;
        tx.execute(
            &format!("UPDATE \"{physical_name}\" SET body = ?1 WHERE id = ?2;"),
            params![body, key],
        )
        .map_err(map_sqlite_error)?;
        tx.commit().map_err(map_sqlite_error)?;

        Ok(WriteSummary {
            replaced: 1,
            ..WriteSummary::default()
        })
    }

    fn delete(&self, table: &TableRef, key: &str) -> StoreResult<Cursor> {
        let conn = self.lock()?;
        let physical_name = physical_table(&conn, table)?;
        let changed = conn
            .execute(
                &format!("DELETE FROM \"{physical_name}\" WHERE id = ?1;"),
                [key],
            )
            .map_err(map_sqlite_error)?;

        let summary = if changed == 0 {
            WriteSummary {
                skipped: 1,
                ..WriteSummary::default()
            }
        } else {
            WriteSummary {
                deleted: changed as u64,
                ..WriteSummary::default()
            }
        };
        let row = serde_json::to_value(summary).map_err(StoreError::Encode)?;
        Ok(Cursor::new([row]))
    }

    fn scan(&self, table: &TableRef) -> StoreResult<Cursor> {
        let conn = self.lock()?;
        let physical_name = physical_table(&conn, table)?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT body FROM \"{physical_name}\" ORDER BY rowid ASC;"
            ))
            .map_err(map_sqlite_error)?;
        let mut rows = stmt.query([]).map_err(map_sqlite_error)?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next().map_err(map_sqlite_error)? {
            let body: String = row.get(0).map_err(map_sqlite_error)?;
            documents.push(serde_json::from_str(&body).map_err(StoreError::Decode)?);
        }

        Ok(Cursor::new(documents))
    }
}

/// Deep-merges `patch` into `target`: nested objects merge field by field,
/// every other value replaces what was there.
fn merge_json(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(fields), Value::Object(patch_fields)) => {
            for (name, value) in patch_fields {
                match fields.get_mut(&name) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge_json(existing, value);
                    }
                    _ => {
                        fields.insert(name, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

fn already_exists(kind: CatalogKind, name: &str) -> StoreError {
    StoreError::AlreadyExists {
        kind,
        name: name.to_string(),
    }
}

/// Maps a unique-key violation on a catalog insert to `AlreadyExists`.
fn catalog_write_error(err: rusqlite::Error, kind: CatalogKind, name: &str) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            already_exists(kind, name)
        }
        _ => map_sqlite_error(err),
    }
}

fn query_names<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(sql).map_err(map_sqlite_error)?;
    let names = stmt
        .query_map(params, |row| row.get::<_, String>(0))
        .map_err(map_sqlite_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(map_sqlite_error)?;
    Ok(names)
}

fn database_exists(conn: &Connection, name: &str) -> StoreResult<bool> {
    conn.query_row(
        "SELECT 1 FROM _lyceum_databases WHERE name = ?1;",
        [name],
        |_| Ok(()),
    )
    .optional()
    .map(|row| row.is_some())
    .map_err(map_sqlite_error)
}

fn require_database(conn: &Connection, name: &str) -> StoreResult<()> {
    if database_exists(conn, name)? {
        Ok(())
    } else {
        Err(StoreError::Query(format!("database `{name}` does not exist")))
    }
}

fn physical_table(conn: &Connection, table: &TableRef) -> StoreResult<String> {
    conn.query_row(
        "SELECT physical_name FROM _lyceum_tables WHERE database_name = ?1 AND name = ?2;",
        [table.database(), table.table()],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .map_err(map_sqlite_error)?
    .ok_or_else(|| StoreError::Query(format!("{table} does not exist")))
}

fn load_document(conn: &Connection, physical_name: &str, key: &str) -> StoreResult<Option<Value>> {
    let body = conn
        .query_row(
            &format!("SELECT body FROM \"{physical_name}\" WHERE id = ?1;"),
            [key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(map_sqlite_error)?;

    body.map(|body| serde_json::from_str(&body).map_err(StoreError::Decode))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::merge_json;
    use serde_json::json;

    #[test]
    fn merge_replaces_scalars_and_merges_nested_objects() {
        let mut target = json!({
            "id": "a",
            "name": "old",
            "meta": { "tags": ["x"], "owner": "ada" },
        });
        merge_json(
            &mut target,
            json!({ "name": "new", "meta": { "owner": "grace" }, "extra": null }),
        );

        assert_eq!(
            target,
            json!({
                "id": "a",
                "name": "new",
                "meta": { "tags": ["x"], "owner": "grace" },
                "extra": null,
            })
        );
    }

    #[test]
    fn merge_replaces_object_with_scalar() {
        let mut target = json!({ "meta": { "a": 1 } });
        merge_json(&mut target, json!({ "meta": 7 }));
        assert_eq!(target, json!({ "meta": 7 }));
    }
}
