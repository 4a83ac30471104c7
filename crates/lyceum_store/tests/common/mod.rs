#![allow(dead_code)]

use log::{Level, Log, Metadata, Record};
use lyceum_store::{
    CatalogKind, Cursor, Diagnostics, DocumentClient, StoreError, StoreResult, TableRef,
    WriteSummary,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};

/// Knobs that make the fake misbehave the way a driver or server might.
#[derive(Default)]
pub struct Script {
    pub inserted_override: Option<u64>,
    pub replaced_override: Option<u64>,
    /// Catalog kind whose creation yields an empty confirmation cursor.
    pub empty_confirmation: Option<CatalogKind>,
    pub fail_list_tables: Option<String>,
    pub fail_create_table: Option<String>,
}

#[derive(Default)]
struct State {
    databases: BTreeMap<String, BTreeMap<String, Vec<(String, Value)>>>,
    created: Vec<String>,
    next_key: u64,
}

/// In-memory `DocumentClient` that records every call it receives.
#[derive(Default)]
pub struct RecordingClient {
    state: Mutex<State>,
    calls: Mutex<Vec<String>>,
    pub script: Mutex<Script>,
    issued: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
    list_barrier: Option<Arc<Barrier>>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `list_databases` call wait on `barrier` after listing,
    /// forcing racing initializers to observe the same catalog.
    pub fn with_list_barrier(barrier: Arc<Barrier>) -> Self {
        Self {
            list_barrier: Some(barrier),
            ..Self::default()
        }
    }

    pub fn seed_table(&self, database: &str, table: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .databases
            .entry(database.to_string())
            .or_default()
            .entry(table.to_string())
            .or_default();
    }

    pub fn seed_document(&self, table: &TableRef, key: &str, document: Value) {
        self.seed_table(table.database(), table.table());
        let mut state = self.state.lock().unwrap();
        state
            .databases
            .get_mut(table.database())
            .and_then(|tables| tables.get_mut(table.table()))
            .unwrap()
            .push((key.to_string(), document));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.as_str() == method)
            .count()
    }

    pub fn creation_calls(&self) -> usize {
        self.count("create_database") + self.count("create_table")
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Catalog entries this fake actually created, e.g. `table:lyceum.user`.
    pub fn created(&self) -> Vec<String> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn databases(&self) -> Vec<String> {
        self.state.lock().unwrap().databases.keys().cloned().collect()
    }

    pub fn tables(&self, database: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .databases
            .get(database)
            .map(|tables| tables.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn issued_cursors(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }

    pub fn released_cursors(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn record(&self, method: &str) {
        self.calls.lock().unwrap().push(method.to_string());
    }

    fn cursor(&self, rows: Vec<Value>) -> Cursor {
        self.issued.fetch_add(1, Ordering::SeqCst);
        let released = Arc::clone(&self.released);
        Cursor::new(rows).on_release(move || {
            released.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn confirmation(&self, kind: CatalogKind, row: Value) -> Cursor {
        if self.script.lock().unwrap().empty_confirmation == Some(kind) {
            self.cursor(Vec::new())
        } else {
            self.cursor(vec![row])
        }
    }

    fn with_rows<T>(
        &self,
        table: &TableRef,
        f: impl FnOnce(&mut Vec<(String, Value)>) -> T,
    ) -> StoreResult<T> {
        let mut state = self.state.lock().unwrap();
        state
            .databases
            .get_mut(table.database())
            .and_then(|tables| tables.get_mut(table.table()))
            .map(f)
            .ok_or_else(|| StoreError::Query(format!("{table} does not exist")))
    }
}

impl DocumentClient for RecordingClient {
    fn list_databases(&self) -> StoreResult<Cursor> {
        self.record("list_databases");
        let names: Vec<Value> = self
            .state
            .lock()
            .unwrap()
            .databases
            .keys()
            .map(|name| Value::String(name.clone()))
            .collect();
        if let Some(barrier) = &self.list_barrier {
            barrier.wait();
        }
        Ok(self.cursor(names))
    }

    fn create_database(&self, name: &str) -> StoreResult<Cursor> {
        self.record("create_database");
        {
            let mut state = self.state.lock().unwrap();
            if state.databases.contains_key(name) {
                return Err(StoreError::AlreadyExists {
                    kind: CatalogKind::Database,
                    name: name.to_string(),
                });
            }
            state.databases.insert(name.to_string(), BTreeMap::new());
            state.created.push(format!("database:{name}"));
        }
        Ok(self.confirmation(CatalogKind::Database, json!({ "dbs_created": 1 })))
    }

    fn list_tables(&self, database: &str) -> StoreResult<Cursor> {
        self.record("list_tables");
        if let Some(message) = self.script.lock().unwrap().fail_list_tables.clone() {
            return Err(StoreError::Connection(message));
        }
        let names: Vec<Value> = {
            let state = self.state.lock().unwrap();
            let tables = state
                .databases
                .get(database)
                .ok_or_else(|| StoreError::Query(format!("database `{database}` does not exist")))?;
            tables.keys().map(|name| Value::String(name.clone())).collect()
        };
        Ok(self.cursor(names))
    }

    fn create_table(&self, database: &str, table: &str) -> StoreResult<Cursor> {
        self.record("create_table");
        if self.script.lock().unwrap().fail_create_table.as_deref() == Some(table) {
            return Err(StoreError::Query(format!("cannot create `{table}`")));
        }
        {
            let mut state = self.state.lock().unwrap();
            let tables = state
                .databases
                .get_mut(database)
                .ok_or_else(|| StoreError::Query(format!("database `{database}` does not exist")))?;
            if tables.contains_key(table) {
                return Err(StoreError::AlreadyExists {
                    kind: CatalogKind::Table,
                    name: table.to_string(),
                });
            }
            tables.insert(table.to_string(), Vec::new());
            state.created.push(format!("table:{database}.{table}"));
        }
        Ok(self.confirmation(CatalogKind::Table, json!({ "tables_created": 1 })))
    }

    fn insert(&self, table: &TableRef, document: Value) -> StoreResult<WriteSummary> {
        self.record("insert");
        if let Some(inserted) = self.script.lock().unwrap().inserted_override {
            return Ok(WriteSummary {
                inserted,
                generated_keys: (0..inserted).map(|n| format!("batch-{n}")).collect(),
                ..WriteSummary::default()
            });
        }

        let Value::Object(mut fields) = document else {
            return Ok(WriteSummary::failed("expected an object"));
        };
        let (key, generated) = match fields.get("id").and_then(Value::as_str) {
            Some(key) => (key.to_string(), false),
            None => {
                let mut state = self.state.lock().unwrap();
                state.next_key += 1;
                let key = format!("key-{}", state.next_key);
                fields.insert("id".to_string(), Value::String(key.clone()));
                (key, true)
            }
        };

        self.with_rows(table, |rows| {
            rows.push((key.clone(), Value::Object(fields)));
        })?;
        Ok(WriteSummary::inserted(generated.then_some(key)))
    }

    fn get(&self, table: &TableRef, key: &str) -> StoreResult<Cursor> {
        self.record("get");
        let row = self.with_rows(table, |rows| {
            rows.iter()
                .find(|(candidate, _)| candidate == key)
                .map(|(_, document)| document.clone())
        })?;
        Ok(self.cursor(row.into_iter().collect()))
    }

    fn update(&self, table: &TableRef, key: &str, patch: Value) -> StoreResult<WriteSummary> {
        self.record("update");
        if let Some(replaced) = self.script.lock().unwrap().replaced_override {
            return Ok(WriteSummary {
                replaced,
                ..WriteSummary::default()
            });
        }

        self.with_rows(table, |rows| {
            let Some((_, document)) = rows.iter_mut().find(|(candidate, _)| candidate == key)
            else {
                return WriteSummary {
                    skipped: 1,
                    ..WriteSummary::default()
                };
            };
            if let (Value::Object(fields), Value::Object(patch)) = (document, patch) {
                fields.extend(patch);
            }
            WriteSummary {
                replaced: 1,
                ..WriteSummary::default()
            }
        })
    }

    fn delete(&self, table: &TableRef, key: &str) -> StoreResult<Cursor> {
        self.record("delete");
        let deleted = self.with_rows(table, |rows| {
            let before = rows.len();
            rows.retain(|(candidate, _)| candidate != key);
            (before - rows.len()) as u64
        })?;
        Ok(self.cursor(vec![json!({ "deleted": deleted, "skipped": 1 - deleted.min(1) })]))
    }

    fn scan(&self, table: &TableRef) -> StoreResult<Cursor> {
        self.record("scan");
        let rows = self.with_rows(table, |rows| {
            rows.iter().map(|(_, document)| document.clone()).collect()
        })?;
        Ok(self.cursor(rows))
    }
}

/// `log::Log` sink that keeps every record for assertions.
#[derive(Default)]
pub struct CapturingLogger {
    lines: Mutex<Vec<(Level, String)>>,
}

impl CapturingLogger {
    pub fn lines_at(&self, level: Level) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(line_level, _)| *line_level == level)
            .map(|(_, line)| line.clone())
            .collect()
    }
}

impl Log for CapturingLogger {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        self.lines
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

pub fn capturing_diagnostics() -> (Diagnostics, Arc<CapturingLogger>) {
    let logger = Arc::new(CapturingLogger::default());
    (Diagnostics::new(logger.clone()), logger)
}
