//! Buffered result handle.
//!
//! # Responsibility
//! - Decode query rows into caller-supplied `serde` targets.
//! - Release the underlying result exactly once, on `close()` or drop.
//!
//! # Invariants
//! - Zero rows (or a single JSON `null`) decode as `None`, never as an error.
//! - The release hook runs at most once.

use crate::error::{StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};

type ReleaseHook = Box<dyn FnOnce() + Send>;

pub struct Cursor {
    rows: VecDeque<Value>,
    on_release: Option<ReleaseHook>,
}

impl Cursor {
    pub fn new(rows: impl IntoIterator<Item = Value>) -> Self {
        Self {
            rows: rows.into_iter().collect(),
            on_release: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Registers a callback invoked when the cursor is released.
    ///
    /// Clients holding server-side resources free them here.
    pub fn on_release(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_release = Some(Box::new(hook));
        self
    }

    /// Number of rows not yet consumed.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    /// Decodes the next row.
    ///
    /// Returns `Ok(None)` when no row is left, so callers can tell "nothing
    /// there" apart from a payload that does not fit `T`.
    pub fn one<T: DeserializeOwned>(&mut self) -> StoreResult<Option<T>> {
        match self.rows.pop_front() {
            None | Some(Value::Null) => Ok(None),
            Some(row) => serde_json::from_value(row)
                .map(Some)
                .map_err(StoreError::Decode),
        }
    }

    /// Decodes every remaining row, preserving cursor order.
    pub fn all<T: DeserializeOwned>(&mut self) -> StoreResult<Vec<T>> {
        self.rows
            .drain(..)
            .map(|row| serde_json::from_value(row).map_err(StoreError::Decode))
            .collect()
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.rows.clear();
        if let Some(hook) = self.on_release.take() {
            hook();
        }
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        self.release();
    }
}

impl Debug for Cursor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("remaining", &self.rows.len())
            .field("released", &self.on_release.is_none())
            .finish()
    }
}
