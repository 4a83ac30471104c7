//! Write response counters.

use serde::{Deserialize, Serialize};

/// Counters reported by a single insert/update/delete.
///
/// Mirrors the write responses of document databases: one field per outcome,
/// plus the keys the store generated for inserted documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteSummary {
    pub inserted: u64,
    pub replaced: u64,
    pub unchanged: u64,
    pub skipped: u64,
    pub deleted: u64,
    pub errors: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generated_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_error: Option<String>,
}

impl WriteSummary {
    pub fn inserted(key: Option<String>) -> Self {
        Self {
            inserted: 1,
            generated_keys: key.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            errors: 1,
            first_error: Some(message.into()),
            ..Self::default()
        }
    }
}
