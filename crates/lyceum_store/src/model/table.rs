//! Database/table identity.
//!
//! # Responsibility
//! - Validate database and table names once, at construction.
//! - Provide a cheap, cloneable handle reused for the life of the process.
//!
//! # Invariants
//! - Names match `^[A-Za-z0-9_-]+$`.
//! - A `TableRef` is never mutated after construction.

use crate::error::{StoreError, StoreResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("name pattern should compile"));

/// Rejects names a document database would refuse for a database or table.
pub fn validate_name(name: &str) -> StoreResult<()> {
    if NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

/// Identifies one table inside one database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    database: String,
    table: String,
}

impl TableRef {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> StoreResult<Self> {
        let database = database.into();
        let table = table.into();
        validate_name(&database)?;
        validate_name(&table)?;
        Ok(Self { database, table })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl Display for TableRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "table `{}.{}`", self.database, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_name, TableRef};
    use crate::error::StoreError;

    #[test]
    fn accepts_document_database_names() {
        let table = TableRef::new("lyceum", "user_roles-v2").expect("name should be valid");
        assert_eq!(table.database(), "lyceum");
        assert_eq!(table.table(), "user_roles-v2");
        assert_eq!(table.to_string(), "table `lyceum.user_roles-v2`");
    }

    #[test]
    fn rejects_empty_and_punctuated_names() {
        for name in ["", "user.table", "drop table", "ta\"ble"] {
            let err = validate_name(name).expect_err("name should be rejected");
            assert!(matches!(err, StoreError::InvalidName(ref value) if value == name));
        }
        assert!(TableRef::new("lyceum", "bad name").is_err());
        assert!(TableRef::new("bad.db", "user").is_err());
    }
}
