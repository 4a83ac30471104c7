//! Error types shared by the adapter, the session seam and the SQLite client.
//!
//! # Responsibility
//! - Give every failure a kind the caller can match on.
//! - Keep provisioning context (which database/table) without hiding the kind.
//!
//! # Invariants
//! - A point lookup with zero rows is `NotFound`, never `Decode`.
//! - `Provision` only wraps; `root()` returns the original kind.

use crate::model::table::TableRef;
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Catalog object kinds created by provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Database,
    Table,
}

impl Display for CatalogKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Database => write!(f, "database"),
            Self::Table => write!(f, "table"),
        }
    }
}

/// Write operations that are checked for an exact affected count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Insert,
    Update,
}

impl Display for WriteOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert => write!(f, "inserted"),
            Self::Update => write!(f, "replaced"),
        }
    }
}

/// Catalog entry that provisioning was working on when it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionTarget {
    Database(String),
    Table { database: String, table: String },
}

impl Display for ProvisionTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Database(name) => write!(f, "database `{name}`"),
            Self::Table { database, table } => write!(f, "table `{table}` in database `{database}`"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The session could not be established or used.
    #[error("connection error: {0}")]
    Connection(String),

    /// The call was interrupted by its deadline.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Any other failure while executing a query.
    #[error("query failed: {0}")]
    Query(String),

    #[error("{kind} `{name}` already exists")]
    AlreadyExists { kind: CatalogKind, name: String },

    #[error("document not found: {table} key `{key}`")]
    NotFound { table: TableRef, key: String },

    #[error("{operation} unexpected document count: {count}")]
    CountMismatch { operation: WriteOp, count: u64 },

    /// A creation command returned no confirmation row.
    #[error("empty result while confirming creation of {kind} `{name}`")]
    EmptyConfirmation { kind: CatalogKind, name: String },

    #[error("unable to decode document: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("unable to encode document: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("insert into {table} reported success without a primary key")]
    MissingGeneratedKey { table: TableRef },

    #[error("invalid name `{0}`; expected [A-Za-z0-9_-]+")]
    InvalidName(String),

    #[error("catalog version {found} is newer than supported {latest}")]
    UnsupportedCatalogVersion { found: u32, latest: u32 },

    #[error("provisioning {target} failed: {source}")]
    Provision {
        target: ProvisionTarget,
        #[source]
        source: Box<StoreError>,
    },

    #[error("configuration error: {0}")]
    Config(String),

    /// Caller-supplied input was rejected before reaching the store.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl StoreError {
    /// Returns the underlying error with provisioning context stripped.
    pub fn root(&self) -> &StoreError {
        match self {
            Self::Provision { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self.root(), Self::AlreadyExists { .. })
    }

    pub(crate) fn provisioning(target: ProvisionTarget, source: StoreError) -> Self {
        Self::Provision {
            target,
            source: Box::new(source),
        }
    }
}
