//! Data access layer over document sessions.
//!
//! # Responsibility
//! - Expose typed CRUD contracts independent of the query language.
//! - Keep session/cursor handling out of application code.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `CountMismatch`) in
//!   addition to transport errors, unchanged in kind.

pub mod document_store;
