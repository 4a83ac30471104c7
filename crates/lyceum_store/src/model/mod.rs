//! Identifiers and write results exchanged with document sessions.
//!
//! # Responsibility
//! - Define the immutable table identity used by every CRUD call.
//! - Define the counters a write reports back to the adapter.
//!
//! # Invariants
//! - A `TableRef` only ever holds validated names.

pub mod table;
pub mod write;
