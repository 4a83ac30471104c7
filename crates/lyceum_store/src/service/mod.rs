//! Startup services.
//!
//! # Responsibility
//! - Prepare the document store catalog before request handling starts.

pub mod provisioning;
