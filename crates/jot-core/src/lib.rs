//! # jot-core
//!
//! Core types, traits, and abstractions for the jot offline-first sync core.
//!
//! This crate provides the shared domain: local and remote entity records
//! with explicit mapping functions, the error taxonomy, and the adapter
//! traits the sync engine is written against.

pub mod defaults;
pub mod error;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
