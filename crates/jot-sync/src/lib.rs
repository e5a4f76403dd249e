//! # jot-sync
//!
//! Background sync engine for the jot notes core.
//!
//! This crate provides:
//! - `SyncEngine`, the bidirectional reconciliation driver (`sync_out`,
//!   `sync_in`, `full_sync`) with last-write-wins conflict resolution
//! - `StatusBus`, the shared sync status with subscriber fan-out
//! - `SyncScheduler`, the periodic trigger with offline handling
//!
//! Payloads are already ciphertext by the time they reach the engine; it
//! moves rows and timestamps, never plaintext.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use jot_core::StaticConnectivity;
//! use jot_remote::MemoryRemote;
//! use jot_store::LocalStore;
//! use jot_sync::SyncEngine;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> jot_core::Result<()> {
//! let store = LocalStore::connect_memory().await?;
//! let engine = SyncEngine::new(
//!     store,
//!     Arc::new(MemoryRemote::new()),
//!     Arc::new(StaticConnectivity::new(true)),
//! );
//!
//! let report = engine.full_sync().await;
//! assert!(report.error.is_none());
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod scheduler;
pub mod status;

pub use engine::{SyncCounts, SyncEngine, SyncReport};
pub use scheduler::{SchedulerConfig, SchedulerHandle, SyncScheduler};
pub use status::{StatusBus, Subscription};
