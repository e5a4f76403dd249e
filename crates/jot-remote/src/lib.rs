//! # jot-remote
//!
//! Remote store adapters for the jot sync core.
//!
//! This crate provides:
//! - `HttpRemote`, the production adapter speaking a PostgREST-style API
//! - `HttpConnectivity`, a cheap reachability probe for the same service
//! - `MemoryRemote`, an in-memory stand-in with a call log, failure
//!   injection, and simulated latency for tests
//!
//! Every payload column crossing this boundary is ciphertext; the adapters
//! move opaque strings and never see plaintext.
//!
//! ## Example
//!
//! ```
//! use jot_core::RemoteStore;
//! use jot_remote::MemoryRemote;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> jot_core::Result<()> {
//! let remote = MemoryRemote::new();
//! remote.download_folders().await?;
//!
//! assert_eq!(remote.call_count("download_folders"), 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod http;
pub mod memory;

pub use config::{RemoteConfig, ENV_REMOTE_KEY, ENV_REMOTE_TIMEOUT_SECS, ENV_REMOTE_URL};
pub use http::{HttpConnectivity, HttpRemote, DEFAULT_TIMEOUT_SECS, PROBE_TIMEOUT_SECS};
pub use memory::MemoryRemote;
