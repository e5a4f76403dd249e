//! Centralized default constants for the jot sync core.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates reference these constants instead of defining their own
//! magic numbers.

// =============================================================================
// SYNC SCHEDULING
// =============================================================================

/// Default periodic sync interval in seconds.
pub const SYNC_INTERVAL_SECS: u64 = 30;

// =============================================================================
// TRANSPORT
// =============================================================================

/// Transport-level timeout for remote HTTP calls, in seconds. The engine
/// itself imposes no timeout; this bounds a single underlying request.
pub const REMOTE_TIMEOUT_SECS: u64 = 30;

/// Timeout for the connectivity reachability probe, in seconds.
pub const PROBE_TIMEOUT_SECS: u64 = 5;
