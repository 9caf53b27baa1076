//! Caching primitives.

use std::time::Duration;

/// Single-flight lazy values.
pub mod load_cell;

pub use load_cell::{LoadCell, LoadState};

/// Timing knobs of the node cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// How long a caller waits for another caller's in-flight fetch.
    pub load_wait_ceiling: Duration,
    /// How long a fetch waits for the remote client to become initialized.
    pub init_timeout: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            load_wait_ceiling: Duration::from_secs(10),
            init_timeout: Duration::from_secs(300),
        }
    }
}
