// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for a strategy pair.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tandem_store::PairConfig;
//!
//! // Minimal config (uses defaults)
//! let config = PairConfig::default();
//! assert_eq!(config.sync_timeout(), Duration::from_secs(1));
//! assert_eq!(config.cache_expiration(), None); // cached entries never expire
//!
//! // Cache pair with a 30s TTL
//! let config = PairConfig {
//!     sync_timeout_ms: 50,
//!     cache_expiration_ms: Some(30_000),
//!     ..Default::default()
//! };
//! assert_eq!(config.cache_expiration(), Some(Duration::from_secs(30)));
//! ```

use std::time::Duration;

use serde::Deserialize;

/// Timeouts and expirations shared by every pair kind.
///
/// All fields have defaults, so an empty JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PairConfig {
    /// Budget for one synchronization session (default: 1s)
    #[serde(default = "default_sync_timeout_ms")]
    pub sync_timeout_ms: u64,

    /// Cache entry TTL. `None` writes entries that never expire.
    #[serde(default)]
    pub cache_expiration_ms: Option<u64>,

    /// Period of the background copy in a replication pair (default: 1s)
    #[serde(default = "default_replication_interval_ms")]
    pub replication_interval_ms: u64,
}

fn default_sync_timeout_ms() -> u64 { 1000 }
fn default_replication_interval_ms() -> u64 { 1000 }

impl Default for PairConfig {
    fn default() -> Self {
        Self {
            sync_timeout_ms: default_sync_timeout_ms(),
            cache_expiration_ms: None,
            replication_interval_ms: default_replication_interval_ms(),
        }
    }
}

impl PairConfig {
    #[must_use]
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }

    #[must_use]
    pub fn cache_expiration(&self) -> Option<Duration> {
        self.cache_expiration_ms.map(Duration::from_millis)
    }

    #[must_use]
    pub fn replication_interval(&self) -> Duration {
        Duration::from_millis(self.replication_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: PairConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PairConfig::default());
    }

    #[test]
    fn test_partial_json() {
        let config: PairConfig =
            serde_json::from_str(r#"{"sync_timeout_ms": 50, "cache_expiration_ms": 2000}"#).unwrap();

        assert_eq!(config.sync_timeout(), Duration::from_millis(50));
        assert_eq!(config.cache_expiration(), Some(Duration::from_secs(2)));
        assert_eq!(config.replication_interval(), Duration::from_secs(1));
    }
}
