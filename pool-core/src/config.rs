//! Ledger configuration
//!
//! Supports loading from environment variables with the POOL_ prefix.

use serde::{Deserialize, Serialize};
use std::env;

use crate::constants::{DEFAULT_EARLY_SUPPORTER_LIMIT, DEFAULT_LOCK_TIMEOUT_MS};

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Acceptance ordinals `1..=limit` earn the EarlySupporter milestone
    #[serde(default = "default_early_supporter_limit")]
    pub early_supporter_limit: u64,

    /// Bounded wait for a per-pool critical section, in milliseconds
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_early_supporter_limit() -> u64 {
    DEFAULT_EARLY_SUPPORTER_LIMIT
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            early_supporter_limit: DEFAULT_EARLY_SUPPORTER_LIMIT,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }
}

impl LedgerConfig {
    /// Development preset: short lock waits so misbehavior surfaces fast.
    pub fn development() -> Self {
        Self {
            lock_timeout_ms: 1_000,
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - POOL_EARLY_SUPPORTER_LIMIT: EarlySupporter ordinal limit
    /// - POOL_LOCK_TIMEOUT_MS: per-pool lock wait bound in milliseconds
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let early_supporter_limit = env::var("POOL_EARLY_SUPPORTER_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.early_supporter_limit);

        let lock_timeout_ms = env::var("POOL_LOCK_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.lock_timeout_ms);

        Self {
            early_supporter_limit,
            lock_timeout_ms,
        }
    }

    /// Lock wait bound as a `Duration`.
    pub fn lock_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.lock_timeout_ms)
    }
}
