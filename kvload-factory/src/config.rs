//! # Factory Configuration
//!
//! Tunables shared by every backend (`BackendSettings`) and the loadable
//! configuration document a harness hands to `ClientFactory::from_config`.
//!
//! ```json
//! {
//!   "strategy": "shared-one-redis",
//!   "servers": ["cache1:6379", "cache2:6379"],
//!   "settings": { "op_timeout_ms": 2000, "pool_size": 2 }
//! }
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use kvload_common::{
    BackendKind, CacheError, CacheResult, Endpoint, DEFAULT_OP_TIMEOUT, DEFAULT_POOL_SIZE,
};

use crate::strategy::StrategySelector;

/// Largest accepted `op_timeout_ms` (one day); larger values overflow
/// deadline arithmetic in the drivers.
pub const MAX_OP_TIMEOUT_MS: u64 = 24 * 60 * 60 * 1000;

/// Per-factory backend tunables. Fixed for the factory's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendSettings {
    /// Timeout for connects, reads, writes and pool checkouts.
    pub op_timeout_ms: u64,
    /// Connections per endpoint for the redis backend.
    pub pool_size: u32,
    /// Cluster bootstrap URI, e.g. `redis://10.0.0.5:7000`. Required by
    /// `redis-cluster`, ignored by every other backend.
    pub discovery_uri: Option<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        BackendSettings {
            op_timeout_ms: millis(DEFAULT_OP_TIMEOUT),
            pool_size: DEFAULT_POOL_SIZE,
            discovery_uri: None,
        }
    }
}

impl BackendSettings {
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout_ms = millis(timeout);
        self
    }

    pub fn with_discovery_uri(mut self, uri: impl Into<String>) -> Self {
        self.discovery_uri = Some(uri.into());
        self
    }

    /// Checks the settings against the backend that will consume them.
    pub fn validate(&self, kind: BackendKind) -> CacheResult<()> {
        if self.op_timeout_ms == 0 {
            return Err(CacheError::config("op_timeout_ms must be positive"));
        }
        if self.op_timeout_ms > MAX_OP_TIMEOUT_MS {
            return Err(CacheError::config(format!(
                "op_timeout_ms must not exceed {MAX_OP_TIMEOUT_MS}"
            )));
        }
        if self.pool_size == 0 {
            return Err(CacheError::config("pool_size must be positive"));
        }
        if kind.requires_discovery() {
            match self.discovery_uri.as_deref().map(str::trim) {
                Some(uri) if !uri.is_empty() => {}
                _ => {
                    return Err(CacheError::config(format!(
                        "backend {kind} requires settings.discovery_uri"
                    )))
                }
            }
        }
        Ok(())
    }
}

/// Whole milliseconds in `duration`, saturating instead of wrapping.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Everything needed to build a `ClientFactory`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FactoryConfig {
    pub strategy: StrategySelector,
    pub servers: Vec<Endpoint>,
    #[serde(default)]
    pub settings: BackendSettings,
}

impl FactoryConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(raw: &str) -> CacheResult<Self> {
        let config: FactoryConfig = serde_json::from_str(raw)
            .map_err(|err| CacheError::config(format!("invalid factory config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> CacheResult<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| {
            CacheError::config(format!("cannot read factory config {}: {err}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> CacheResult<()> {
        if self.servers.is_empty() {
            return Err(CacheError::config("server list must not be empty"));
        }
        self.settings.validate(self.strategy.kind())
    }
}
