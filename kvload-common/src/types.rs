//! # Shared Type Definitions
//!
//! Configuration-level data types consumed by the client factory and its
//! backend adapters.
//!
//! ## Design Principles
//!
//! 1. **Closed Sets**: Backend kinds and sharing modes are plain enums so an
//!    unsupported value cannot exist past configuration load.
//! 2. **Validated On Entry**: `Endpoint` parses and validates once; every later
//!    consumer can rely on a non-empty host and a non-zero port.
//! 3. **Text Form**: Endpoints serialize as `host:port` strings to keep config
//!    files readable.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};

/// Fixed per-operation timeout applied to every backend (2 seconds).
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_millis(2000);

/// Fixed connection-pool size for the pooled redis backend.
pub const DEFAULT_POOL_SIZE: u32 = 2;

/// A cache server endpoint.
///
/// Hosts are kept unresolved; resolution happens inside each driver at
/// connect time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Creates an endpoint from its parts.
    ///
    /// # Errors
    /// Returns `CacheError::Configuration` for an empty host or port 0.
    pub fn new(host: impl Into<String>, port: u16) -> CacheResult<Self> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(CacheError::config("endpoint host must not be empty"));
        }
        if port == 0 {
            return Err(CacheError::config(format!("endpoint {host} has port 0")));
        }
        Ok(Endpoint { host, port })
    }

    /// Host name or IP literal.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Renders the endpoint as a `redis://host:port/` connection URL.
    pub fn redis_url(&self) -> String {
        format!("redis://{}/", self)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Bracket IPv6 literals so the output parses back.
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Endpoint {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| CacheError::config(format!("endpoint `{s}` is missing a port")))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let port = port
            .parse::<u16>()
            .map_err(|_| CacheError::config(format!("endpoint `{s}` has an invalid port")))?;
        Endpoint::new(host, port)
    }
}

impl TryFrom<String> for Endpoint {
    type Error = CacheError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        endpoint.to_string()
    }
}

/// The driver family a client is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// `kvload-client` with one privately pooled client per endpoint.
    Hkv,
    /// `kvload-client` through a single factory-owned server pool.
    PooledHkv,
    /// `redis` crate behind bounded r2d2 pools.
    Redis,
    /// `redis` cluster client bootstrapped from a discovery URI.
    RedisCluster,
}

impl BackendKind {
    /// Stable label used in names, logs and error messages.
    pub const fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Hkv => "hkv",
            BackendKind::PooledHkv => "pooled-hkv",
            BackendKind::Redis => "redis",
            BackendKind::RedisCluster => "redis-cluster",
        }
    }

    /// True when construction needs a discovery endpoint from configuration.
    pub const fn requires_discovery(&self) -> bool {
        matches!(self, BackendKind::RedisCluster)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a factory hands out one instance or a fresh one per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SharingMode {
    /// One client serves every caller for the factory's lifetime.
    Shared,
    /// Every `get_or_create` call builds a new client.
    PerCall,
}

impl fmt::Display for SharingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SharingMode::Shared => f.write_str("shared"),
            SharingMode::PerCall => f.write_str("per-call"),
        }
    }
}
