//! # Backend Adapters
//!
//! One standalone adapter per driver family, gathered in the closed
//! `Backend` enum. `BackendBuilder` is the factory's construction step: it
//! validates once up front and then dispatches every `build()` on the
//! backend kind.
//!
//! ```text
//! BackendBuilder
//!   └── plan: Plan
//!         ├── Hkv                    -> Backend::Hkv(HkvClient)              own ServerPool
//!         ├── PooledHkv(Arc<pool>)   -> Backend::PooledHkv(PooledHkvClient)  shared ServerPool
//!         ├── Redis                  -> Backend::Redis(RedisClient)          r2d2 per endpoint
//!         └── RedisCluster { uri }   -> Backend::RedisCluster(RedisClusterClient)
//! ```

mod hkv;
mod redis_cluster;
mod redis_pool;

use std::sync::Arc;

use kvload_client::{ClientConfig, ServerPool};
use kvload_common::{BackendKind, CacheError, CacheResult, Endpoint};
use tracing::debug;

use crate::config::BackendSettings;
use crate::contract::CacheClient;
use crate::factory::ClientBuilder;
use crate::strategy::StrategySelector;

pub use self::hkv::{HkvClient, PooledHkvClient};
pub use self::redis_cluster::RedisClusterClient;
pub use self::redis_pool::RedisClient;

/// A client built by `BackendBuilder`, tagged with its driver family.
pub enum Backend {
    Hkv(HkvClient),
    PooledHkv(PooledHkvClient),
    Redis(RedisClient),
    RedisCluster(RedisClusterClient),
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Hkv(_) => BackendKind::Hkv,
            Backend::PooledHkv(_) => BackendKind::PooledHkv,
            Backend::Redis(_) => BackendKind::Redis,
            Backend::RedisCluster(_) => BackendKind::RedisCluster,
        }
    }
}

impl CacheClient for Backend {
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        match self {
            Backend::Hkv(client) => client.get(key),
            Backend::PooledHkv(client) => client.get(key),
            Backend::Redis(client) => client.get(key),
            Backend::RedisCluster(client) => client.get(key),
        }
    }

    fn set(&self, key: &str, value: Option<&[u8]>) -> CacheResult<()> {
        match self {
            Backend::Hkv(client) => client.set(key, value),
            Backend::PooledHkv(client) => client.set(key, value),
            Backend::Redis(client) => client.set(key, value),
            Backend::RedisCluster(client) => client.set(key, value),
        }
    }
}

// Construction inputs resolved once when the builder is created.
enum Plan {
    Hkv,
    PooledHkv(Arc<ServerPool>),
    Redis,
    RedisCluster { discovery_uri: String },
}

/// Builds `Backend` clients for one selector, address list and settings.
pub struct BackendBuilder {
    selector: StrategySelector,
    addresses: Vec<Endpoint>,
    settings: BackendSettings,
    plan: Plan,
}

impl BackendBuilder {
    /// Validates the inputs and prepares per-kind resources.
    ///
    /// For `PooledHkv` this is where the server pool is created; it is built
    /// exactly once per builder and handed to every client afterwards.
    ///
    /// # Errors
    /// Returns `CacheError::Configuration` for an empty address list, invalid
    /// settings, or a missing/unparseable discovery URI.
    pub fn new(
        selector: StrategySelector,
        addresses: Vec<Endpoint>,
        settings: BackendSettings,
    ) -> CacheResult<Self> {
        if addresses.is_empty() {
            return Err(CacheError::config("address list must not be empty"));
        }
        let kind = selector.kind();
        settings.validate(kind)?;

        let plan = match kind {
            BackendKind::Hkv => Plan::Hkv,
            BackendKind::PooledHkv => {
                let pool = hkv::server_pool(&addresses, &hkv_config(&settings))?;
                Plan::PooledHkv(Arc::new(pool))
            }
            BackendKind::Redis => Plan::Redis,
            BackendKind::RedisCluster => Plan::RedisCluster {
                discovery_uri: redis_cluster::discovery_uri(&settings)?,
            },
        };

        debug!(strategy = %selector, servers = addresses.len(), "prepared backend builder");
        Ok(BackendBuilder {
            selector,
            addresses,
            settings,
            plan,
        })
    }

    pub fn selector(&self) -> StrategySelector {
        self.selector
    }

    pub fn addresses(&self) -> &[Endpoint] {
        &self.addresses
    }

    pub fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    /// The shared server pool, present only for `PooledHkv`.
    pub fn server_pool(&self) -> Option<&Arc<ServerPool>> {
        match &self.plan {
            Plan::PooledHkv(pool) => Some(pool),
            _ => None,
        }
    }
}

impl ClientBuilder for BackendBuilder {
    type Client = Backend;

    fn build(&self) -> CacheResult<Backend> {
        let timeout = self.settings.op_timeout();
        let backend = match &self.plan {
            Plan::Hkv => Backend::Hkv(HkvClient::new(
                &self.addresses,
                &hkv_config(&self.settings),
            )?),
            Plan::PooledHkv(pool) => Backend::PooledHkv(PooledHkvClient::new(Arc::clone(pool))),
            Plan::Redis => Backend::Redis(RedisClient::new(
                &self.addresses,
                self.settings.pool_size,
                timeout,
            )?),
            Plan::RedisCluster { discovery_uri } => Backend::RedisCluster(
                RedisClusterClient::new(discovery_uri, &self.addresses, timeout)?,
            ),
        };
        debug!(strategy = %self.selector, "built cache client");
        Ok(backend)
    }
}

/// Client template for the kvload-client backends.
fn hkv_config(settings: &BackendSettings) -> ClientConfig {
    // Address is filled in per endpoint by ServerPool.
    ClientConfig::with_timeout(String::new(), settings.op_timeout())
}
