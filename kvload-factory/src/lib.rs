//! # kvload Client Factory
//!
//! Purpose: Build cache clients for a load-generation harness. A
//! `StrategySelector` names the backend driver and whether one client is
//! shared by every caller; `ClientFactory` turns it plus an address list into
//! clients that all speak the same two-operation `CacheClient` contract.
//!
//! ## Design Principles
//! 1. **Closed Variants**: Every backend is a standalone adapter type inside the
//!    `Backend` enum, selected by a single `match` at construction time.
//! 2. **Fail Early**: Bad strategies, empty address lists and missing
//!    discovery endpoints are rejected by the constructors, never later.
//! 3. **Explicit Ownership**: Resources shared between clients (the
//!    `PooledHkv` server pool) are owned by the factory and injected.
//! 4. **One Error Shape**: Driver errors are translated at each adapter
//!    boundary into `CacheError::Backend`.
//!
//! ## Usage
//!
//! ```no_run
//! use kvload_factory::{CacheClient, ClientFactory, Endpoint, StrategySelector};
//!
//! let addresses = vec!["cache1:6379".parse::<Endpoint>()?];
//! let factory = ClientFactory::new(StrategySelector::SharedOneHkv, addresses)?;
//!
//! let client = factory.get_or_create()?;
//! client.set("x", Some(&[1, 2, 3][..]))?;
//! assert_eq!(client.get("x")?, Some(vec![1, 2, 3]));
//! # Ok::<(), kvload_factory::CacheError>(())
//! ```

mod backends;
mod config;
mod contract;
mod factory;
mod strategy;

pub use backends::{
    Backend, BackendBuilder, HkvClient, PooledHkvClient, RedisClient, RedisClusterClient,
};
pub use config::{BackendSettings, FactoryConfig, MAX_OP_TIMEOUT_MS};
pub use contract::CacheClient;
pub use factory::{ClientBuilder, ClientFactory};
pub use strategy::StrategySelector;

pub use kvload_common::{
    BackendKind, CacheError, CacheResult, Endpoint, FailureKind, SharingMode, DEFAULT_OP_TIMEOUT,
    DEFAULT_POOL_SIZE,
};
