//! # Strategy Selector
//!
//! The closed set of supported backend/sharing combinations. A selector is
//! pure configuration: it is parsed or constructed once, validated on the
//! way in, and only read afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use kvload_common::{BackendKind, CacheError, CacheResult, SharingMode};

/// Which backend to build and whether callers share one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StrategySelector {
    /// One `kvload-client` instance shared by every caller.
    SharedOneHkv,
    /// A fresh `kvload-client` instance for every caller.
    PerCallHkv,
    /// One adapter over the factory-owned server pool.
    SharedOnePooledHkv,
    /// One redis client over bounded r2d2 pools.
    SharedOneRedis,
    /// One redis cluster client bootstrapped from a discovery URI.
    SharedOneRedisCluster,
}

impl StrategySelector {
    const ALL: [StrategySelector; 5] = [
        StrategySelector::SharedOneHkv,
        StrategySelector::PerCallHkv,
        StrategySelector::SharedOnePooledHkv,
        StrategySelector::SharedOneRedis,
        StrategySelector::SharedOneRedisCluster,
    ];

    /// Looks up the selector for a backend and sharing mode.
    ///
    /// # Errors
    /// Returns `CacheError::Configuration` for combinations no backend supports.
    pub fn new(kind: BackendKind, sharing: SharingMode) -> CacheResult<Self> {
        Self::ALL
            .into_iter()
            .find(|selector| selector.kind() == kind && selector.sharing() == sharing)
            .ok_or_else(|| {
                CacheError::config(format!("backend {kind} does not support {sharing} clients"))
            })
    }

    /// Every supported selector, in declaration order.
    pub fn all() -> &'static [StrategySelector] {
        &Self::ALL
    }

    pub const fn kind(&self) -> BackendKind {
        match self {
            StrategySelector::SharedOneHkv | StrategySelector::PerCallHkv => BackendKind::Hkv,
            StrategySelector::SharedOnePooledHkv => BackendKind::PooledHkv,
            StrategySelector::SharedOneRedis => BackendKind::Redis,
            StrategySelector::SharedOneRedisCluster => BackendKind::RedisCluster,
        }
    }

    pub const fn sharing(&self) -> SharingMode {
        match self {
            StrategySelector::PerCallHkv => SharingMode::PerCall,
            _ => SharingMode::Shared,
        }
    }

    pub const fn is_shared(&self) -> bool {
        matches!(self.sharing(), SharingMode::Shared)
    }

    /// Canonical configuration name, e.g. `shared-one-redis`.
    pub const fn name(&self) -> &'static str {
        match self {
            StrategySelector::SharedOneHkv => "shared-one-hkv",
            StrategySelector::PerCallHkv => "per-call-hkv",
            StrategySelector::SharedOnePooledHkv => "shared-one-pooled-hkv",
            StrategySelector::SharedOneRedis => "shared-one-redis",
            StrategySelector::SharedOneRedisCluster => "shared-one-redis-cluster",
        }
    }
}

impl fmt::Display for StrategySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategySelector {
    type Err = CacheError;

    /// Accepts canonical names case-insensitively, with `_` or `-`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|selector| selector.name() == normalized)
            .ok_or_else(|| {
                let known = Self::ALL.map(|selector| selector.name()).join(", ");
                CacheError::config(format!("unknown strategy `{s}` (expected one of: {known})"))
            })
    }
}

impl TryFrom<String> for StrategySelector {
    type Error = CacheError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StrategySelector> for String {
    fn from(selector: StrategySelector) -> Self {
        selector.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for selector in StrategySelector::all() {
            assert_eq!(selector.name().parse::<StrategySelector>().unwrap(), *selector);
            assert_eq!(
                StrategySelector::new(selector.kind(), selector.sharing()).unwrap(),
                *selector
            );
        }
    }

    #[test]
    fn parses_legacy_spelling() {
        let selector: StrategySelector = "SHARED_ONE_REDIS".parse().unwrap();
        assert_eq!(selector, StrategySelector::SharedOneRedis);
    }

    #[test]
    fn only_hkv_supports_per_call() {
        let per_call: Vec<_> = StrategySelector::all()
            .iter()
            .filter(|selector| !selector.is_shared())
            .collect();
        assert_eq!(per_call, vec![&StrategySelector::PerCallHkv]);

        for kind in [BackendKind::PooledHkv, BackendKind::Redis, BackendKind::RedisCluster] {
            let err = StrategySelector::new(kind, SharingMode::PerCall).unwrap_err();
            assert!(err.is_configuration());
        }
    }

    #[test]
    fn unknown_name_is_configuration_error() {
        let err = "shared-one-memcached".parse::<StrategySelector>().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("shared-one-memcached"));
    }

    #[test]
    fn serde_uses_names() {
        let json = serde_json::to_string(&StrategySelector::SharedOnePooledHkv).unwrap();
        assert_eq!(json, "\"shared-one-pooled-hkv\"");
        assert!(serde_json::from_str::<StrategySelector>("\"bogus\"").is_err());
    }
}
