//! # Client Factory
//!
//! Hands out clients according to the sharing mode:
//!
//! - **Shared**: the first `get_or_create` builds the client inside a
//!   `OnceCell`; racing callers block until that single build finishes and
//!   then all receive clones of the same `Arc`. A failed build leaves the cell
//!   empty, so a later call builds again.
//! - **Per-call**: every call builds a new client; builds run in parallel.
//!
//! ```text
//! shared slot:  UNCREATED --get_or_create--> CREATING --ok--> READY
//!                   ^                            |
//!                   +-----------err--------------+
//! ```

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{info, warn};

use kvload_common::{CacheResult, Endpoint, SharingMode};

use crate::backends::BackendBuilder;
use crate::config::{BackendSettings, FactoryConfig};
use crate::contract::CacheClient;
use crate::strategy::StrategySelector;

/// Construction step behind a factory.
///
/// `BackendBuilder` is the production implementation; tests and embedders
/// can supply their own.
pub trait ClientBuilder: Send + Sync {
    type Client: CacheClient;

    /// Builds one new client.
    fn build(&self) -> CacheResult<Self::Client>;
}

/// Produces cache clients for one strategy and address list.
pub struct ClientFactory<B: ClientBuilder = BackendBuilder> {
    sharing: SharingMode,
    builder: B,
    shared: OnceCell<Arc<B::Client>>,
}

impl ClientFactory<BackendBuilder> {
    /// Creates a factory with the fixed default settings.
    ///
    /// # Errors
    /// Returns `CacheError::Configuration` for an empty address list or a
    /// strategy whose settings are incomplete (e.g. redis-cluster without a
    /// discovery URI).
    pub fn new(selector: StrategySelector, addresses: Vec<Endpoint>) -> CacheResult<Self> {
        Self::with_settings(selector, addresses, BackendSettings::default())
    }

    /// Creates a factory with explicit settings.
    pub fn with_settings(
        selector: StrategySelector,
        addresses: Vec<Endpoint>,
        settings: BackendSettings,
    ) -> CacheResult<Self> {
        let builder = BackendBuilder::new(selector, addresses, settings)?;
        info!(
            strategy = %selector,
            servers = builder.addresses().len(),
            timeout_ms = builder.settings().op_timeout_ms,
            "cache client factory ready"
        );
        Ok(Self::with_builder(selector.sharing(), builder))
    }

    /// Creates a factory from a loaded configuration document.
    pub fn from_config(config: &FactoryConfig) -> CacheResult<Self> {
        Self::with_settings(config.strategy, config.servers.clone(), config.settings.clone())
    }

    pub fn selector(&self) -> StrategySelector {
        self.builder.selector()
    }

    pub fn addresses(&self) -> &[Endpoint] {
        self.builder.addresses()
    }

    pub fn settings(&self) -> &BackendSettings {
        self.builder.settings()
    }
}

impl<B: ClientBuilder> ClientFactory<B> {
    /// Wraps any builder with the given sharing mode.
    pub fn with_builder(sharing: SharingMode, builder: B) -> Self {
        ClientFactory {
            sharing,
            builder,
            shared: OnceCell::new(),
        }
    }

    pub fn sharing(&self) -> SharingMode {
        self.sharing
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    /// True once the shared client exists. Always false for per-call factories.
    pub fn is_initialized(&self) -> bool {
        self.shared.get().is_some()
    }

    /// Returns the shared client (building it on first use) or a new client,
    /// depending on the sharing mode.
    ///
    /// # Errors
    /// Returns `CacheError::Backend` when the driver cannot build a client.
    pub fn get_or_create(&self) -> CacheResult<Arc<B::Client>> {
        match self.sharing {
            SharingMode::Shared => self
                .shared
                .get_or_try_init(|| {
                    let client = self.create()?;
                    info!("created shared cache client");
                    Ok(client)
                })
                .map(Arc::clone),
            SharingMode::PerCall => self.create(),
        }
    }

    fn create(&self) -> CacheResult<Arc<B::Client>> {
        self.builder.build().map(Arc::new).map_err(|err| {
            warn!(sharing = %self.sharing, error = %err, "cache client construction failed");
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use kvload_common::{BackendKind, CacheError, FailureKind};

    struct Noop;

    impl CacheClient for Noop {
        fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: Option<&[u8]>) -> CacheResult<()> {
            Ok(())
        }
    }

    /// Fails the first `failures` builds, then succeeds.
    struct Flaky {
        failures: usize,
        calls: AtomicUsize,
    }

    impl ClientBuilder for Flaky {
        type Client = Noop;

        fn build(&self) -> CacheResult<Noop> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                let cause = std::io::Error::from(std::io::ErrorKind::ConnectionRefused);
                return Err(CacheError::backend(BackendKind::Hkv, FailureKind::Connection, cause));
            }
            Ok(Noop)
        }
    }

    fn flaky(failures: usize) -> Flaky {
        Flaky {
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    #[test]
    fn shared_returns_same_instance() {
        let factory = ClientFactory::with_builder(SharingMode::Shared, flaky(0));
        assert!(!factory.is_initialized());
        let first = factory.get_or_create().unwrap();
        let second = factory.get_or_create().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(factory.is_initialized());
        assert_eq!(factory.builder().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn per_call_returns_distinct_instances() {
        let factory = ClientFactory::with_builder(SharingMode::PerCall, flaky(0));
        let first = factory.get_or_create().unwrap();
        let second = factory.get_or_create().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(!factory.is_initialized());
        assert_eq!(factory.builder().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_shared_build_is_retried_on_next_call() {
        let factory = ClientFactory::with_builder(SharingMode::Shared, flaky(1));
        let err = factory.get_or_create().err().expect("first build fails");
        assert_eq!(err.failure_kind(), Some(FailureKind::Connection));
        assert!(!factory.is_initialized());

        let client = factory.get_or_create().unwrap();
        assert!(Arc::ptr_eq(&client, &factory.get_or_create().unwrap()));
        assert_eq!(factory.builder().calls.load(Ordering::SeqCst), 2);
    }
}
