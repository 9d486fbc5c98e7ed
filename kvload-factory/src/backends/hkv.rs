//! Adapters over `kvload-client`.
//!
//! `HkvClient` owns a private `ServerPool`, so every instance opens its own
//! connections. `PooledHkvClient` borrows the factory's pool, so every
//! instance shares one set of connections per endpoint.

use std::sync::Arc;

use kvload_client::{ClientConfig, ClientError, ServerPool};
use kvload_common::{BackendKind, CacheError, CacheResult, Endpoint, FailureKind};

use crate::contract::CacheClient;

/// Builds a server pool over `addresses` in their configured order.
pub(super) fn server_pool(addresses: &[Endpoint], template: &ClientConfig) -> CacheResult<ServerPool> {
    let addrs: Vec<String> = addresses.iter().map(Endpoint::to_string).collect();
    ServerPool::new(addrs.as_slice(), template).map_err(|err| translate(BackendKind::PooledHkv, err))
}

/// Per-instance `kvload-client` adapter.
pub struct HkvClient {
    pool: ServerPool,
}

impl HkvClient {
    pub(super) fn new(addresses: &[Endpoint], template: &ClientConfig) -> CacheResult<Self> {
        let addrs: Vec<String> = addresses.iter().map(Endpoint::to_string).collect();
        let pool = ServerPool::new(addrs.as_slice(), template).map_err(|err| translate(BackendKind::Hkv, err))?;
        Ok(HkvClient { pool })
    }
}

impl CacheClient for HkvClient {
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        get(&self.pool, BackendKind::Hkv, key)
    }

    fn set(&self, key: &str, value: Option<&[u8]>) -> CacheResult<()> {
        set(&self.pool, BackendKind::Hkv, key, value)
    }
}

/// Adapter over the factory-owned server pool.
pub struct PooledHkvClient {
    pool: Arc<ServerPool>,
}

impl PooledHkvClient {
    pub(super) fn new(pool: Arc<ServerPool>) -> Self {
        PooledHkvClient { pool }
    }

    /// The injected pool.
    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }
}

impl CacheClient for PooledHkvClient {
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        get(&self.pool, BackendKind::PooledHkv, key)
    }

    fn set(&self, key: &str, value: Option<&[u8]>) -> CacheResult<()> {
        set(&self.pool, BackendKind::PooledHkv, key, value)
    }
}

fn get(pool: &ServerPool, backend: BackendKind, key: &str) -> CacheResult<Option<Vec<u8>>> {
    pool.get(key.as_bytes()).map_err(|err| translate(backend, err))
}

fn set(pool: &ServerPool, backend: BackendKind, key: &str, value: Option<&[u8]>) -> CacheResult<()> {
    let result = match value {
        Some(bytes) => pool.set(key.as_bytes(), bytes),
        // DEL on a missing key replies 0, which is still a success here.
        None => pool.delete(key.as_bytes()).map(|_| ()),
    };
    result.map_err(|err| translate(backend, err))
}

fn translate(backend: BackendKind, err: ClientError) -> CacheError {
    let kind = match &err {
        ClientError::Timeout(_) | ClientError::AcquireTimeout(_) => FailureKind::Timeout,
        ClientError::Io(_) | ClientError::InvalidAddress(_) => FailureKind::Connection,
        ClientError::Protocol(_) | ClientError::UnexpectedResponse => FailureKind::Protocol,
        ClientError::Server { .. } => FailureKind::Server,
        ClientError::PoolExhausted => FailureKind::Pool,
    };
    CacheError::backend(backend, kind, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Duration;

    #[test]
    fn translates_driver_errors() {
        let cases = [
            (
                ClientError::from(io::Error::from(io::ErrorKind::WouldBlock)),
                FailureKind::Timeout,
            ),
            (ClientError::AcquireTimeout(Duration::from_secs(2)), FailureKind::Timeout),
            (
                ClientError::from(io::Error::from(io::ErrorKind::ConnectionRefused)),
                FailureKind::Connection,
            ),
            (ClientError::Protocol("bad"), FailureKind::Protocol),
            (ClientError::Server { message: b"ERR".to_vec() }, FailureKind::Server),
            (ClientError::PoolExhausted, FailureKind::Pool),
        ];
        for (err, expected) in cases {
            let translated = translate(BackendKind::Hkv, err);
            assert_eq!(translated.failure_kind(), Some(expected));
            assert_eq!(translated.backend_kind(), Some(BackendKind::Hkv));
        }
    }

    #[test]
    fn unreachable_server_is_backend_failure() {
        // Port 1 on localhost is closed on any sane test host.
        let endpoint = Endpoint::new("127.0.0.1", 1).unwrap();
        let template = ClientConfig::with_timeout("", Duration::from_millis(200));
        let client = HkvClient::new(&[endpoint], &template).unwrap();
        let err = client.get("key").unwrap_err();
        assert!(err.is_backend());
    }
}
