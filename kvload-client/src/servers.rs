//! # Multi-Server Pool
//!
//! A `ServerPool` owns one `KVClient` (and therefore one connection pool) per
//! server and routes every key to a fixed server by hashing. It is keyed by
//! its server list: the name is derived from the ordered addresses, so two
//! pools over the same list route identically.
//!
//! The pool is meant to be built once and shared behind an `Arc`; it exposes
//! no way to change its server list after construction.

use kvload_common::select_server;
use tracing::debug;

use crate::client::{ClientConfig, ClientResult, KVClient};

pub struct ServerPool {
    name: String,
    servers: Vec<KVClient>,
}

impl ServerPool {
    /// Builds one pooled client per address using `template` for everything
    /// but the address.
    pub fn new<S: AsRef<str>>(addrs: &[S], template: &ClientConfig) -> ClientResult<Self> {
        let servers = addrs
            .iter()
            .map(|addr| {
                KVClient::with_config(ClientConfig {
                    addr: addr.as_ref().to_string(),
                    ..template.clone()
                })
            })
            .collect::<ClientResult<Vec<_>>>()?;

        let name = servers
            .iter()
            .map(KVClient::addr)
            .collect::<Vec<_>>()
            .join(",");
        debug!(pool = %name, servers = servers.len(), "initialized server pool");

        Ok(ServerPool { name, servers })
    }

    /// Comma-joined server list identifying this pool.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Client responsible for `key`.
    ///
    /// # Panics
    /// Panics if the pool was built from an empty address list.
    pub fn client_for(&self, key: &[u8]) -> &KVClient {
        &self.servers[select_server(key, self.servers.len())]
    }

    pub fn get(&self, key: &[u8]) -> ClientResult<Option<Vec<u8>>> {
        self.client_for(key).get(key)
    }

    pub fn set(&self, key: &[u8], value: &[u8]) -> ClientResult<()> {
        self.client_for(key).set(key, value)
    }

    pub fn delete(&self, key: &[u8]) -> ClientResult<bool> {
        self.client_for(key).delete(key)
    }
}
