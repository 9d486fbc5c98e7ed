//! Adapter over `redis::cluster::ClusterClient`.
//!
//! The client bootstraps from the configured discovery URI and falls back to
//! the factory's endpoints as extra seed nodes. The cluster connection is
//! not `Sync`, so calls are serialized behind a mutex.

use std::time::Duration;

use kvload_common::{BackendKind, CacheError, CacheResult, Endpoint};
use parking_lot::Mutex;
use redis::cluster::{ClusterClient, ClusterConnection};
use redis::{IntoConnectionInfo, RedisError};
use tracing::info;

use super::redis_pool::classify;
use crate::config::BackendSettings;
use crate::contract::CacheClient;

/// Extracts and checks the discovery URI. Called at factory construction.
pub(super) fn discovery_uri(settings: &BackendSettings) -> CacheResult<String> {
    let uri = settings
        .discovery_uri
        .as_deref()
        .map(str::trim)
        .filter(|uri| !uri.is_empty())
        .ok_or_else(|| CacheError::config("redis-cluster requires settings.discovery_uri"))?;
    let info = uri
        .into_connection_info()
        .map_err(|err| CacheError::config(format!("invalid discovery_uri `{uri}`: {err}")))?;
    // Cluster mode serves a single keyspace.
    if info.redis.db != 0 {
        return Err(CacheError::config(format!(
            "discovery_uri `{uri}` selects database {}; redis cluster only has database 0",
            info.redis.db
        )));
    }
    Ok(uri.to_string())
}

pub struct RedisClusterClient {
    conn: Mutex<ClusterConnection>,
}

impl RedisClusterClient {
    pub(super) fn new(
        discovery_uri: &str,
        addresses: &[Endpoint],
        timeout: Duration,
    ) -> CacheResult<Self> {
        let mut seeds = vec![discovery_uri.to_string()];
        seeds.extend(addresses.iter().map(Endpoint::redis_url));

        let client = ClusterClient::builder(seeds)
            .connection_timeout(timeout)
            .response_timeout(timeout)
            .build()
            .map_err(translate)?;
        let conn = client.get_connection().map_err(translate)?;
        info!(discovery = discovery_uri, "connected to redis cluster");

        Ok(RedisClusterClient {
            conn: Mutex::new(conn),
        })
    }
}

impl CacheClient for RedisClusterClient {
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.conn.lock();
        redis::cmd("GET").arg(key).query(&mut *conn).map_err(translate)
    }

    fn set(&self, key: &str, value: Option<&[u8]>) -> CacheResult<()> {
        let mut conn = self.conn.lock();
        match value {
            Some(bytes) => redis::cmd("SET")
                .arg(key)
                .arg(bytes)
                .query(&mut *conn)
                .map_err(translate),
            None => redis::cmd("DEL")
                .arg(key)
                .query::<i64>(&mut *conn)
                .map(|_| ())
                .map_err(translate),
        }
    }
}

fn translate(err: RedisError) -> CacheError {
    CacheError::backend(BackendKind::RedisCluster, classify(&err), err)
}
