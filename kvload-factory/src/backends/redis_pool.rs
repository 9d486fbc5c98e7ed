//! Adapter over the `redis` crate with one bounded r2d2 pool per endpoint.
//!
//! Pools are filled eagerly when the client is built, so an unreachable
//! server fails construction instead of the first `get`.

use std::time::Duration;

use kvload_common::{select_server, BackendKind, CacheError, CacheResult, Endpoint, FailureKind};
use r2d2::{CustomizeConnection, Pool};
use redis::RedisError;
use tracing::warn;

use crate::contract::CacheClient;

/// Applies the operation timeout to every connection r2d2 opens.
#[derive(Debug)]
struct SocketTimeouts {
    timeout: Duration,
}

impl CustomizeConnection<redis::Connection, RedisError> for SocketTimeouts {
    fn on_acquire(&self, conn: &mut redis::Connection) -> Result<(), RedisError> {
        conn.set_read_timeout(Some(self.timeout))?;
        conn.set_write_timeout(Some(self.timeout))
    }
}

pub struct RedisClient {
    pools: Vec<Pool<redis::Client>>,
}

impl RedisClient {
    pub(super) fn new(addresses: &[Endpoint], pool_size: u32, timeout: Duration) -> CacheResult<Self> {
        let pools = addresses
            .iter()
            .map(|endpoint| connect(endpoint, pool_size, timeout))
            .collect::<CacheResult<Vec<_>>>()?;
        Ok(RedisClient { pools })
    }

    fn pool_for(&self, key: &str) -> &Pool<redis::Client> {
        &self.pools[select_server(key.as_bytes(), self.pools.len())]
    }

    fn query<T: redis::FromRedisValue>(&self, key: &str, cmd: &redis::Cmd) -> CacheResult<T> {
        let mut conn = self.pool_for(key).get().map_err(|err| {
            CacheError::backend(BackendKind::Redis, FailureKind::Timeout, err)
        })?;
        cmd.query(&mut *conn).map_err(translate)
    }
}

impl CacheClient for RedisClient {
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.query(key, redis::cmd("GET").arg(key))
    }

    fn set(&self, key: &str, value: Option<&[u8]>) -> CacheResult<()> {
        match value {
            Some(bytes) => self.query(key, redis::cmd("SET").arg(key).arg(bytes)),
            None => self
                .query::<i64>(key, redis::cmd("DEL").arg(key))
                .map(|_| ()),
        }
    }
}

fn connect(endpoint: &Endpoint, pool_size: u32, timeout: Duration) -> CacheResult<Pool<redis::Client>> {
    let client = redis::Client::open(endpoint.redis_url()).map_err(translate)?;
    Pool::builder()
        .max_size(pool_size)
        .connection_timeout(timeout)
        .connection_customizer(Box::new(SocketTimeouts { timeout }))
        .build(client)
        .map_err(|err| {
            warn!(%endpoint, error = %err, "redis pool could not be filled");
            CacheError::backend(BackendKind::Redis, FailureKind::Connection, err)
        })
}

/// Maps a redis error onto the shared failure kinds.
pub(super) fn classify(err: &RedisError) -> FailureKind {
    if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
        FailureKind::Connection
    } else if err.code().is_some() {
        FailureKind::Server
    } else {
        FailureKind::Protocol
    }
}

fn translate(err: RedisError) -> CacheError {
    CacheError::backend(BackendKind::Redis, classify(&err), err)
}
