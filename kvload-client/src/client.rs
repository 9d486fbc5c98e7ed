//! # Synchronous Client API
//!
//! Purpose: Expose a compact, blocking API for issuing RESP2 commands to a
//! single cache server.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `KVClient` hides pooling and protocol details.
//! 2. **Borrow-Friendly API**: Accept `&[u8]` to avoid unnecessary copies.
//! 3. **Fail Fast**: Protocol violations surface immediately as errors.
//! 4. **Timeouts Are Errors**: Socket and checkout timeouts map to
//!    `ClientError::Timeout` / `ClientError::AcquireTimeout`. With
//!    `op_timeout` set, a whole command is bounded, not just each socket call.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::pool::{ConnectionPool, PoolConfig};
use crate::resp::RespValue;

/// Result type for the sync client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the sync client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or IO failure while connecting, reading or writing.
    #[error("io error: {0}")]
    Io(#[source] io::Error),
    /// A socket read, write or connect ran past its timeout.
    #[error("socket timed out: {0}")]
    Timeout(#[source] io::Error),
    /// RESP2 framing or parse error.
    #[error("protocol error: {0}")]
    Protocol(&'static str),
    /// Server returned an error reply.
    #[error("server error: {}", String::from_utf8_lossy(.message))]
    Server { message: Vec<u8> },
    /// Response type did not match the expected command response.
    #[error("unexpected response")]
    UnexpectedResponse,
    /// Pool is at capacity and the config asks not to wait.
    #[error("connection pool exhausted")]
    PoolExhausted,
    /// Pool stayed at capacity for the whole acquire timeout.
    #[error("timed out after {0:?} waiting for a pooled connection")]
    AcquireTimeout(Duration),
    /// Address could not be resolved to a socket address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

impl ClientError {
    /// True for socket and checkout timeouts.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout(_) | ClientError::AcquireTimeout(_))
    }
}

impl From<io::Error> for ClientError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            // Unix reports an expired SO_RCVTIMEO as WouldBlock.
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => ClientError::Timeout(err),
            _ => ClientError::Io(err),
        }
    }
}

/// Configuration for the synchronous client and its pool.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address, e.g. "127.0.0.1:6379" or "cache1:6379".
    pub addr: String,
    /// Maximum idle connections kept in the pool.
    pub max_idle: usize,
    /// Maximum total connections (idle + in-use).
    pub max_total: usize,
    /// Optional TCP read timeout.
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    pub write_timeout: Option<Duration>,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
    /// How long a checkout may wait for a free slot; `None` fails fast.
    pub acquire_timeout: Option<Duration>,
    /// Upper bound for one command from checkout to parsed reply.
    pub op_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Config for `addr` with every timeout, including the per-command
    /// budget, set to `timeout`.
    pub fn with_timeout(addr: impl Into<String>, timeout: Duration) -> Self {
        ClientConfig {
            addr: addr.into(),
            read_timeout: Some(timeout),
            write_timeout: Some(timeout),
            connect_timeout: Some(timeout),
            acquire_timeout: Some(timeout),
            op_timeout: Some(timeout),
            ..ClientConfig::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            addr: "127.0.0.1:6379".to_string(),
            max_idle: 8,
            max_total: 16,
            read_timeout: None,
            write_timeout: None,
            connect_timeout: None,
            acquire_timeout: None,
            op_timeout: None,
        }
    }
}

/// Synchronous client with connection pooling.
///
/// This is a facade over the pool and RESP encoder/decoder. Each call acquires
/// a connection, executes one command, and returns the connection to the pool.
/// Cloning is cheap and shares the pool.
#[derive(Clone)]
pub struct KVClient {
    pool: ConnectionPool,
}

impl KVClient {
    /// Creates a client with default configuration.
    pub fn connect(addr: impl Into<String>) -> ClientResult<Self> {
        let config = ClientConfig {
            addr: addr.into(),
            ..ClientConfig::default()
        };
        Self::with_config(config)
    }

    /// Creates a client with a custom configuration.
    ///
    /// Connections are opened lazily on first use.
    pub fn with_config(config: ClientConfig) -> ClientResult<Self> {
        let pool = ConnectionPool::new(PoolConfig {
            addr: config.addr,
            max_idle: config.max_idle,
            max_total: config.max_total,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
            connect_timeout: config.connect_timeout,
            acquire_timeout: config.acquire_timeout,
            op_timeout: config.op_timeout,
        })?;
        Ok(KVClient { pool })
    }

    /// Server address this client talks to.
    pub fn addr(&self) -> &str {
        self.pool.addr()
    }

    /// Fetches a value by key.
    ///
    /// Returns `Ok(None)` when the key is missing.
    pub fn get(&self, key: &[u8]) -> ClientResult<Option<Vec<u8>>> {
        match self.exec(&[b"GET", key])? {
            RespValue::Bulk(data) => Ok(data),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Sets a value for a key without expiration.
    pub fn set(&self, key: &[u8], value: &[u8]) -> ClientResult<()> {
        match self.exec(&[b"SET", key, value])? {
            RespValue::Simple(_) => Ok(()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Deletes a key. Returns true when a key was removed.
    pub fn delete(&self, key: &[u8]) -> ClientResult<bool> {
        match self.exec(&[b"DEL", key])? {
            RespValue::Integer(count) => Ok(count > 0),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Pings the server. Returns the raw response payload.
    pub fn ping(&self) -> ClientResult<Vec<u8>> {
        match self.exec(&[b"PING"])? {
            RespValue::Simple(text) => Ok(text),
            RespValue::Bulk(Some(data)) => Ok(data),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Runs one command on a pooled connection, lifting error replies.
    fn exec(&self, args: &[&[u8]]) -> ClientResult<RespValue> {
        let mut conn = self.pool.acquire()?;
        match conn.exec(args)? {
            RespValue::Error(message) => Err(ClientError::Server { message }),
            other => Ok(other),
        }
    }
}
