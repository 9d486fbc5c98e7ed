//! # Connection Pool
//!
//! Purpose: Reuse TCP connections for the sync client to reduce handshake
//! latency and allocation churn.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Keep a bounded set of reusable connections.
//! 2. **Minimal Locking**: Hold the mutex only while moving idle connections
//!    or adjusting the slot count; connects happen outside the lock.
//! 3. **Bounded Checkout**: At capacity, a checkout waits on a condvar for at
//!    most `acquire_timeout`, or fails immediately when none is set.
//! 4. **Whole-Operation Deadline**: With `op_timeout` set, checkout, connect,
//!    write and every read share one deadline; each socket call only gets
//!    what is left of it.
//! 5. **Cache-Friendly Buffers**: Each connection reuses its own buffers.

use std::collections::VecDeque;
use std::io::{self, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::client::{ClientError, ClientResult};
use crate::resp::{encode_command, RespReader, RespValue};

/// Pool configuration for the sync client.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Server address, e.g. "127.0.0.1:6379".
    pub addr: String,
    /// Maximum number of idle connections to keep.
    pub max_idle: usize,
    /// Maximum total connections (idle + in-use).
    pub max_total: usize,
    /// Optional TCP read timeout.
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    pub write_timeout: Option<Duration>,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Optional wait for a free slot when the pool is at capacity.
    pub acquire_timeout: Option<Duration>,
    /// Optional budget for one whole command, checkout through reply.
    pub op_timeout: Option<Duration>,
}

struct PoolState {
    idle: VecDeque<Connection>,
    total: usize,
}

struct PoolInner {
    config: PoolConfig,
    state: Mutex<PoolState>,
    // Signalled whenever a connection or a slot is handed back.
    released: Condvar,
}

/// Connection pool handle.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Creates a new connection pool with the provided configuration.
    pub fn new(config: PoolConfig) -> ClientResult<Self> {
        let state = PoolState {
            idle: VecDeque::with_capacity(config.max_idle),
            total: 0,
        };
        Ok(ConnectionPool {
            inner: Arc::new(PoolInner {
                config,
                state: Mutex::new(state),
                released: Condvar::new(),
            }),
        })
    }

    /// Server address the pool connects to.
    pub fn addr(&self) -> &str {
        &self.inner.config.addr
    }

    /// Acquires a connection from the pool.
    ///
    /// The operation deadline starts here, so time spent waiting for a slot
    /// or connecting counts against the command that follows.
    pub fn acquire(&self) -> ClientResult<PooledConnection> {
        let deadline = self
            .inner
            .config
            .op_timeout
            .and_then(|timeout| Instant::now().checked_add(timeout));

        if let Some(conn) = self.reserve(deadline)? {
            return Ok(PooledConnection::new(self.inner.clone(), conn, deadline));
        }

        match Connection::connect(&self.inner.config, deadline) {
            Ok(conn) => {
                trace!(addr = %self.inner.config.addr, "opened pooled connection");
                Ok(PooledConnection::new(self.inner.clone(), conn, deadline))
            }
            Err(err) => {
                self.release_slot();
                Err(err)
            }
        }
    }

    /// Pops an idle connection, or reserves a slot for a new one (`None`).
    fn reserve(&self, op_deadline: Option<Instant>) -> ClientResult<Option<Connection>> {
        let started = Instant::now();
        let deadline = self.inner.config.acquire_timeout.map(|timeout| {
            let at = started.checked_add(timeout);
            let at = match (at, op_deadline) {
                (Some(at), Some(op)) => at.min(op),
                (Some(at), None) => at,
                (None, Some(op)) => op,
                // Effectively unbounded; a year is plenty.
                (None, None) => started + Duration::from_secs(365 * 24 * 60 * 60),
            };
            (at.saturating_duration_since(started), at)
        });

        let mut state = self.inner.state.lock();
        loop {
            if let Some(conn) = state.idle.pop_front() {
                return Ok(Some(conn));
            }
            if state.total < self.inner.config.max_total {
                state.total += 1;
                return Ok(None);
            }
            match deadline {
                None => return Err(ClientError::PoolExhausted),
                Some((timeout, at)) => {
                    if self.inner.released.wait_until(&mut state, at).timed_out() {
                        return Err(ClientError::AcquireTimeout(timeout));
                    }
                }
            }
        }
    }

    fn release_slot(&self) {
        let mut state = self.inner.state.lock();
        state.total = state.total.saturating_sub(1);
        drop(state);
        self.inner.released.notify_one();
    }

    fn return_connection(&self, conn: Connection) {
        let mut state = self.inner.state.lock();
        if state.idle.len() < self.inner.config.max_idle {
            state.idle.push_back(conn);
        } else {
            state.total = state.total.saturating_sub(1);
        }
        drop(state);
        self.inner.released.notify_one();
    }
}

/// RAII wrapper returning a connection to the pool on drop.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    conn: Option<Connection>,
    deadline: Option<Instant>,
    valid: bool,
}

impl PooledConnection {
    fn new(pool: Arc<PoolInner>, conn: Connection, deadline: Option<Instant>) -> Self {
        PooledConnection {
            pool,
            conn: Some(conn),
            deadline,
            valid: true,
        }
    }

    /// Executes a RESP command and returns the parsed response.
    ///
    /// Fails with `ClientError::Timeout` once the operation deadline passes,
    /// however the reply trickles in.
    pub fn exec(&mut self, args: &[&[u8]]) -> ClientResult<RespValue> {
        let conn = self.conn.as_mut().expect("connection exists");
        let response = conn.exec(args, self.deadline);
        if response.is_err() {
            // A timed-out or broken stream may hold a stale reply; never reuse it.
            self.valid = false;
        }
        response
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let conn = match self.conn.take() {
            Some(conn) => conn,
            None => return,
        };

        let pool = ConnectionPool {
            inner: self.pool.clone(),
        };

        if self.valid {
            pool.return_connection(conn);
        } else {
            pool.release_slot();
        }
    }
}

/// Single TCP connection with reusable buffers.
pub struct Connection {
    // Buffered reader reduces syscalls while still allowing direct writes.
    reader: RespReader<BufReader<TimedStream>>,
    write_buf: Vec<u8>,
}

impl Connection {
    fn connect(config: &PoolConfig, deadline: Option<Instant>) -> ClientResult<Self> {
        let stream = connect_stream(config, deadline)?;
        // Disable Nagle to keep request latency low for small payloads.
        stream.set_nodelay(true)?;

        let stream = TimedStream {
            stream,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
            deadline: None,
        };
        Ok(Connection {
            reader: RespReader::new(BufReader::new(stream)),
            write_buf: Vec::with_capacity(256),
        })
    }

    fn exec(&mut self, args: &[&[u8]], deadline: Option<Instant>) -> ClientResult<RespValue> {
        self.write_buf.clear();
        encode_command(args, &mut self.write_buf);

        let stream = self.reader.get_mut().get_mut();
        stream.deadline = deadline;
        stream.write_all(&self.write_buf)?;
        stream.flush()?;

        self.reader.read_value()
    }
}

/// TCP stream that re-arms its socket timeouts before every call so that no
/// call outlives the current operation deadline.
struct TimedStream {
    stream: TcpStream,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    deadline: Option<Instant>,
}

impl Read for TimedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let timeout = budget(self.read_timeout, self.deadline)?;
        self.stream.set_read_timeout(timeout)?;
        self.stream.read(buf)
    }
}

impl Write for TimedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let timeout = budget(self.write_timeout, self.deadline)?;
        self.stream.set_write_timeout(timeout)?;
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

/// The smaller of `limit` and the time left before `deadline`.
///
/// An expired deadline is a `TimedOut` error, never a zero socket timeout.
fn budget(limit: Option<Duration>, deadline: Option<Instant>) -> io::Result<Option<Duration>> {
    let Some(deadline) = deadline else {
        return Ok(limit);
    };
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(io::Error::new(io::ErrorKind::TimedOut, "operation deadline passed"));
    }
    Ok(Some(limit.map_or(left, |limit| limit.min(left))))
}

/// Resolves `addr` and connects to the first address that accepts.
fn connect_stream(config: &PoolConfig, deadline: Option<Instant>) -> ClientResult<TcpStream> {
    let addrs: Vec<SocketAddr> = config
        .addr
        .to_socket_addrs()
        .map_err(|_| ClientError::InvalidAddress(config.addr.clone()))?
        .collect();

    let mut last_err = None;
    for addr in addrs {
        let attempt = match budget(config.connect_timeout, deadline)? {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }

    match last_err {
        Some(err) => Err(err.into()),
        None => Err(ClientError::InvalidAddress(config.addr.clone())),
    }
}
