//! In-process RESP2 servers for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::thread;
use std::time::Duration;

use kvload_factory::Endpoint;
use parking_lot::Mutex;

static TRACING: Once = Once::new();

/// Installs a test-writer subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

type Store = Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>;

/// A tiny key/value server answering GET, SET, DEL, PING, connection setup
/// commands and `CLUSTER SLOTS` (one node owning every slot: itself). Each
/// accepted connection gets its own thread.
pub struct FakeServer {
    endpoint: Endpoint,
    store: Store,
    connections: Arc<AtomicUsize>,
}

#[derive(Clone, Copy)]
struct Behavior {
    port: u16,
    // Leave GET unanswered while everything else still works.
    stall_gets: bool,
}

impl FakeServer {
    pub fn start() -> FakeServer {
        Self::spawn(false)
    }

    /// Like `start`, but GET requests never get a reply.
    pub fn start_stalling_gets() -> FakeServer {
        Self::spawn(true)
    }

    fn spawn(stall_gets: bool) -> FakeServer {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let store: Store = Arc::default();
        let connections = Arc::new(AtomicUsize::new(0));
        let behavior = Behavior { port, stall_gets };

        {
            let store = store.clone();
            let connections = connections.clone();
            thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(stream) = stream else { break };
                    connections.fetch_add(1, Ordering::SeqCst);
                    let store = store.clone();
                    thread::spawn(move || serve(stream, store, behavior));
                }
            });
        }

        FakeServer {
            endpoint: Endpoint::new("127.0.0.1", port).expect("endpoint"),
            store,
            connections,
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint.clone()
    }

    /// Number of TCP connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.store.lock().contains_key(key.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }
}

/// Accepts connections and never answers, to exercise timeouts.
pub struct SilentServer {
    endpoint: Endpoint,
}

impl SilentServer {
    pub fn start() -> SilentServer {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        thread::spawn(move || {
            let mut held = Vec::new();
            for stream in listener.incoming().flatten() {
                held.push(stream);
            }
        });
        SilentServer {
            endpoint: Endpoint::new("127.0.0.1", port).expect("endpoint"),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint.clone()
    }
}

fn serve(stream: TcpStream, store: Store, behavior: Behavior) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(30)));
    let mut writer = match stream.try_clone() {
        Ok(writer) => writer,
        Err(_) => return,
    };
    let mut reader = BufReader::new(stream);
    while let Some(args) = read_command(&mut reader) {
        let Some(reply) = dispatch(&args, &store, behavior) else {
            continue;
        };
        if writer.write_all(&reply).and_then(|_| writer.flush()).is_err() {
            return;
        }
    }
}

fn dispatch(args: &[Vec<u8>], store: &Store, behavior: Behavior) -> Option<Vec<u8>> {
    let Some(cmd) = args.first() else {
        return Some(b"-ERR empty command\r\n".to_vec());
    };
    let reply = match (cmd.to_ascii_uppercase().as_slice(), args.len()) {
        (b"PING", 1) => b"+PONG\r\n".to_vec(),
        (b"GET", 2) if behavior.stall_gets => return None,
        (b"GET", 2) => match store.lock().get(&args[1]) {
            Some(value) => bulk(value),
            None => b"$-1\r\n".to_vec(),
        },
        (b"SET", 3) => {
            store.lock().insert(args[1].clone(), args[2].clone());
            b"+OK\r\n".to_vec()
        }
        (b"DEL", 2) => {
            let removed = store.lock().remove(&args[1]).is_some();
            format!(":{}\r\n", u8::from(removed)).into_bytes()
        }
        (b"CLUSTER", 2) if args[1].eq_ignore_ascii_case(b"SLOTS") => cluster_slots(behavior.port),
        (b"CLIENT", _) | (b"SELECT", 2) => b"+OK\r\n".to_vec(),
        _ => b"-ERR unknown command\r\n".to_vec(),
    };
    Some(reply)
}

/// One slot range covering the whole keyspace, served by this node.
fn cluster_slots(port: u16) -> Vec<u8> {
    let mut out = b"*1\r\n*3\r\n:0\r\n:16383\r\n*3\r\n".to_vec();
    out.extend_from_slice(&bulk(b"127.0.0.1"));
    out.extend_from_slice(format!(":{port}\r\n").as_bytes());
    out.extend_from_slice(&bulk(b"fake-node-0000000000000000000000000000000"));
    out
}

fn bulk(value: &[u8]) -> Vec<u8> {
    let mut out = format!("${}\r\n", value.len()).into_bytes();
    out.extend_from_slice(value);
    out.extend_from_slice(b"\r\n");
    out
}

fn read_command(reader: &mut BufReader<TcpStream>) -> Option<Vec<Vec<u8>>> {
    let mut line = Vec::new();
    let count = read_header(reader, &mut line, b'*')?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let len = read_header(reader, &mut line, b'$')?;
        let mut data = vec![0u8; len + 2];
        reader.read_exact(&mut data).ok()?;
        data.truncate(len);
        args.push(data);
    }
    Some(args)
}

fn read_header(reader: &mut BufReader<TcpStream>, line: &mut Vec<u8>, marker: u8) -> Option<usize> {
    line.clear();
    if reader.read_until(b'\n', line).ok()? == 0 {
        return None;
    }
    let body = line.strip_prefix(&[marker])?.strip_suffix(b"\r\n")?;
    std::str::from_utf8(body).ok()?.parse().ok()
}
