//! # kvload Sync Client
//!
//! Purpose: Provide a lightweight, synchronous RESP2 client with connection
//! pooling, plus a multi-server pool that routes keys across an ordered
//! server list.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Reuse TCP connections to avoid repeated connects.
//! 2. **Bounded Waits**: Every blocking step (connect, read, write, checkout)
//!    honors a configured timeout.
//! 3. **Minimal Allocation**: Reuse buffers for RESP framing and parsing.
//! 4. **Protocol Clarity**: Encode/parse RESP2 explicitly for correctness.

mod client;
mod pool;
mod resp;
mod servers;

pub use client::{ClientConfig, ClientError, ClientResult, KVClient};
pub use servers::ServerPool;
