// kvload-common - Shared types and error taxonomy for the kvload workspace
//
// This crate defines the vocabulary shared by the RESP driver and the client
// factory: endpoints, backend kinds, sharing modes and the error types that
// cross the uniform client contract.

pub mod error;
pub mod shard;
pub mod types;

// Re-export for convenience
pub use error::*;
pub use shard::*;
pub use types::*;
