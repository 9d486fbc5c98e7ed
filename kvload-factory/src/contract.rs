//! # Uniform Client Contract
//!
//! The two operations every backend adapter provides. Implementations must
//! keep the same external semantics regardless of driver:
//!
//! - `get` returns `Ok(None)` for a miss; `Ok(Some(vec![]))` is a stored empty
//!   value, not a miss.
//! - `set` with `None` removes the key; removing a missing key succeeds.
//! - Driver failures come back as `CacheError::Backend`, never as a driver's
//!   own error type.

use std::sync::Arc;

use kvload_common::CacheResult;

/// Blocking get/set over raw byte buffers.
pub trait CacheClient: Send + Sync {
    /// Looks up `key`.
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`, or deletes `key` when `value` is `None`.
    fn set(&self, key: &str, value: Option<&[u8]>) -> CacheResult<()>;
}

impl<C: CacheClient + ?Sized> CacheClient for Arc<C> {
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Option<&[u8]>) -> CacheResult<()> {
        (**self).set(key, value)
    }
}

impl<C: CacheClient + ?Sized> CacheClient for Box<C> {
    fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Option<&[u8]>) -> CacheResult<()> {
        (**self).set(key, value)
    }
}
