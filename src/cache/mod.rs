//! Shared key/value cache for credentials
//!
//! Token providers only need two operations from a cache backend: read a
//! value by key and write a value with a time-to-live. Any store that offers
//! atomic single-key get/set (in-process map, Redis, memcached) can implement
//! [`Cache`]. Expiry is entirely the cache's job; a value that comes back from
//! [`Cache::get`] is treated as still valid.
//!
//! [`MemoryCache`] is the in-process implementation used when no other
//! backend is configured.

mod memory;

pub use memory::MemoryCache;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

/// Boxed future returned by [`Cache`] operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + Send + 'a>>;

/// Error reported by a cache backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("cache backend failure: {0}")]
    Backend(String),

    #[error("invalid cache entry for {key}: {message}")]
    InvalidEntry { key: String, message: String },
}

/// Key/value store with per-key TTL.
pub trait Cache: Send + Sync {
    /// Read the value stored under `key`; `Ok(None)` on a miss.
    fn get<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Option<String>>;

    /// Store `value` under `key`, replacing any previous value, expiring after `ttl`.
    fn set<'a>(&'a self, key: &'a str, value: &'a str, ttl: Duration) -> CacheFuture<'a, ()>;
}
