//! Response cache contract and backends.
//!
//! The pipeline depends only on the [`ResponseCache`] trait; the backing
//! store is pluggable. Two backends are provided:
//! - [`MemoryCache`] - process-local, for tests and ephemeral use
//! - [`SqliteCache`] - file-backed, WAL-journaled, shareable across
//!   processes (the default)
//!
//! Entries carry their stored-at timestamp and TTL; freshness is judged by
//! the caller via [`CacheEntry::is_fresh`]. A stale or physically removed
//! entry is merely a forced miss, never an error.

mod memory;
mod sqlite;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::errors::{classify_store_fault, StoreFault};

/// Errors from a cache backend.
///
/// Internal to the storage layer; the pipeline converts these to
/// `FmpError::TransientStore` at the boundary after its retry budget is
/// spent.
#[derive(Error, Debug)]
pub enum CacheError {
    /// SQLite driver error.
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Any other backend failure.
    #[error("{0}")]
    Backend(String),
}

impl CacheError {
    /// Whether this fault is expected to resolve on retry.
    pub fn is_transient(&self) -> bool {
        classify_store_fault(&self.to_string()) == StoreFault::Transient
    }
}

/// Normalized identity of one logical fetch: endpoint path plus the
/// sorted set of query parameters.
///
/// Two calls with the same key are the same cached resource, regardless
/// of parameter insertion order. The API-key credential is injected by
/// the transport and is never part of a key.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key from an endpoint and its query parameters.
    pub fn new(endpoint: &str, params: &[(&str, String)]) -> Self {
        let mut sorted: Vec<(&str, &str)> = params
            .iter()
            .map(|(name, value)| (*name, value.as_str()))
            .collect();
        sorted.sort();

        let mut key = String::from(endpoint);
        for (i, (name, value)) in sorted.iter().enumerate() {
            key.push(if i == 0 { '?' } else { '&' });
            key.push_str(name);
            key.push('=');
            key.push_str(value);
        }
        CacheKey(key)
    }

    /// Canonical string form of the key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One cached response body with its expiration bookkeeping.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    /// Raw response body as fetched.
    pub body: String,
    /// When the entry was stored.
    pub stored_at: DateTime<Utc>,
    /// How long after `stored_at` the entry stays fresh.
    pub ttl: Duration,
}

impl CacheEntry {
    /// An entry is fresh iff `now - stored_at <= ttl`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(self.ttl) {
            Ok(ttl) => now.signed_duration_since(self.stored_at) <= ttl,
            // TTL too large to represent: effectively never expires
            Err(_) => true,
        }
    }
}

/// Contract between the request pipeline and the backing store.
pub trait ResponseCache: Send + Sync {
    /// Fetch the entry under `key`, fresh or stale, if one exists.
    fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;

    /// Record a newly fetched body under `key`, overwriting any previous
    /// entry (at most one entry per key exists at a time).
    fn store(&self, key: &CacheKey, body: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Drop all entries.
    fn clear(&self) -> Result<(), CacheError>;
}
