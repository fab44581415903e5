use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use log::warn;

use super::{CacheEntry, CacheError, CacheKey, ResponseCache};

/// Process-local in-memory cache backend.
///
/// Entries do not survive the process. Stale entries are kept until
/// overwritten or cleared; freshness is the caller's concern.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the entry map, recovering from poison if necessary. Losing a
    /// cached response to a panicked writer is harmless; the entry is
    /// refetched on the next miss.
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("Memory cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl ResponseCache for MemoryCache {
    fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.lock_entries().get(key).cloned())
    }

    fn store(&self, key: &CacheKey, body: &str, ttl: Duration) -> Result<(), CacheError> {
        let entry = CacheEntry {
            body: body.to_string(),
            stored_at: Utc::now(),
            ttl,
        };
        self.lock_entries().insert(key.clone(), entry);
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.lock_entries().clear();
        Ok(())
    }
}
