use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension};

use super::{CacheEntry, CacheError, CacheKey, ResponseCache};

/// Busy timeout for a shared cache file. A concurrent writer holding the
/// database briefly shows up as "database is locked" past this deadline.
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// File-backed SQLite cache backend.
///
/// One table keyed by the canonical cache-key string. The database is
/// opened in WAL journal mode with a busy timeout so concurrent readers
/// and writers (including other processes sharing the file) do not corrupt
/// entries; lock contention past the timeout surfaces as a transient
/// fault that the pipeline retries.
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Open (or create) a cache database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let conn = Connection::open(path)?;

        if let Err(e) = Self::configure(&conn) {
            warn!("Could not configure SQLite cache WAL mode: {e}");
        } else {
            debug!("SQLite cache configured with WAL mode");
        }

        conn.execute(
            "CREATE TABLE IF NOT EXISTS responses (
                cache_key TEXT PRIMARY KEY,
                body      TEXT NOT NULL,
                stored_at INTEGER NOT NULL,
                ttl_secs  INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn configure(conn: &Connection) -> Result<(), rusqlite::Error> {
        // journal_mode returns the resulting mode as a row
        conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(())
    }

    /// Lock the connection, recovering from poison if necessary. The
    /// database itself stays consistent under WAL; a panicked holder at
    /// worst left a statement unfinished.
    fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("SQLite cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl ResponseCache for SqliteCache {
    fn lookup(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let conn = self.lock_conn();
        let row = conn
            .query_row(
                "SELECT body, stored_at, ttl_secs FROM responses WHERE cache_key = ?1",
                params![key.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((body, stored_at, ttl_secs)) = row else {
            return Ok(None);
        };

        let stored_at = Utc
            .timestamp_opt(stored_at, 0)
            .single()
            .ok_or_else(|| CacheError::Backend(format!("invalid stored_at: {stored_at}")))?;

        Ok(Some(CacheEntry {
            body,
            stored_at,
            ttl: Duration::from_secs(ttl_secs.max(0) as u64),
        }))
    }

    fn store(&self, key: &CacheKey, body: &str, ttl: Duration) -> Result<(), CacheError> {
        let conn = self.lock_conn();
        conn.execute(
            "INSERT OR REPLACE INTO responses (cache_key, body, stored_at, ttl_secs)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                key.as_str(),
                body,
                Utc::now().timestamp(),
                ttl.as_secs() as i64
            ],
        )?;
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        let conn = self.lock_conn();
        conn.execute("DELETE FROM responses", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(symbol: &str) -> CacheKey {
        CacheKey::new("quote", &[("symbol", symbol.to_string())])
    }

    #[test]
    fn test_store_then_lookup_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SqliteCache::open(dir.path().join("cache.sqlite")).unwrap();

        cache
            .store(&key("AAPL"), r#"[{"price":1}]"#, Duration::from_secs(300))
            .unwrap();

        let entry = cache.lookup(&key("AAPL")).unwrap().unwrap();
        assert_eq!(entry.body, r#"[{"price":1}]"#);
        assert_eq!(entry.ttl, Duration::from_secs(300));
        assert!(entry.is_fresh(Utc::now()));
    }

    #[test]
    fn test_lookup_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SqliteCache::open(dir.path().join("cache.sqlite")).unwrap();
        assert!(cache.lookup(&key("AAPL")).unwrap().is_none());
    }

    #[test]
    fn test_store_overwrites_previous_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SqliteCache::open(dir.path().join("cache.sqlite")).unwrap();

        cache.store(&key("AAPL"), "old", Duration::from_secs(300)).unwrap();
        cache.store(&key("AAPL"), "new", Duration::from_secs(600)).unwrap();

        let entry = cache.lookup(&key("AAPL")).unwrap().unwrap();
        assert_eq!(entry.body, "new");
        assert_eq!(entry.ttl, Duration::from_secs(600));

        let conn = cache.lock_conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_clear_drops_all_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SqliteCache::open(dir.path().join("cache.sqlite")).unwrap();

        cache.store(&key("AAPL"), "a", Duration::from_secs(300)).unwrap();
        cache.store(&key("NVDA"), "b", Duration::from_secs(300)).unwrap();

        cache.clear().unwrap();

        assert!(cache.lookup(&key("AAPL")).unwrap().is_none());
        assert!(cache.lookup(&key("NVDA")).unwrap().is_none());
    }

    #[test]
    fn test_database_uses_wal_journal_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");
        let _cache = SqliteCache::open(&path).unwrap();

        let probe = Connection::open(&path).unwrap();
        let mode: String = probe
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn test_entry_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");

        {
            let cache = SqliteCache::open(&path).unwrap();
            cache
                .store(&key("AAPL"), "persisted", Duration::from_secs(300))
                .unwrap();
        }

        let cache = SqliteCache::open(&path).unwrap();
        let entry = cache.lookup(&key("AAPL")).unwrap().unwrap();
        assert_eq!(entry.body, "persisted");
    }

    #[test]
    fn test_aged_entry_reads_back_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite");
        let cache = SqliteCache::open(&path).unwrap();

        cache.store(&key("AAPL"), "aging", Duration::from_secs(300)).unwrap();

        // age the entry from a second connection, as another process would
        let other = Connection::open(&path).unwrap();
        other
            .execute(
                "UPDATE responses SET stored_at = stored_at - 301",
                [],
            )
            .unwrap();

        let entry = cache.lookup(&key("AAPL")).unwrap().unwrap();
        assert!(!entry.is_fresh(Utc::now()));
    }
}
