// 🗃️ House Cache - remembers houses the authority has already confirmed
//
// Only positive results ever land here. Presence of a key is the proof.

use super::HouseRecord;
use anyhow::{Context, Result};
use dashmap::DashMap;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// String-keyed store of confirmed house records.
///
/// Implementations must be safe to share between concurrent requests.
/// A failing backend behaves like a miss on `get` and a no-op on `put`.
pub trait HouseCache: Send + Sync {
    fn get(&self, key: &str) -> Option<HouseRecord>;
    fn put(&self, key: &str, record: HouseRecord);
}

// ============================================================================
// IN-MEMORY CACHE
// ============================================================================

/// Process-wide cache backed by a sharded concurrent map
pub struct InMemoryHouseCache {
    entries: DashMap<String, HouseRecord>,
    /// 0 = unbounded
    capacity: usize,
    /// Serialises evict-then-insert on bounded caches; reads never take it
    bounded_writes: Mutex<()>,
}

impl InMemoryHouseCache {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Bounded cache; once full, an arbitrary entry makes room for a new key.
    /// The bound holds under concurrent puts.
    pub fn with_capacity(capacity: usize) -> Self {
        InMemoryHouseCache {
            entries: DashMap::new(),
            capacity,
            bounded_writes: Mutex::new(()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for InMemoryHouseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl HouseCache for InMemoryHouseCache {
    fn get(&self, key: &str) -> Option<HouseRecord> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn put(&self, key: &str, record: HouseRecord) {
        if self.capacity == 0 {
            self.entries.insert(key.to_string(), record);
            return;
        }

        // A poisoned lock guards no data, keep going
        let _guard = self
            .bounded_writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if !self.entries.contains_key(key) && self.entries.len() >= self.capacity {
            let victim = self.entries.iter().next().map(|entry| entry.key().clone());
            if let Some(victim) = victim {
                self.entries.remove(&victim);
            }
        }

        self.entries.insert(key.to_string(), record);
    }
}

// ============================================================================
// SQLITE CACHE
// ============================================================================

/// Cache persisted in a `house_cache` table, survives restarts
pub struct SqliteHouseCache {
    conn: Mutex<Connection>,
}

impl SqliteHouseCache {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open house cache at {:?}", path))?;
        Self::new(conn)
    }

    pub fn new(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS house_cache (
                cache_key TEXT PRIMARY KEY,
                record TEXT NOT NULL,
                cached_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )
        .context("Failed to create house_cache table")?;

        Ok(SqliteHouseCache {
            conn: Mutex::new(conn),
        })
    }

    fn try_get(&self, key: &str) -> Result<Option<HouseRecord>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("house cache lock poisoned"))?;

        let raw: Option<String> = conn
            .query_row(
                "SELECT record FROM house_cache WHERE cache_key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    fn try_put(&self, key: &str, record: &HouseRecord) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("house cache lock poisoned"))?;

        conn.execute(
            "INSERT OR REPLACE INTO house_cache (cache_key, record) VALUES (?1, ?2)",
            params![key, serde_json::to_string(record)?],
        )?;
        Ok(())
    }
}

impl HouseCache for SqliteHouseCache {
    fn get(&self, key: &str) -> Option<HouseRecord> {
        match self.try_get(key) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(key, error = %e, "house cache read failed, treating as miss");
                None
            }
        }
    }

    fn put(&self, key: &str, record: HouseRecord) {
        if let Err(e) = self.try_put(key, &record) {
            tracing::warn!(key, error = %e, "house cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_cache_get_put() {
        let cache = InMemoryHouseCache::new();
        assert!(cache.get("house:abc").is_none());

        cache.put("house:abc", json!({"name": "Gryffindor"}));

        assert_eq!(cache.get("house:abc"), Some(json!({"name": "Gryffindor"})));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_memory_cache_overwrite_is_idempotent() {
        let cache = InMemoryHouseCache::new();
        cache.put("house:abc", json!({"name": "Gryffindor"}));
        cache.put("house:abc", json!({"name": "Gryffindor"}));

        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_memory_cache_respects_capacity() {
        let cache = InMemoryHouseCache::with_capacity(2);
        cache.put("house:a", json!({}));
        cache.put("house:b", json!({}));
        cache.put("house:c", json!({}));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("house:c").is_some(), "newest entry must be kept");

        // Rewriting a present key never evicts
        cache.put("house:c", json!({"again": true}));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_memory_cache_capacity_under_concurrent_puts() {
        let cache = std::sync::Arc::new(InMemoryHouseCache::with_capacity(4));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        cache.put(&format!("house:{}-{}", t, i), json!({"t": t, "i": i}));
                        assert!(cache.len() <= 4);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn test_sqlite_cache_get_put() {
        let cache = SqliteHouseCache::new(Connection::open_in_memory().unwrap()).unwrap();
        assert!(cache.get("house:abc").is_none());

        cache.put("house:abc", json!({"_id": "abc", "name": "Ravenclaw"}));
        cache.put("house:abc", json!({"_id": "abc", "name": "Ravenclaw"}));

        assert_eq!(
            cache.get("house:abc"),
            Some(json!({"_id": "abc", "name": "Ravenclaw"}))
        );
    }

    #[test]
    fn test_sqlite_cache_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");

        {
            let cache = SqliteHouseCache::open(&path).unwrap();
            cache.put("house:xyz", json!({"name": "Hufflepuff"}));
        }

        let reopened = SqliteHouseCache::open(&path).unwrap();
        assert_eq!(reopened.get("house:xyz"), Some(json!({"name": "Hufflepuff"})));
    }
}
