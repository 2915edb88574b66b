//! SQLite-backed key/value cache with expiring entries.
//!
//! Raw provider responses are cached under a coordinate-derived key so a
//! repeat lookup within the TTL window never reaches the provider.

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use vane_core::{CacheConfig, CacheError, ServiceError};

/// TTL applied to weather entries: one day.
pub const WEATHER_TTL_SECS: u64 = 86400;

/// Blocking key/value store with per-entry expiry.
pub struct SqliteCacheStore {
    conn: Connection,
}

impl SqliteCacheStore {
    /// Open (or create) the cache database at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let conn =
            Connection::open(path).map_err(|e| CacheError::Backend(e.to_string()))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory cache (for testing).
    #[cfg(test)]
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn =
            Connection::open_in_memory().map_err(|e| CacheError::Backend(e.to_string()))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), CacheError> {
        self.conn
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS cache_entries (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    expires_at INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_cache_expires ON cache_entries(expires_at);
                "#,
            )
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    /// Look up a key. Expired entries are removed and reported as absent.
    pub fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let row: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT value, expires_at FROM cache_entries WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| CacheError::Backend(e.to_string()))?;

        match row {
            Some((value, expires_at)) if expires_at > Utc::now().timestamp() => Ok(Some(value)),
            Some(_) => {
                self.conn
                    .execute("DELETE FROM cache_entries WHERE key = ?1", params![key])
                    .map_err(|e| CacheError::Backend(e.to_string()))?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Store a value under a key with a TTL. Last write wins.
    pub fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let expires_at = Utc::now().timestamp() + ttl_secs as i64;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO cache_entries (key, value, expires_at) VALUES (?1, ?2, ?3)",
                params![key, value, expires_at],
            )
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(())
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn purge_expired(&self) -> Result<usize, CacheError> {
        let dropped = self
            .conn
            .execute(
                "DELETE FROM cache_entries WHERE expires_at <= ?1",
                params![Utc::now().timestamp()],
            )
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(dropped)
    }
}

/// Cloneable async facade over the blocking cache store.
///
/// Safe to use from many concurrent pipeline invocations; each call holds
/// the underlying connection only for the duration of one statement.
#[derive(Clone)]
pub struct CacheClient {
    store: Arc<Mutex<SqliteCacheStore>>,
}

impl CacheClient {
    /// Wrap an already-open store.
    pub fn new(store: SqliteCacheStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Build the cache client from configuration.
    ///
    /// A missing backing store path is a fatal configuration problem and
    /// fails here, at construction, never per request.
    pub fn from_config(config: &CacheConfig) -> Result<Self, ServiceError> {
        let path = config.db_path.as_ref().ok_or(CacheError::NotConfigured)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CacheError::Backend(e.to_string()))?;
        }
        Ok(Self::new(SqliteCacheStore::new(path)?))
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let store = self.store.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || store.lock().get(&key))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?
    }

    pub async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let store = self.store.clone();
        let key = key.to_string();
        let value = value.to_string();
        tokio::task::spawn_blocking(move || store.lock().set(&key, &value, ttl_secs))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn create_test_store() -> SqliteCacheStore {
        SqliteCacheStore::in_memory().expect("Failed to create in-memory cache")
    }

    #[test]
    fn test_set_and_get() {
        let store = create_test_store();
        store.set("weather:28.6:77.2", r#"{"temp": 90}"#, 60).unwrap();
        let value = store.get("weather:28.6:77.2").unwrap();
        assert_eq!(value.as_deref(), Some(r#"{"temp": 90}"#));
    }

    #[test]
    fn test_get_missing_key() {
        let store = create_test_store();
        assert!(store.get("weather:1.0:1.0").unwrap().is_none());
    }

    #[test]
    fn test_expired_entry_is_absent() {
        let store = create_test_store();
        store.set("k", "v", 60).unwrap();
        // Force the entry into the past.
        store
            .conn
            .execute("UPDATE cache_entries SET expires_at = 0", [])
            .unwrap();
        assert!(store.get("k").unwrap().is_none());
        // The expired row is gone, not just hidden.
        let remaining: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_set_overwrites() {
        let store = create_test_store();
        store.set("k", "first", 60).unwrap();
        store.set("k", "second", 60).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_purge_expired() {
        let store = create_test_store();
        store.set("live", "v", 60).unwrap();
        store.set("dead", "v", 60).unwrap();
        store
            .conn
            .execute("UPDATE cache_entries SET expires_at = 0 WHERE key = 'dead'", [])
            .unwrap();
        assert_eq!(store.purge_expired().unwrap(), 1);
        assert!(store.get("live").unwrap().is_some());
    }

    #[test]
    fn test_unconfigured_backend_fails_construction() {
        let config = CacheConfig {
            db_path: None,
            ttl_secs: WEATHER_TTL_SECS,
        };
        let result = CacheClient::from_config(&config);
        assert!(matches!(
            result,
            Err(ServiceError::Cache(CacheError::NotConfigured))
        ));
    }

    #[tokio::test]
    async fn test_async_facade_round_trip() {
        let client = CacheClient::new(create_test_store());
        client.set("k", "v", 60).await.unwrap();
        assert_eq!(client.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
