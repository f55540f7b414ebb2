//! SQLite-backed record store.
//!
//! Statements run on tokio's blocking pool against a single mutex-guarded connection.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{now_ms, AnalyticsRow, CacheEntry, FeatureFlag, RecordStore, StoreError};

/// Schema for the cache, flag and analytics tables.
const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS github_cache (
    id TEXT PRIMARY KEY,
    endpoint TEXT NOT NULL,
    data TEXT NOT NULL,
    expires_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_github_cache_expires
    ON github_cache(expires_at);

CREATE TABLE IF NOT EXISTS feature_flags (
    key TEXT PRIMARY KEY,
    enabled INTEGER NOT NULL DEFAULT 0,
    config TEXT
);

CREATE TABLE IF NOT EXISTS analytics_cache (
    metric_key TEXT PRIMARY KEY,
    metric_value TEXT NOT NULL,
    metric_type TEXT NOT NULL DEFAULT 'general',
    cached_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_analytics_cached_at
    ON analytics_cache(cached_at);
";

const SELECT_METRICS: &str =
    "SELECT metric_key, metric_value, metric_type, cached_at FROM analytics_cache";

pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// Open or create the database file, creating parent directories as needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::from_connection(Connection::open(path)?)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        tracing::debug!("record store schema ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` with the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&guard)
        })
        .await?
    }

    /// Flags are managed out of band; tests seed them directly.
    #[cfg(test)]
    pub async fn put_flag(
        &self,
        key: &str,
        enabled: bool,
        config: Option<&str>,
    ) -> Result<(), StoreError> {
        let key = key.to_string();
        let config = config.map(ToString::to_string);
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO feature_flags (key, enabled, config) VALUES (?1, ?2, ?3)",
                params![key, i64::from(enabled), config],
            )?;
            Ok(())
        })
        .await
    }
}

fn analytics_row(row: &Row<'_>) -> rusqlite::Result<AnalyticsRow> {
    Ok(AnalyticsRow {
        metric_key: row.get(0)?,
        metric_value: row.get(1)?,
        metric_type: row.get(2)?,
        cached_at: row.get(3)?,
    })
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn cached_response(&self, key: &str, now_ms: i64) -> Result<Option<String>, StoreError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let data = conn
                .query_row(
                    "SELECT data FROM github_cache WHERE id = ?1 AND expires_at > ?2",
                    params![key, now_ms],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(data)
        })
        .await
    }

    async fn put_cached_response(&self, entry: CacheEntry) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO github_cache (id, endpoint, data, expires_at) VALUES (?1, ?2, ?3, ?4)",
                params![entry.key, entry.endpoint, entry.data, entry.expires_at],
            )?;
            Ok(())
        })
        .await
    }

    async fn enabled_flags(&self) -> Result<Vec<FeatureFlag>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT key, enabled, config FROM feature_flags WHERE enabled = 1")?;
            let flags = stmt
                .query_map([], |row| {
                    Ok(FeatureFlag {
                        key: row.get(0)?,
                        enabled: row.get::<_, i64>(1)? == 1,
                        config: row.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(flags)
        })
        .await
    }

    async fn put_metric(
        &self,
        key: &str,
        value_json: &str,
        metric_type: &str,
    ) -> Result<(), StoreError> {
        let key = key.to_string();
        let value_json = value_json.to_string();
        let metric_type = metric_type.to_string();
        let cached_at = now_ms();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO analytics_cache (metric_key, metric_value, metric_type, cached_at) VALUES (?1, ?2, ?3, ?4)",
                params![key, value_json, metric_type, cached_at],
            )?;
            Ok(())
        })
        .await
    }

    async fn metrics_by_key(&self, key: &str) -> Result<Vec<AnalyticsRow>, StoreError> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_METRICS} WHERE metric_key = ?1"))?;
            let rows = stmt
                .query_map(params![key], analytics_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn recent_metrics(&self, limit: usize) -> Result<Vec<AnalyticsRow>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            // Replaced rows get a fresh rowid, which breaks ties within one millisecond
            let mut stmt = conn.prepare(&format!(
                "{SELECT_METRICS} ORDER BY cached_at DESC, rowid DESC LIMIT ?1"
            ))?;
            let rows = stmt
                .query_map(params![limit], analytics_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, data: &str, expires_at: i64) -> CacheEntry {
        CacheEntry {
            key: key.to_string(),
            endpoint: "/users/octocat".to_string(),
            data: data.to_string(),
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_cache_expiry_is_strict() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store
            .put_cached_response(entry("/api/github/users/octocat", "{}", 1_000))
            .await
            .unwrap();

        let key = "/api/github/users/octocat";
        assert_eq!(
            store.cached_response(key, 999).await.unwrap().as_deref(),
            Some("{}")
        );
        assert!(store.cached_response(key, 1_000).await.unwrap().is_none());
        assert!(store.cached_response(key, 5_000).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_upsert_replaces_row() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let key = "/api/github/repos/a/b?page=2";
        store.put_cached_response(entry(key, "old", 10)).await.unwrap();
        store.put_cached_response(entry(key, "new", 20_000)).await.unwrap();

        assert_eq!(
            store.cached_response(key, 15).await.unwrap().as_deref(),
            Some("new")
        );
        let count: i64 = store
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM github_cache", [], |r| r.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_only_enabled_flags_returned() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store
            .put_flag("new_nav", true, Some(r#"{"variant":"b"}"#))
            .await
            .unwrap();
        store.put_flag("dark_mode", true, None).await.unwrap();
        store.put_flag("legacy_footer", false, None).await.unwrap();

        let mut flags = store.enabled_flags().await.unwrap();
        flags.sort_by(|a, b| a.key.cmp(&b.key));
        let keys: Vec<_> = flags.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["dark_mode", "new_nav"]);
        assert!(flags.iter().all(|f| f.enabled));
        assert_eq!(flags[1].config.as_deref(), Some(r#"{"variant":"b"}"#));
    }

    #[tokio::test]
    async fn test_metric_upsert_and_lookup() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        store.put_metric("visits", "41", "general").await.unwrap();
        store.put_metric("visits", "42", "counter").await.unwrap();

        let rows = store.metrics_by_key("visits").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].metric_value, "42");
        assert_eq!(rows[0].metric_type, "counter");
        assert!(rows[0].cached_at > 0);
        assert!(store.metrics_by_key("absent").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_metrics_newest_first_with_limit() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        for i in 0..5 {
            store
                .put_metric(&format!("m{i}"), &i.to_string(), "general")
                .await
                .unwrap();
        }
        // Rewriting m1 makes it the newest row
        store.put_metric("m1", "100", "general").await.unwrap();

        let rows = store.recent_metrics(3).await.unwrap();
        let keys: Vec<_> = rows.iter().map(|r| r.metric_key.as_str()).collect();
        assert_eq!(keys, vec!["m1", "m4", "m3"]);
    }

    #[tokio::test]
    async fn test_open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("edge.db");
        let store = SqliteRecordStore::open(&path).unwrap();
        store.put_metric("k", "1", "general").await.unwrap();
        assert!(path.exists());
    }
}
