//! Store layer
//!
//! Three independent stores back every handler:
//! - [`RecordStore`]: rows for the upstream response cache, feature flags and analytics
//! - [`BlobStore`]: binary assets with HTTP content metadata
//! - [`ConfigStore`]: small string/JSON configuration values
//!
//! Handlers receive these as trait objects through [`Stores`], never through globals,
//! so each one can be exercised against the in-memory implementations.

pub mod blob;
pub mod kv;
pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use hyper::body::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{StoreBackend, StoresConfig};

/// Store access failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("connection lock poisoned")]
    Poisoned,
}

/// One cached upstream response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Request path plus query string
    pub key: String,
    /// Upstream path the body was fetched from
    pub endpoint: String,
    pub data: String,
    /// Absolute expiry, epoch milliseconds
    pub expires_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureFlag {
    pub key: String,
    pub enabled: bool,
    /// Raw JSON text, `None` when the column is NULL
    pub config: Option<String>,
}

/// Analytics row exactly as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsRow {
    pub metric_key: String,
    /// JSON-encoded metric value
    pub metric_value: String,
    pub metric_type: String,
    /// Write time assigned by the store, epoch milliseconds
    pub cached_at: i64,
}

/// HTTP content metadata attached to a blob
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HttpMetadata {
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content_encoding: Option<String>,
    #[serde(default)]
    pub content_language: Option<String>,
    #[serde(default)]
    pub content_disposition: Option<String>,
}

impl HttpMetadata {
    /// Fields set in `other` replace ours
    #[must_use]
    pub fn merged_with(self, other: Self) -> Self {
        Self {
            content_type: other.content_type.or(self.content_type),
            content_encoding: other.content_encoding.or(self.content_encoding),
            content_language: other.content_language.or(self.content_language),
            content_disposition: other.content_disposition.or(self.content_disposition),
        }
    }

    /// Header name/value pairs for the fields that are set
    pub fn headers(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        [
            ("Content-Type", self.content_type.as_deref()),
            ("Content-Encoding", self.content_encoding.as_deref()),
            ("Content-Language", self.content_language.as_deref()),
            ("Content-Disposition", self.content_disposition.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
    }
}

#[derive(Debug, Clone)]
pub struct BlobObject {
    pub body: Bytes,
    pub metadata: HttpMetadata,
}

/// Durable, queryable rows
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Cached body for `key` whose expiry is strictly after `now_ms`
    async fn cached_response(&self, key: &str, now_ms: i64) -> Result<Option<String>, StoreError>;

    /// Insert or replace the cache row for `entry.key`
    async fn put_cached_response(&self, entry: CacheEntry) -> Result<(), StoreError>;

    async fn enabled_flags(&self) -> Result<Vec<FeatureFlag>, StoreError>;

    /// Insert or replace a metric; the store stamps `cached_at`
    async fn put_metric(
        &self,
        key: &str,
        value_json: &str,
        metric_type: &str,
    ) -> Result<(), StoreError>;

    async fn metrics_by_key(&self, key: &str) -> Result<Vec<AnalyticsRow>, StoreError>;

    /// Newest rows first
    async fn recent_metrics(&self, limit: usize) -> Result<Vec<AnalyticsRow>, StoreError>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<BlobObject>, StoreError>;
}

#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Value for `key` decoded as JSON
    async fn get_json(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

/// Store handles passed to every handler
#[derive(Clone)]
pub struct Stores {
    pub records: Arc<dyn RecordStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub config: Arc<dyn ConfigStore>,
}

impl Stores {
    /// Open the stores selected by configuration
    pub fn open(cfg: &StoresConfig) -> Result<Self, StoreError> {
        match cfg.backend {
            StoreBackend::Sqlite => Ok(Self {
                records: Arc::new(sqlite::SqliteRecordStore::open(&cfg.database_path)?),
                blobs: Arc::new(blob::FsBlobStore::new(&cfg.assets_dir)),
                config: Arc::new(kv::FileConfigStore::new(&cfg.config_file)),
            }),
            StoreBackend::Memory => Ok(Self::in_memory()),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            records: Arc::new(memory::MemoryRecordStore::new()),
            blobs: Arc::new(memory::MemoryBlobStore::new()),
            config: Arc::new(memory::MemoryConfigStore::new()),
        }
    }
}

/// Current time in epoch milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
