//! In-process stores.
//!
//! Used by the `memory` backend and as fakes in handler tests.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{
    now_ms, AnalyticsRow, BlobObject, BlobStore, CacheEntry, ConfigStore, FeatureFlag,
    RecordStore, StoreError,
};

#[derive(Default)]
struct Records {
    cache: HashMap<String, CacheEntry>,
    flags: HashMap<String, FeatureFlag>,
    /// Metric row plus the write sequence used to order equal timestamps
    metrics: HashMap<String, (AnalyticsRow, u64)>,
    next_seq: u64,
}

#[derive(Default)]
pub struct MemoryRecordStore {
    inner: RwLock<Records>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn put_flag(&self, key: &str, enabled: bool, config: Option<&str>) {
        self.inner.write().await.flags.insert(
            key.to_string(),
            FeatureFlag {
                key: key.to_string(),
                enabled,
                config: config.map(ToString::to_string),
            },
        );
    }

    /// Raw cache row, ignoring expiry
    #[cfg(test)]
    pub async fn cache_row(&self, key: &str) -> Option<CacheEntry> {
        self.inner.read().await.cache.get(key).cloned()
    }

    #[cfg(test)]
    pub async fn cache_len(&self) -> usize {
        self.inner.read().await.cache.len()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn cached_response(&self, key: &str, now_ms: i64) -> Result<Option<String>, StoreError> {
        let records = self.inner.read().await;
        Ok(records
            .cache
            .get(key)
            .filter(|entry| entry.expires_at > now_ms)
            .map(|entry| entry.data.clone()))
    }

    async fn put_cached_response(&self, entry: CacheEntry) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .cache
            .insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn enabled_flags(&self) -> Result<Vec<FeatureFlag>, StoreError> {
        let records = self.inner.read().await;
        Ok(records
            .flags
            .values()
            .filter(|flag| flag.enabled)
            .cloned()
            .collect())
    }

    async fn put_metric(
        &self,
        key: &str,
        value_json: &str,
        metric_type: &str,
    ) -> Result<(), StoreError> {
        let mut records = self.inner.write().await;
        let seq = records.next_seq;
        records.next_seq += 1;
        records.metrics.insert(
            key.to_string(),
            (
                AnalyticsRow {
                    metric_key: key.to_string(),
                    metric_value: value_json.to_string(),
                    metric_type: metric_type.to_string(),
                    cached_at: now_ms(),
                },
                seq,
            ),
        );
        Ok(())
    }

    async fn metrics_by_key(&self, key: &str) -> Result<Vec<AnalyticsRow>, StoreError> {
        let records = self.inner.read().await;
        Ok(records
            .metrics
            .get(key)
            .map(|(row, _)| vec![row.clone()])
            .unwrap_or_default())
    }

    async fn recent_metrics(&self, limit: usize) -> Result<Vec<AnalyticsRow>, StoreError> {
        let records = self.inner.read().await;
        let mut rows: Vec<_> = records.metrics.values().collect();
        rows.sort_by(|(a, a_seq), (b, b_seq)| {
            b.cached_at.cmp(&a.cached_at).then(b_seq.cmp(a_seq))
        });
        Ok(rows
            .into_iter()
            .take(limit)
            .map(|(row, _)| row.clone())
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, BlobObject>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn insert(&self, key: &str, object: BlobObject) {
        self.objects.write().await.insert(key.to_string(), object);
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<BlobObject>, StoreError> {
        Ok(self.objects.read().await.get(key).cloned())
    }
}

#[derive(Default)]
pub struct MemoryConfigStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn set(&self, key: &str, value: &str) {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.read().await.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_respects_expiry() {
        let store = MemoryRecordStore::new();
        store
            .put_cached_response(CacheEntry {
                key: "k".to_string(),
                endpoint: "/k".to_string(),
                data: "body".to_string(),
                expires_at: 100,
            })
            .await
            .unwrap();

        assert_eq!(
            store.cached_response("k", 99).await.unwrap().as_deref(),
            Some("body")
        );
        assert!(store.cached_response("k", 100).await.unwrap().is_none());
        assert_eq!(store.cache_len().await, 1);
    }

    #[tokio::test]
    async fn test_recent_metrics_order() {
        let store = MemoryRecordStore::new();
        store.put_metric("a", "1", "general").await.unwrap();
        store.put_metric("b", "2", "general").await.unwrap();
        store.put_metric("a", "3", "general").await.unwrap();

        let rows = store.recent_metrics(100).await.unwrap();
        let keys: Vec<_> = rows.iter().map(|r| r.metric_key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(rows[0].metric_value, "3");
    }
}
