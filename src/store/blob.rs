//! Filesystem blob store.
//!
//! Objects live under a root directory at their key. Metadata comes from the key's
//! extension, optionally overridden by a `<key>.meta.json` sidecar.

use async_trait::async_trait;
use hyper::body::Bytes;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use super::{BlobObject, BlobStore, HttpMetadata, StoreError};
use crate::http::mime;

const SIDECAR_SUFFIX: &str = ".meta.json";

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path for `key` inside the root, `None` if the key could escape it
    fn object_path(&self, key: &str) -> Option<PathBuf> {
        if key.ends_with(SIDECAR_SUFFIX) {
            return None;
        }
        let relative = Path::new(key);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

async fn read_sidecar(path: &Path) -> Result<Option<HttpMetadata>, StoreError> {
    let mut sidecar = path.as_os_str().to_owned();
    sidecar.push(SIDECAR_SUFFIX);
    match fs::read(PathBuf::from(sidecar)).await {
        Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, key: &str) -> Result<Option<BlobObject>, StoreError> {
        let Some(path) = self.object_path(key) else {
            tracing::debug!(key, "rejected asset key");
            return Ok(None);
        };

        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let body = fs::read(&path).await?;
        let mut metadata = HttpMetadata {
            content_type: Some(mime::content_type_for_key(key).to_string()),
            ..HttpMetadata::default()
        };
        if let Some(overrides) = read_sidecar(&path).await? {
            metadata = metadata.merged_with(overrides);
        }

        Ok(Some(BlobObject {
            body: Bytes::from(body),
            metadata,
        }))
    }
}
