//! TOML-file config store.
//!
//! The file is re-read on every lookup so edits made out of band are visible
//! without a restart. A missing file is an empty store.
//!
//! ```toml
//! API_VERSION = "2.1.0"
//! ENVIRONMENT = "staging"
//! GITHUB_TOKEN = "ghp_..."
//! feature_flags = '{"beta": true}'
//! ```
//!
//! String values are returned verbatim; any other value is returned as JSON text.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::{ConfigStore, StoreError};

pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<Option<toml::Table>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(Some(toml::from_str::<toml::Table>(&raw)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let Some(table) = self.load().await? else {
            return Ok(None);
        };
        match table.get(key) {
            None => Ok(None),
            Some(toml::Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Ok(Some(serde_json::to_string(other)?)),
        }
    }
}
