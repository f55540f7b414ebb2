//! Shared fixtures for handler tests.

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::HeaderMap;
use hyper::{Method, Request, Response, StatusCode};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::{
    AppState, Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig, StoreBackend,
    StoresConfig, UpstreamConfig,
};
use crate::handler;
use crate::store::{
    AnalyticsRow, BlobObject, BlobStore, CacheEntry, ConfigStore, FeatureFlag, RecordStore,
    StoreError, Stores,
};
use crate::upstream::{Upstream, UpstreamError, UpstreamResponse};

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            workers: None,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            access_log: false,
            log_file: None,
        },
        performance: PerformanceConfig {
            keep_alive_timeout: 5,
            read_timeout: 5,
            write_timeout: 5,
            max_connections: None,
        },
        http: HttpConfig {
            max_body_size: 1024,
        },
        upstream: UpstreamConfig {
            base_url: "https://api.github.com".to_string(),
            accept: "application/vnd.github.v3+json".to_string(),
            user_agent: "Leadership-Legacy-Worker".to_string(),
            cache_ttl_ms: 300_000,
        },
        stores: StoresConfig {
            backend: StoreBackend::Memory,
            database_path: String::new(),
            assets_dir: String::new(),
            config_file: String::new(),
        },
    }
}

/// Upstream fake returning a fixed reply and recording every call
pub struct FakeUpstream {
    reply: UpstreamResponse,
    delay: Duration,
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, String)>>,
}

impl FakeUpstream {
    pub fn replying(status: u16, body: &str) -> Arc<Self> {
        Self::slow(status, body, Duration::ZERO)
    }

    /// Like `replying`, but each call waits `delay` before answering
    pub fn slow(status: u16, body: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: UpstreamResponse {
                status,
                body: body.to_string(),
            },
            delay,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(path_and_query, authorization)` for each call, oldest first
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Upstream for FakeUpstream {
    async fn get(
        &self,
        path_and_query: &str,
        authorization: &str,
    ) -> Result<UpstreamResponse, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((path_and_query.to_string(), authorization.to_string()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.reply.clone())
    }
}

fn unavailable() -> StoreError {
    StoreError::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "store unavailable"))
}

/// Record store whose every operation fails
pub struct FailingRecordStore;

#[async_trait]
impl RecordStore for FailingRecordStore {
    async fn cached_response(&self, _key: &str, _now_ms: i64) -> Result<Option<String>, StoreError> {
        Err(unavailable())
    }

    async fn put_cached_response(&self, _entry: CacheEntry) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn enabled_flags(&self) -> Result<Vec<FeatureFlag>, StoreError> {
        Err(unavailable())
    }

    async fn put_metric(&self, _key: &str, _value: &str, _type: &str) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn metrics_by_key(&self, _key: &str) -> Result<Vec<AnalyticsRow>, StoreError> {
        Err(unavailable())
    }

    async fn recent_metrics(&self, _limit: usize) -> Result<Vec<AnalyticsRow>, StoreError> {
        Err(unavailable())
    }
}

pub struct FailingBlobStore;

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn get(&self, _key: &str) -> Result<Option<BlobObject>, StoreError> {
        Err(unavailable())
    }
}

pub struct FailingConfigStore;

#[async_trait]
impl ConfigStore for FailingConfigStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(unavailable())
    }
}

pub fn state_with(stores: Stores, upstream: Arc<dyn Upstream>) -> Arc<AppState> {
    Arc::new(AppState::new(test_config(), stores, upstream))
}

pub fn request(method: Method, uri: &str, body: &str) -> Request<Full<Bytes>> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Full<Bytes>> {
    request(Method::GET, uri, "")
}

/// Status, headers and collected body of a response
pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Reply {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

pub async fn into_reply(response: Response<Full<Bytes>>) -> Reply {
    let (parts, body) = response.into_parts();
    Reply {
        status: parts.status,
        headers: parts.headers,
        body: body.collect().await.unwrap().to_bytes(),
    }
}

pub async fn send(state: &Arc<AppState>, req: Request<Full<Bytes>>) -> Reply {
    let response = handler::handle_request(req, Arc::clone(state)).await.unwrap();
    into_reply(response).await
}
