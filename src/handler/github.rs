//! GitHub API proxy with a cache-aside response cache.
//!
//! The record store is an optimisation only: a failed cache read is a miss and a
//! failed cache write is skipped, so the upstream body always reaches the caller.
//! Concurrent misses for one key each fetch and overwrite the row (last writer wins).

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

use super::router::{RequestContext, GITHUB_PREFIX};
use crate::config::UpstreamConfig;
use crate::error::ApiError;
use crate::http::{self, CacheStatus};
use crate::store::{self, CacheEntry, ConfigStore, RecordStore};
use crate::upstream::Upstream;

/// Config store key holding the upstream API token
pub const GITHUB_TOKEN_KEY: &str = "GITHUB_TOKEN";

/// Serve a GitHub API read through the response cache
pub async fn proxy(
    ctx: &RequestContext<'_>,
    records: &dyn RecordStore,
    config: &dyn ConfigStore,
    upstream: &dyn Upstream,
    settings: &UpstreamConfig,
) -> Result<Response<Full<Bytes>>, ApiError> {
    let search = ctx.search();
    let cache_key = format!("{}{search}", ctx.path);

    if let Some(body) = read_cached(records, &cache_key).await {
        tracing::debug!(key = %cache_key, "cache hit");
        return Ok(http::build_proxy_response(body, CacheStatus::Hit));
    }

    let authorization = config
        .get(GITHUB_TOKEN_KEY)
        .await?
        .map(|token| format!("token {token}"))
        .unwrap_or_default();
    let endpoint = ctx.path.strip_prefix(GITHUB_PREFIX).unwrap_or(ctx.path);

    let reply = upstream
        .get(&format!("{endpoint}{search}"), &authorization)
        .await?;
    if !reply.is_success() {
        tracing::warn!(endpoint, status = reply.status, "upstream returned error status");
        return Err(ApiError::GithubStatus(reply.status));
    }

    write_cached(
        records,
        CacheEntry {
            key: cache_key,
            endpoint: endpoint.to_string(),
            data: reply.body.clone(),
            expires_at: store::now_ms() + settings.cache_ttl_ms,
        },
    )
    .await;

    Ok(http::build_proxy_response(reply.body, CacheStatus::Miss))
}

/// Live cached body, or `None` on miss or store failure
async fn read_cached(records: &dyn RecordStore, key: &str) -> Option<String> {
    match records.cached_response(key, store::now_ms()).await {
        Ok(hit) => hit,
        Err(e) => {
            tracing::warn!(key, error = %e, "cache read failed, fetching upstream");
            None
        }
    }
}

/// Store a fetched body; failures are logged and dropped
async fn write_cached(records: &dyn RecordStore, entry: CacheEntry) {
    let key = entry.key.clone();
    if let Err(e) = records.put_cached_response(entry).await {
        tracing::warn!(key = %key, error = %e, "cache write failed");
    }
}
