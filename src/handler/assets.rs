//! Asset serving from the blob store

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

use super::router::RequestContext;
use crate::error::ApiError;
use crate::http::{self, cache};
use crate::store::BlobStore;

const KEY_PREFIX: &str = "/api/assets/";

/// Serve `/api/assets/<key>` with its stored content metadata
pub async fn serve(
    ctx: &RequestContext<'_>,
    blobs: &dyn BlobStore,
) -> Result<Response<Full<Bytes>>, ApiError> {
    let key = ctx.path.strip_prefix(KEY_PREFIX).unwrap_or("");
    if key.is_empty() {
        return Err(ApiError::AssetKeyRequired);
    }

    let object = blobs
        .get(key)
        .await
        .map_err(ApiError::AssetFetch)?
        .ok_or(ApiError::AssetNotFound)?;

    let etag = cache::generate_etag(&object.body);
    if cache::check_etag_match(ctx.if_none_match, &etag) {
        tracing::debug!(key, "asset not modified");
        return Ok(http::build_304_response(&etag));
    }

    Ok(http::build_asset_response(object.body, &object.metadata, &etag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryBlobStore;
    use crate::store::{BlobObject, HttpMetadata, Stores};
    use crate::testing::{self, FailingBlobStore, FakeUpstream};
    use hyper::header::{HeaderValue, IF_NONE_MATCH};
    use hyper::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    async fn state_with_logo() -> Arc<crate::config::AppState> {
        let blobs = Arc::new(MemoryBlobStore::new());
        blobs
            .insert(
                "brand/logo.png",
                BlobObject {
                    body: Bytes::from_static(b"\x89PNG logo"),
                    metadata: HttpMetadata {
                        content_type: Some("image/png".to_string()),
                        content_disposition: Some("inline".to_string()),
                        ..HttpMetadata::default()
                    },
                },
            )
            .await;
        testing::state_with(
            Stores {
                blobs,
                ..Stores::in_memory()
            },
            FakeUpstream::replying(200, "{}"),
        )
    }

    #[tokio::test]
    async fn test_no_key_is_400() {
        let state = state_with_logo().await;
        for uri in ["/api/assets", "/api/assets/", "/api/assetsfoo"] {
            let reply = testing::send(&state, testing::get(uri)).await;
            assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(reply.json(), json!({"error": "Asset key required"}));
        }
    }

    #[tokio::test]
    async fn test_missing_asset_is_404() {
        let state = state_with_logo().await;
        let reply = testing::send(&state, testing::get("/api/assets/missing-key")).await;
        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert_eq!(reply.json(), json!({"error": "Asset not found"}));
    }

    #[tokio::test]
    async fn test_found_asset_carries_metadata_and_cache_headers() {
        let state = state_with_logo().await;
        let reply = testing::send(&state, testing::get("/api/assets/brand/logo.png")).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body.as_ref(), b"\x89PNG logo");
        assert_eq!(reply.headers["Content-Type"], "image/png");
        assert_eq!(reply.headers["Content-Disposition"], "inline");
        assert_eq!(reply.headers["Cache-Control"], "public, max-age=31536000");
        assert_eq!(reply.headers["Access-Control-Allow-Origin"], "*");
        assert_eq!(
            reply.headers["ETag"],
            cache::generate_etag(b"\x89PNG logo").as_str()
        );
    }

    #[tokio::test]
    async fn test_matching_etag_is_304() {
        let state = state_with_logo().await;
        let etag = cache::generate_etag(b"\x89PNG logo");
        let mut req = testing::get("/api/assets/brand/logo.png");
        req.headers_mut()
            .insert(IF_NONE_MATCH, HeaderValue::from_str(&etag).unwrap());

        let reply = testing::send(&state, req).await;
        assert_eq!(reply.status, StatusCode::NOT_MODIFIED);
        assert!(reply.body.is_empty());
        assert_eq!(reply.headers["Cache-Control"], "public, max-age=31536000");
        assert_eq!(reply.headers["Access-Control-Allow-Origin"], "*");
    }

    #[tokio::test]
    async fn test_stale_etag_returns_body() {
        let state = state_with_logo().await;
        let mut req = testing::get("/api/assets/brand/logo.png");
        req.headers_mut()
            .insert(IF_NONE_MATCH, HeaderValue::from_static("\"0-0\""));

        let reply = testing::send(&state, req).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body.as_ref(), b"\x89PNG logo");
    }

    #[tokio::test]
    async fn test_store_failure_is_500() {
        let state = testing::state_with(
            Stores {
                blobs: Arc::new(FailingBlobStore),
                ..Stores::in_memory()
            },
            FakeUpstream::replying(200, "{}"),
        );
        let reply = testing::send(&state, testing::get("/api/assets/logo.png")).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(reply.json(), json!({"error": "Failed to fetch asset"}));
    }
}
