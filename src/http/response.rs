//! HTTP response building module
//!
//! Builders for the JSON, empty and asset responses the handlers return.
//! CORS headers are added by the router, not here.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::cache::ASSET_CACHE_CONTROL;
use crate::store::HttpMetadata;

/// Value of the `X-Cache` header on proxied responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
        }
    }
}

/// Build JSON response from any serializable value
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(json) => build_json_bytes(status, Bytes::from(json)),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response body");
            build_json_bytes(
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(br#"{"error":"Internal Server Error"}"#),
            )
        }
    }
}

/// Build response from an already-serialized JSON document
pub fn build_json_bytes(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build proxied upstream body with its cache status
pub fn build_proxy_response(body: String, cache: CacheStatus) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("X-Cache", cache.as_str())
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|e| {
            log_build_error(StatusCode::OK, &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build empty response (preflight)
pub fn build_empty_response(status: StatusCode) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build asset response with stored metadata and long-lived cache headers
pub fn build_asset_response(
    data: Bytes,
    metadata: &HttpMetadata,
    etag: &str,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(StatusCode::OK);
    for (name, value) in metadata.headers() {
        builder = builder.header(name, value);
    }

    builder
        .header("ETag", etag)
        .header("Cache-Control", ASSET_CACHE_CONTROL)
        .body(Full::new(data))
        .unwrap_or_else(|e| {
            log_build_error(StatusCode::OK, &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 304 Not Modified response for an unchanged asset
pub fn build_304_response(etag: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header("ETag", etag)
        .header("Cache-Control", ASSET_CACHE_CONTROL)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error(StatusCode::NOT_MODIFIED, &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    tracing::error!(%status, %error, "failed to build response");
}
