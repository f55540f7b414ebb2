//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: preflight short-circuit, route matching,
//! and the single boundary where handler failures become responses.

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{CONTENT_LENGTH, IF_NONE_MATCH};
use hyper::{Method, Request, Response, StatusCode};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;

use super::{analytics, app_config, assets, features, github};
use crate::config::AppState;
use crate::error::ApiError;
use crate::http::{self, cors};
use crate::store;

pub const HEALTH_PATH: &str = "/api/health";
pub const GITHUB_PREFIX: &str = "/api/github";
pub const ASSETS_PREFIX: &str = "/api/assets";
pub const FEATURES_PATH: &str = "/api/features";
pub const ANALYTICS_PREFIX: &str = "/api/analytics";
pub const CONFIG_PATH: &str = "/api/config";

/// Version reported by the liveness probe
const HEALTH_VERSION: &str = "1.0.0";

/// Boxed error accepted from request bodies
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub if_none_match: Option<&'a str>,
    /// Raw `Content-Length` header, if any
    pub content_length: Option<&'a str>,
}

impl RequestContext<'_> {
    /// Query string with its leading `?`, or empty when there is none
    pub fn search(&self) -> String {
        match self.query {
            Some(q) if !q.is_empty() => format!("?{q}"),
            _ => String::new(),
        }
    }

    /// First value of a query parameter, percent-decoded
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

/// Main entry point for HTTP request handling
///
/// Never fails: every outcome, including handler errors, is a response carrying the
/// CORS headers.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let mut response = match route_request(req, &state).await {
        Ok(response) => response,
        Err(err) => error_response(&err),
    };
    cors::apply(response.headers_mut());
    Ok(response)
}

/// Convert a handler failure into its JSON response
fn error_response(err: &ApiError) -> Response<Full<Bytes>> {
    if err.is_server_error() {
        tracing::error!(error = %err, "request failed");
    } else {
        tracing::debug!(error = %err, "request rejected");
    }
    http::json_response(err.status_code(), &err.body())
}

async fn route_request<B>(
    req: Request<B>,
    state: &Arc<AppState>,
) -> Result<Response<Full<Bytes>>, ApiError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    // 1. Preflight: CORS headers only, no store access
    if req.method() == Method::OPTIONS {
        return Ok(http::build_empty_response(StatusCode::OK));
    }

    let (parts, body) = req.into_parts();
    let ctx = RequestContext {
        method: &parts.method,
        path: parts.uri.path(),
        query: parts.uri.query(),
        if_none_match: parts
            .headers
            .get(IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok()),
        content_length: parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok()),
    };
    let stores = &state.stores;

    // 2. Dispatch in priority order
    match ctx.path {
        HEALTH_PATH => Ok(health_response()),
        p if p.starts_with(GITHUB_PREFIX) => {
            github::proxy(
                &ctx,
                stores.records.as_ref(),
                stores.config.as_ref(),
                state.upstream.as_ref(),
                &state.config.upstream,
            )
            .await
        }
        p if p.starts_with(ASSETS_PREFIX) => assets::serve(&ctx, stores.blobs.as_ref()).await,
        FEATURES_PATH => features::list(stores.records.as_ref()).await,
        p if p.starts_with(ANALYTICS_PREFIX) => {
            analytics::handle(
                &ctx,
                body,
                stores.records.as_ref(),
                state.config.http.max_body_size,
            )
            .await
        }
        CONFIG_PATH => app_config::snapshot(stores.config.as_ref()).await,
        _ => Ok(http::json_response(
            StatusCode::NOT_FOUND,
            &json!({ "error": "Not Found" }),
        )),
    }
}

/// Liveness probe, independent of every store
fn health_response() -> Response<Full<Bytes>> {
    http::json_response(
        StatusCode::OK,
        &json!({
            "status": "healthy",
            "timestamp": store::now_ms(),
            "version": HEALTH_VERSION,
        }),
    )
}
