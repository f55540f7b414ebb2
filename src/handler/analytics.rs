//! Analytics metric writes and reads

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Method, Response, StatusCode};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use super::router::{BoxError, RequestContext};
use crate::error::ApiError;
use crate::http;
use crate::store::RecordStore;

/// Rows returned when no metric key is given
const RECENT_LIMIT: usize = 100;
const DEFAULT_METRIC_TYPE: &str = "general";

/// POST body: `{key, value, type?}`
#[derive(Debug, Deserialize)]
struct MetricWrite {
    key: String,
    /// Required; an explicit `null` is a valid value
    #[serde(deserialize_with = "present")]
    value: Value,
    #[serde(rename = "type", default)]
    metric_type: Option<String>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
    Value::deserialize(deserializer)
}

/// POST stores a metric, any other method reads metrics
pub async fn handle<B>(
    ctx: &RequestContext<'_>,
    body: B,
    records: &dyn RecordStore,
    max_body_size: u64,
) -> Result<Response<Full<Bytes>>, ApiError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    if *ctx.method == Method::POST {
        check_declared_length(ctx.content_length, max_body_size)?;
        store_metric(body, records, max_body_size).await
    } else {
        fetch_metrics(ctx, records).await
    }
}

/// Reject a declared `Content-Length` above the limit before reading the body
fn check_declared_length(
    content_length: Option<&str>,
    max_body_size: u64,
) -> Result<(), ApiError> {
    let Some(raw) = content_length else {
        return Ok(());
    };
    match raw.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            tracing::warn!(size, max_body_size, "declared body too large");
            Err(ApiError::PayloadTooLarge)
        }
        Ok(_) => Ok(()),
        Err(_) => {
            // The streamed limit still applies
            tracing::warn!(content_length = raw, "invalid Content-Length header");
            Ok(())
        }
    }
}

async fn store_metric<B>(
    body: B,
    records: &dyn RecordStore,
    max_body_size: u64,
) -> Result<Response<Full<Bytes>>, ApiError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let raw = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            return Err(ApiError::PayloadTooLarge);
        }
        Err(e) => return Err(ApiError::StoreMetric(format!("body read: {e}"))),
    };

    let metric: MetricWrite = serde_json::from_slice(&raw)
        .map_err(|e| ApiError::StoreMetric(format!("invalid body: {e}")))?;
    let metric_type = metric
        .metric_type
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_METRIC_TYPE);
    let value_json = metric.value.to_string();

    records
        .put_metric(&metric.key, &value_json, metric_type)
        .await
        .map_err(|e| ApiError::StoreMetric(e.to_string()))?;

    tracing::debug!(key = %metric.key, metric_type, "metric stored");
    Ok(http::json_response(StatusCode::OK, &json!({ "success": true })))
}

async fn fetch_metrics(
    ctx: &RequestContext<'_>,
    records: &dyn RecordStore,
) -> Result<Response<Full<Bytes>>, ApiError> {
    let rows = match ctx.query_param("metric").filter(|k| !k.is_empty()) {
        Some(key) => records.metrics_by_key(&key).await,
        None => records.recent_metrics(RECENT_LIMIT).await,
    }
    .map_err(ApiError::FetchAnalytics)?;

    Ok(http::json_response(StatusCode::OK, &rows))
}
