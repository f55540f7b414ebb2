//! Public configuration snapshot

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::http;
use crate::store::{ConfigStore, StoreError};

const API_VERSION_KEY: &str = "API_VERSION";
const FEATURE_FLAGS_KEY: &str = "feature_flags";
const ENVIRONMENT_KEY: &str = "ENVIRONMENT";

const DEFAULT_API_VERSION: &str = "1.0.0";
const DEFAULT_ENVIRONMENT: &str = "production";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigSnapshot {
    api_version: String,
    features: Value,
    environment: String,
}

/// `{apiVersion, features, environment}` with per-key defaults
pub async fn snapshot(config: &dyn ConfigStore) -> Result<Response<Full<Bytes>>, ApiError> {
    let snapshot = read_snapshot(config)
        .await
        .map_err(ApiError::Configuration)?;
    Ok(http::json_response(StatusCode::OK, &snapshot))
}

async fn read_snapshot(config: &dyn ConfigStore) -> Result<ConfigSnapshot, StoreError> {
    let api_version = config.get(API_VERSION_KEY).await?;
    let features = config.get_json(FEATURE_FLAGS_KEY).await?;
    let environment = config.get(ENVIRONMENT_KEY).await?;

    Ok(ConfigSnapshot {
        api_version: non_empty_or(api_version, DEFAULT_API_VERSION),
        features: features
            .filter(is_set)
            .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
        environment: non_empty_or(environment, DEFAULT_ENVIRONMENT),
    })
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Null, `false`, zero and the empty string count as unset
fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
