//! Feature flag aggregation

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::ApiError;
use crate::http;
use crate::store::{FeatureFlag, RecordStore, StoreError};

#[derive(Debug, Serialize)]
struct FlagView {
    enabled: bool,
    config: Value,
}

/// `{<flag key>: {enabled, config}}` for every enabled flag
pub async fn list(records: &dyn RecordStore) -> Result<Response<Full<Bytes>>, ApiError> {
    let flags = records
        .enabled_flags()
        .await
        .map_err(ApiError::FeatureFlags)?;

    let mut views = BTreeMap::new();
    for flag in flags.into_iter().filter(|f| f.enabled) {
        let view = to_view(&flag).map_err(ApiError::FeatureFlags)?;
        views.insert(flag.key, view);
    }

    Ok(http::json_response(StatusCode::OK, &views))
}

fn to_view(flag: &FeatureFlag) -> Result<FlagView, StoreError> {
    let config = match flag.config.as_deref() {
        None | Some("") => Value::Object(serde_json::Map::new()),
        Some(raw) => serde_json::from_str::<Value>(raw)?,
    };
    Ok(FlagView {
        enabled: true,
        config,
    })
}
