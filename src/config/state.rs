// Application state module
// Everything a request handler may touch, shared behind an Arc

use std::sync::Arc;

use super::types::Config;
use crate::store::Stores;
use crate::upstream::Upstream;

/// Application state
pub struct AppState {
    pub config: Config,
    pub stores: Stores,
    pub upstream: Arc<dyn Upstream>,
}

impl AppState {
    pub fn new(config: Config, stores: Stores, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            config,
            stores,
            upstream,
        }
    }
}
