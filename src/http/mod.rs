//! HTTP protocol layer module
//!
//! Response builders, CORS, `ETag` and MIME helpers shared by the handlers,
//! decoupled from routing and store access.

pub mod cache;
pub mod cors;
pub mod mime;
pub mod response;

// Re-export commonly used types
pub use response::{
    build_304_response, build_asset_response, build_empty_response, build_proxy_response,
    json_response, CacheStatus,
};
