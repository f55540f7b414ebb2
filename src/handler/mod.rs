//! Request handler module
//!
//! Routing dispatch plus one handler per endpoint family. Handlers receive the stores
//! they need as trait objects and return `Result<Response, ApiError>`.

pub mod analytics;
pub mod app_config;
pub mod assets;
pub mod features;
pub mod github;
pub mod router;

// Re-export main entry point
pub use router::handle_request;
