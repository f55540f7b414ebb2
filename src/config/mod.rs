// Configuration module entry point
// Manages application configuration and the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{
    Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig, StoreBackend,
    StoresConfig, UpstreamConfig,
};

/// Environment variable prefix, e.g. `EDGE_SERVER__PORT=9000`
const ENV_PREFIX: &str = "EDGE";

impl Config {
    /// Load configuration from `config_path`, given without extension
    ///
    /// The `config` crate picks the format from whichever extension exists, so the CLI
    /// default `config` finds `config.toml`. A missing file leaves defaults and env.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8787)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.max_body_size", 1_048_576)? // 1MB
            .set_default("upstream.base_url", "https://api.github.com")?
            .set_default("upstream.accept", "application/vnd.github.v3+json")?
            .set_default("upstream.user_agent", "Leadership-Legacy-Worker")?
            .set_default("upstream.cache_ttl_ms", 300_000)? // 5 minutes
            .set_default("stores.backend", "sqlite")?
            .set_default("stores.database_path", "data/edge.db")?
            .set_default("stores.assets_dir", "data/assets")?
            .set_default("stores.config_file", "data/config.toml")?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
