//! Logger module
//!
//! Sets up the `tracing` subscriber and provides named helpers for:
//! - Server lifecycle logging
//! - Access logging
//! - Connection errors and warnings

mod format;

pub use format::AccessLogEntry;

use std::net::SocketAddr;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Config, LoggingConfig};

/// Target used for access log events, e.g. `RUST_LOG=access=off`
pub const ACCESS_TARGET: &str = "access";

/// Initialize the global subscriber
///
/// `RUST_LOG` wins over `logging.level`. With `logging.log_file` set, output goes to that
/// file through a non-blocking writer; keep the returned guard alive until exit so
/// buffered lines are flushed.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)?,
    };

    match config.log_file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let dir = dir.unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)?;
            let file_name = path
                .file_name()
                .ok_or_else(|| format!("invalid log file path: {}", path.display()))?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .try_init()?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .try_init()?;
            Ok(None)
        }
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    tracing::info!(
        %addr,
        workers = ?config.server.workers,
        max_connections = ?config.performance.max_connections,
        max_body_size = config.http.max_body_size,
        backend = ?config.stores.backend,
        upstream = %config.upstream.base_url,
        "edge router listening on http://{addr}"
    );
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    tracing::debug!(%peer_addr, "connection accepted");
}

pub fn log_connection_rejected(active: usize, max_connections: u64) {
    tracing::warn!(active, max_connections, "max connections reached, connection rejected");
}

pub fn log_connection_timeout(peer_addr: &SocketAddr, secs: u64) {
    tracing::warn!(%peer_addr, secs, "connection timed out");
}

pub fn log_connection_error(err: &impl std::fmt::Display) {
    tracing::warn!(error = %err, "failed to serve connection");
}

pub fn log_accept_error(err: &std::io::Error) {
    tracing::error!(error = %err, "failed to accept connection");
}

/// Emit one access log line with its fields attached
pub fn log_access(entry: &AccessLogEntry) {
    tracing::info!(
        target: ACCESS_TARGET,
        remote_addr = %entry.remote_addr,
        method = %entry.method,
        path = %entry.path,
        status = entry.status,
        body_bytes = entry.body_bytes,
        request_time_us = entry.request_time_us,
        "{}",
        entry.format_combined()
    );
}

pub fn log_shutdown_requested(signal: &str) {
    tracing::info!(signal, "shutdown requested, no longer accepting connections");
}

pub fn log_shutdown(active: usize) {
    tracing::info!(active, "listener closed, draining connections");
}

pub fn log_drained() {
    tracing::info!("all connections drained, server stopped");
}

pub fn log_drain_timeout(active: usize, secs: u64) {
    tracing::warn!(active, secs, "drain timed out, dropping remaining connections");
}
