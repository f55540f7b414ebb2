use clap::Parser;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

mod config;
mod error;
mod handler;
mod http;
mod logger;
mod server;
mod store;
mod upstream;

#[cfg(test)]
mod testing;

/// Edge request router: GitHub API proxy with response caching, assets, flags,
/// analytics and configuration endpoints
#[derive(Debug, Parser)]
#[command(name = "edge-router", version, about)]
struct Args {
    /// Configuration file path, extension optional
    #[arg(short, long, default_value = "config")]
    config: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let cfg = config::Config::load_from(&args.config)?;
    let _log_guard = logger::init(&cfg.logging)?;

    // Build the Tokio runtime, thread count from `server.workers`
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;

    let stores = store::Stores::open(&cfg.stores)?;
    let upstream = Arc::new(upstream::GithubClient::new(&cfg.upstream)?);
    let listener = server::create_reusable_listener(addr)?;
    logger::log_server_start(&addr, &cfg);

    let signals = Arc::new(server::signal::SignalHandler::new());
    server::signal::start_signal_handler(Arc::clone(&signals))?;

    let state = Arc::new(config::AppState::new(cfg, stores, upstream));
    server::start_server_loop(
        listener,
        state,
        Arc::new(AtomicUsize::new(0)),
        Arc::clone(&signals.shutdown),
    )
    .await;

    Ok(())
}
