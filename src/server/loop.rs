// Server loop module
// Accepts connections until shutdown is requested

use hyper_util::server::graceful::GracefulShutdown;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::connection::{accept_connection, connection_timeout};
use crate::config::AppState;
use crate::logger;

/// Accept connections until `shutdown` is notified, then drain.
///
/// After the signal the listener is closed and every open connection is asked to finish
/// its current request. Returns once all have closed, or after the connection timeout.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    shutdown: Arc<Notify>,
) {
    let graceful = GracefulShutdown::new();

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(
                            stream,
                            peer_addr,
                            &state,
                            &active_connections,
                            graceful.watcher(),
                        );
                    }
                    Err(e) => logger::log_accept_error(&e),
                }
            }

            () = shutdown.notified() => break,
        }
    }

    drop(listener);
    logger::log_shutdown(active_connections.load(Ordering::SeqCst));

    let drain_timeout = connection_timeout(&state.config.performance);
    match tokio::time::timeout(drain_timeout, graceful.shutdown()).await {
        Ok(()) => logger::log_drained(),
        Err(_) => logger::log_drain_timeout(
            active_connections.load(Ordering::SeqCst),
            drain_timeout.as_secs(),
        ),
    }
}
