// Server loop module
// Accepts connections until the shutdown future resolves

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Accept and serve connections until `shutdown` yields a signal name
///
/// Connections are spawned with `spawn_local`, so this must run inside a
/// `LocalSet`. Connections still open when the loop returns are abandoned
/// once the `LocalSet` is dropped.
pub async fn run_server_loop<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F)
where
    F: Future<Output = &'static str>,
{
    let active_connections = Arc::new(AtomicUsize::new(0));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            signal = &mut shutdown => {
                logger::log_shutdown(signal);
                break;
            }
        }
    }

    let in_flight = active_connections.load(Ordering::SeqCst);
    if in_flight > 0 {
        logger::log_info(&format!("{in_flight} connection(s) still open at shutdown"));
    }
}
