//! Server lifecycle: bind, serve until shutdown, stop the monitor.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use pulse::{Monitor, MonitorConfig, PulseError};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::api::build_router;

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory served at `/`.
    pub ui_dir: PathBuf,
    /// Series sizing and cadence.
    pub monitor: MonitorConfig,
}

/// Fatal server errors. Any of these ends the process.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that was requested.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The accept loop failed.
    #[error("server failed: {0}")]
    Serve(#[source] std::io::Error),

    /// The monitor could not be started.
    #[error(transparent)]
    Monitor(#[from] PulseError),
}

/// Binds the listening socket.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address is unavailable or invalid.
pub async fn bind(addr: &str) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Starts the monitor and serves HTTP on `listener` until `shutdown` resolves.
///
/// After the listener stops, every broadcast session and the sampler are
/// stopped and joined before this returns.
///
/// # Errors
///
/// Returns [`ServerError::Monitor`] if the monitor configuration is invalid
/// and [`ServerError::Serve`] if the accept loop fails.
pub async fn serve<F>(
    listener: TcpListener,
    config: ServerConfig,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let monitor = Arc::new(Monitor::start(config.monitor)?);

    if !config.ui_dir.is_dir() {
        tracing::warn!("UI directory {} does not exist", config.ui_dir.display());
    }

    let app = build_router(Arc::clone(&monitor), &config.ui_dir);

    match listener.local_addr() {
        Ok(addr) => tracing::info!("listening on http://{addr}"),
        Err(e) => tracing::warn!("listening on unknown address: {e}"),
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Serve)?;

    match Arc::try_unwrap(monitor) {
        Ok(monitor) => {
            let reports = monitor.shutdown().await;
            tracing::info!("stopped {} session(s)", reports.len());
        }
        // Remaining handles drop the shutdown sender with them.
        Err(_) => tracing::warn!("monitor still referenced at shutdown"),
    }

    Ok(())
}
