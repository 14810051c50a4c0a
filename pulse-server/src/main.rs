//! pulse-server streams a live sample series to websocket observers.
//!
//! Samples a uniform random value every sampling period into a fixed-size
//! series and pushes the whole series to each `/ws` client every broadcast
//! period. Static UI files are served from `--ui-dir`.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use pulse::config::{DEFAULT_CAPACITY, MonitorConfig};
use pulse_server::{ServerConfig, ServerError, bind, serve};
use tracing_subscriber::EnvFilter;

/// pulse-server: live time series over websockets.
#[derive(Parser, Debug)]
#[command(name = "pulse-server", version, about)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "PULSE_LISTEN", default_value = "0.0.0.0:8080")]
    listen: String,

    /// Directory holding the static UI.
    #[arg(long, env = "PULSE_UI_DIR", default_value = "./ui")]
    ui_dir: PathBuf,

    /// Number of samples kept and sent per frame.
    #[arg(long, env = "PULSE_CAPACITY", default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Sampling period in milliseconds.
    #[arg(long, env = "PULSE_SAMPLING_MS", default_value = "10")]
    sampling_ms: u64,

    /// Broadcast period in milliseconds.
    #[arg(long, env = "PULSE_BROADCAST_MS", default_value = "200")]
    broadcast_ms: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("pulse-server failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), ServerError> {
    let monitor = MonitorConfig::new(
        cli.capacity,
        Duration::from_millis(cli.sampling_ms),
        Duration::from_millis(cli.broadcast_ms),
    )?;

    let listener = bind(&cli.listen).await?;

    let config = ServerConfig {
        ui_dir: cli.ui_dir,
        monitor,
    };
    serve(listener, config, shutdown_signal()).await?;

    tracing::info!("pulse-server exited cleanly");
    Ok(())
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown requested"),
        Err(e) => {
            tracing::error!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    }
}
