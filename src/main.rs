//! Envelope Gateway
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ filter chain ──────────────▶ backend ──▶ Upstream
//!                     (request id,    (request deadline)            (route,
//!                      trace)         ResponseWrap (-2)              deadline)
//!                                     RequestCapture (0)
//!                                          │
//!     Client Response                      ▼
//!     ◀────────────── envelope writer ◀── backend response
//!                     {code,msg,data}
//!
//!     Any failure before commit ──▶ error envelope mapper ──▶ {code,message}
//! ```

use std::path::PathBuf;

use clap::Parser;

use envelope_gateway::config::{load_config, GatewayConfig};
use envelope_gateway::lifecycle::startup;
use envelope_gateway::observability::logging;

#[derive(Parser)]
#[command(name = "envelope-gateway")]
#[command(about = "HTTP gateway that wraps backend responses in a uniform envelope", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "envelope-gateway starting");

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
