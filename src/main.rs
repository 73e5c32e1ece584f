//! hagall-relay - frame-paced WebSocket relay
//!
//! Echoes every message back to its sender, releasing pose and component
//! updates once per frame.

use anyhow::{Context, Result};
use clap::Parser;
use hagall_server::{init_logging, EchoHandler, LogFormat, Server, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Frame-paced WebSocket relay for Hagall sessions", long_about = None)]
struct Args {
    /// Server configuration file (TOML)
    #[arg(long, default_value = hagall_server::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Address to listen on, overriding the configuration file
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Frames per second, overriding the configuration file
    #[arg(long)]
    frame_rate: Option<u32>,

    /// Log filter directives used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_filter: String,

    /// Log output format: pretty, compact or json
    #[arg(long, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Write the effective configuration to the given path and exit
    #[arg(long)]
    write_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_filter, args.log_format)?;

    info!("Starting hagall-relay v{}", env!("CARGO_PKG_VERSION"));

    let mut config = ServerConfig::load_from_path(&args.config);
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }
    if let Some(frame_rate) = args.frame_rate {
        config.frame_rate = frame_rate;
    }
    let config = config.sanitized();

    if let Some(path) = &args.write_config {
        config
            .save_to_path(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Configuration written to {}", path.display());
        return Ok(());
    }

    let server = Server::bind(config, Arc::new(EchoHandler)).await?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for interrupt: {err}");
                return;
            }
            info!("Interrupt received, shutting down");
            cancel.cancel();
        });
    }

    server.run(cancel).await
}
