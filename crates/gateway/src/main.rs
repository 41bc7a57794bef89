// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! clamgate: HTTP gateway that streams request bodies to clamd.
//!
//! `POST /scan` forwards the body with the `INSTREAM` protocol and answers
//! with a JSON verdict; any other request returns the clamd version.

mod config;
mod env;
mod error;
mod server;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cg_core::ClamdClient;

use config::{EnvValues, GatewayConfig};
use server::AppState;

/// clamgate: streaming virus-scan gateway for clamd
#[derive(Parser, Debug)]
#[command(name = "clamgate", version)]
#[command(about = "HTTP gateway that streams request bodies to clamd for scanning")]
struct Args {
    /// clamd host [env: CLAM_HOST] [default: 127.0.0.1]
    #[arg(long)]
    clam_host: Option<String>,

    /// clamd TCP port [env: CLAM_PORT] [default: 3310]
    #[arg(long)]
    clam_port: Option<u16>,

    /// Port to listen on [env: PORT] [default: 8080]
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind the listener to
    #[arg(long, default_value = "0.0.0.0")]
    bind_host: String,

    /// Upper bound on a scan in milliseconds [env: CLAMGATE_SCAN_TIMEOUT_MS] [default: 600000]
    #[arg(long)]
    scan_timeout_ms: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let config = GatewayConfig::resolve(&args, &EnvValues::from_process())?;

    info!("Starting clamgate");
    info!("  Listen address: {}", config.listen);
    info!("  clamd: {}", config.daemon.addr);
    info!(
        "  Scan timeout: {}ms",
        config.scan.connection_timeout.as_millis()
    );

    let client = ClamdClient::new(config.daemon.clone());
    match client.ping().await {
        Ok(reply) => info!("  clamd reachable: {}", reply),
        Err(e) => warn!("clamd not reachable yet: {}", e),
    }

    let state = AppState::new(client, config.scan, server::KEEPALIVE_AFTER);
    server::run(config.listen, state).await?;

    Ok(())
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        env::log_directive()
            .and_then(|directive| EnvFilter::try_new(directive).ok())
            .unwrap_or_else(|| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
