//! # Server Binary Entry Point
//!
//! Starts the steganography and watermarking HTTP service.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin server -- --config config/server.toml
//! ```
//!
//! Without `--config` the built-in defaults are used (bind 127.0.0.1:3000,
//! static files from `./static`, 16 MiB upload cap).

use clap::Parser;
use env_logger::Builder;
use log::{info, LevelFilter};
use std::io::Write;
use std::sync::Arc;

use stegomark::api::{router, AppState};
use stegomark::common::config::{load_config, ServerConfig};

/// Command-line arguments for the server binary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the server configuration file (TOML format)
    ///
    /// Example: config/server.toml
    #[arg(short, long)]
    config: Option<String>,
}

/// Initialize the logging system with timestamp, level, and message formatting.
///
/// Logs are printed to stdout with INFO level by default.
/// Format: `[HH:MM:SS] [LEVEL] message`
fn init_logger() {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let args = Args::parse();
    let config: ServerConfig = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    info!("🚀 Initializing stegomark server...");
    let state = Arc::new(AppState::new(config.server.clone()));
    let app = router(state);

    let addr = &config.server.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🌐 Server running on http://{addr}");
    info!("📡 API endpoints: /steganography/*, /watermark/*, /compare");

    axum::serve(listener, app).await?;
    Ok(())
}
