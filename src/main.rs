//! Relay server binary
//!
//! Usage: rtsp-relay [CONFIG_FILE]
//!
//! The configuration file defaults to `rtsp.json` in the working directory.
//! A missing or invalid file falls back to port 8554 and a 60-unit cache.
//! Log verbosity follows `RUST_LOG` (default `info`).

use rtsp_relay::protocol::constants::DEFAULT_CONFIG_FILE;
use rtsp_relay::{RelayServer, ServerConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

    let server = RelayServer::new(ServerConfig::load(&path));

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    if let Err(e) = server.run_until(shutdown).await {
        tracing::error!(error = %e, "Server stopped");
    }
}
