//! Minimal HTTP Forward Proxy
//!
//! ```text
//!     Client ──GET http://origin/path──▶ ┌──────────────────────────────┐
//!                                        │ http::server  proxy_handler  │
//!                                        │   parse absolute target      │
//!                                        │   rebuild outbound request   │──────▶ Origin
//!     Client ◀──status, headers, body─── │   relay origin response      │◀──────
//!                                        └──────────────────────────────┘
//!
//!     400  target is not an absolute http URL (origin never contacted)
//!     500  outbound request could not be built
//!     502  origin unreachable
//! ```

use std::path::PathBuf;

use clap::Parser;

use forward_proxy::config::validation::validate_config;
use forward_proxy::config::{load_config, ConfigError, ProxyConfig};
use forward_proxy::lifecycle::{signals, Shutdown};
use forward_proxy::observability::{logging, metrics};
use forward_proxy::{net, HttpServer};

#[derive(Parser)]
#[command(name = "forward-proxy")]
#[command(about = "Minimal HTTP forward proxy", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    logging::init_logging(&config.observability);

    tracing::info!("forward-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        connect_timeout_secs = ?config.timeouts.connect_secs,
        strip_hop_by_hop = config.forwarding.strip_hop_by_hop,
        "Configuration loaded"
    );

    metrics::init_from_config(&config.observability);

    // Bind failure is fatal.
    let listener = net::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_handler(shutdown);

    let server = HttpServer::new(config);
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
