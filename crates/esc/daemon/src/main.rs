//! ESC Daemon - Userland controller service
//!
//! Runs the reconciliation driver against an in-memory object store and serves
//! a REST API for Templates, Userlands and their derived resources.

use clap::Parser;
use esc_daemon::error::{DaemonError, DaemonResult};
use esc_daemon::{DaemonConfig, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// ESC Daemon CLI
#[derive(Parser)]
#[command(name = "escd")]
#[command(about = "ESC Daemon - Userland controller service", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "ESC_CONFIG")]
    config: Option<String>,

    /// Listen address
    #[arg(short, long, env = "ESC_LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level
    #[arg(long, env = "ESC_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "ESC_LOG_JSON")]
    json: bool,

    /// Userlands reconciled in parallel
    #[arg(long)]
    max_concurrent_reconciles: Option<usize>,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())
        .map_err(|e| DaemonError::Config(e.to_string()))?;

    // Override with CLI args
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid listen address: {}", e)))?;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json {
        config.logging.json = true;
    }
    if let Some(max) = cli.max_concurrent_reconciles {
        config.controller.max_concurrent_reconciles = max;
    }

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Print startup banner
    println!(
        r#"
  _____ ____   ____
 | ____/ ___| / ___|
 |  _| \___ \| |
 | |___ ___) | |___
 |_____|____/ \____|

  Userland controller
  Version: {}
  Listening: {}
  Workers: {}
"#,
        env!("CARGO_PKG_VERSION"),
        config.server.listen_addr,
        config.controller.max_concurrent_reconciles.max(1)
    );

    let server = Server::new(config).await?;
    server.run().await
}
