//! Primer HTTP test double server
//!
//! Usage:
//!   primer-http [--config primer.yaml] [--port 8080] [OPTIONS]

use clap::Parser;
use primer_http::{PrimerServer, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Primer - prime, serve and verify HTTP traffic
#[derive(Parser, Debug)]
#[command(name = "primer-http")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML or JSON configuration file
    #[arg(short, long, env = "PRIMER_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind (overrides the config file)
    #[arg(long, env = "PRIMER_HOST")]
    host: Option<String>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "PRIMER_PORT")]
    port: Option<u16>,

    /// Maximum number of served exchanges kept in history
    #[arg(long, env = "PRIMER_HISTORY_CAPACITY")]
    history_capacity: Option<usize>,

    /// Maximum number of unmatched requests kept
    #[arg(long, env = "PRIMER_FAILED_CAPACITY")]
    failed_capacity: Option<usize>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, env = "PRIMER_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn load_config(&self) -> Result<ServerConfig, anyhow::Error> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                ServerConfig::from_file(path)?
            }
            None => ServerConfig::default(),
        };

        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(capacity) = self.history_capacity {
            config.history_capacity = capacity;
        }
        if let Some(capacity) = self.failed_capacity {
            config.failed_capacity = capacity;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = args.load_config()?;
    let dispatcher = Arc::new(config.build_dispatcher());
    let (history_capacity, failed_capacity) = dispatcher.log_capacities();
    info!(
        history_capacity,
        failed_capacity,
        standing_defaults = config.standing_defaults.len(),
        "Dispatcher ready"
    );

    let server = PrimerServer::bind(config.socket_addr()?, dispatcher).await?;
    server
        .run_until(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl-C"),
                Err(e) => {
                    warn!("Cannot listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        })
        .await
}
