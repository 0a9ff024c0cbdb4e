use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pitchguard::config::GuardConfig;
use pitchguard::http::{GuardService, HttpServer};

/// Rate limiting and input validation sidecar for pitch coaching functions.
#[derive(Debug, Parser)]
#[command(name = "pitchguard", version, about)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the HTTP listen address
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = GuardConfig::load(cli.config.as_deref())?;
    if let Some(listen) = cli.listen {
        config.server.http_addr = listen;
    }

    init_tracing(&config.logging.level, cli.json_logs || config.logging.json);

    info!("Starting Pitchguard");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        source = %config_source(cli.config.as_deref()),
        http_addr = %config.server.http_addr,
        trusted_ip_header = %config.rate_limiting.trusted_ip_header,
        auth_tokens = config.auth.tokens.len(),
        "Configuration loaded"
    );

    let service = Arc::new(GuardService::from_config(&config));
    info!("Guard service initialized");

    HttpServer::new(config.server.http_addr, service)
        .serve_with_shutdown(shutdown_signal())
        .await?;

    info!("Pitchguard stopped");
    Ok(())
}

/// Where configuration was read from, for the startup log.
fn config_source(path: Option<&Path>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "defaults and environment".to_string(),
    }
}

/// Initialize tracing. `RUST_LOG` takes precedence over the configured level.
fn init_tracing(default_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_overrides() {
        let cli = Cli::parse_from([
            "pitchguard",
            "--config",
            "guard.yaml",
            "--listen",
            "0.0.0.0:9000",
            "--json-logs",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("guard.yaml")));
        assert_eq!(cli.listen.map(|a| a.port()), Some(9000));
        assert!(cli.json_logs);
    }

    #[test]
    fn test_config_source() {
        let cli = Cli::parse_from(["pitchguard", "-c", "/etc/pitchguard/guard.yaml"]);
        assert_eq!(
            config_source(cli.config.as_deref()),
            "/etc/pitchguard/guard.yaml"
        );

        let cli = Cli::parse_from(["pitchguard"]);
        assert_eq!(config_source(cli.config.as_deref()), "defaults and environment");
    }
}
