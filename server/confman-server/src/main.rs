use anyhow::Context;
use clap::Parser;
use confman_server::{create_app, ConfmanServer, ServerSettings};
use error_common::{log_error, Result, ServiceError};
use logger_redacted::init_tracing;
use std::path::PathBuf;
use tokio::signal;
use tracing::info;

/// Confman HTTP Server
#[derive(Parser, Debug)]
#[command(name = "confman-server")]
#[command(about = "Versioned JSON configuration API server")]
struct Args {
    /// Server bind address
    #[arg(long)]
    host: Option<String>,

    /// Server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Configuration file path (defaults to ./confman.toml when present)
    #[arg(short, long, env = "CONFMAN_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let mut settings = ServerSettings::load(args.config.as_deref())?;
    settings.apply_legacy_env(|key| std::env::var(key).ok())?;
    settings.apply_overrides(args.host, args.port, args.verbose);

    let _logging = init_tracing(&settings.logging)
        .map_err(|e| ServiceError::ConfigError(e.to_string()))?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Confman server");

    let server = ConfmanServer::from_settings(&settings).await.map_err(|e| {
        log_error("initialising server", &e);
        e
    })?;
    let app = create_app(server);

    let host = settings.server.host.as_str();
    let port = settings.server.port;
    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind to {host}:{port}"))?;

    info!("Confman server running on http://{host}:{port}");
    info!("Health check available at: http://{host}:{port}/health");
    info!("API v1 available at: http://{host}:{port}/api/v1");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server terminated abnormally")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
