//! Trust Registry Server
//!
//! Main entry point for the trust registry HTTP server.
//! This binary loads configuration, wires the store, upstream resolver and
//! services together, and serves the API with graceful shutdown.

mod config;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use trust_registry_api::{build_api_server_with_config, JwtManager, MiddlewareConfig};
use trust_registry_db::InMemoryArtifactRepository;
use trust_registry_service::{HttpSourceResolver, ServiceRegistry};

use config::ServerConfig;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration directory
    #[arg(short, long, env = "CONFIG_DIR", default_value = "config")]
    config_dir: String,

    /// Environment (development, production, etc.)
    #[arg(short, long, env = "ENVIRONMENT", default_value = "development")]
    environment: String,

    /// Server host
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,

    /// Server port
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = ServerConfig::load(&args.config_dir, &args.environment)
        .with_context(|| format!("Failed to load configuration from {}", args.config_dir))?;

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(log_level) = args.log_level {
        config.logging.level = log_level;
    }
    if args.json_logs {
        config.logging.json_format = true;
    }

    telemetry::init(&config.logging);

    info!("Starting trust registry server");
    info!("Environment: {}", args.environment);
    info!("Server: {}", config.bind_address());
    info!(
        hugging_face = %config.upstream.hugging_face_url,
        github = %config.upstream.github_api_url,
        "Upstream sources"
    );
    if config.upstream.github_token.is_none() {
        warn!("No GitHub token configured, upstream requests are subject to anonymous rate limits");
    }

    let resolver = HttpSourceResolver::new(config.upstream.clone())
        .context("Failed to build upstream HTTP client")?;
    let services = ServiceRegistry::new(
        Arc::new(InMemoryArtifactRepository::new()),
        Arc::new(resolver),
        config.service_config(),
    );

    let jwt_manager =
        JwtManager::new(config.auth.jwt_config()).context("Invalid authentication configuration")?;

    let middleware_config = MiddlewareConfig::new()
        .with_cors(config.cors.clone())
        .with_compression(config.server.compression);
    let app = build_api_server_with_config(services, jwt_manager, middleware_config);

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .context("Invalid HTTP bind address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind HTTP server")?;
    info!("HTTP Server listening on http://{}", addr);

    if config.server.graceful_shutdown {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP Server error")?;
    } else {
        axum::serve(listener, app).await.context("HTTP Server error")?;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
///
/// Resolves on SIGTERM or SIGINT (Ctrl+C). In-flight requests are drained
/// by `axum::serve` afterwards.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
