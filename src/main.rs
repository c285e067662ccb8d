use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jersey_central::config::Config;
use jersey_central::mail::Mailer;
use jersey_central::AppState;

#[derive(Parser, Debug)]
#[command(name = "jersey-central")]
#[command(author, version, about = "A self-hosted storefront server for sports jerseys", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "jersey-central.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Jersey Central v{}", env!("CARGO_PKG_VERSION"));

    // Ensure data and upload directories exist
    jersey_central::utils::ensure_dir(&config.server.data_dir)?;
    let uploads_dir = config.server.data_dir.join("uploads");
    jersey_central::utils::ensure_dir(&uploads_dir)?;

    // Initialize database
    let db = jersey_central::db::init(&config.server.data_dir).await?;

    // Ensure the bootstrap admin user exists
    jersey_central::api::auth::ensure_admin_user(
        &db,
        &config.auth.admin_email,
        &config.auth.admin_password,
    )
    .await?;

    // Outbound mail is optional; without it confirmation links are logged
    let mailer = Mailer::from_config(&config.smtp)?;
    if mailer.is_none() {
        tracing::warn!("SMTP not configured; verification links will be logged, not mailed");
    }

    // Create app state and API router
    let state = Arc::new(AppState::new(config.clone(), db, mailer));
    let api_router = jersey_central::api::create_router(state);

    // Serve uploaded jersey images alongside the API
    let app = axum::Router::new()
        .merge(api_router)
        .nest_service("/uploads", ServeDir::new(&uploads_dir));

    let api_addr = format!("{}:{}", config.server.host, config.server.api_port);
    let listener = tokio::net::TcpListener::bind(&api_addr).await?;

    tracing::info!("API server listening on http://{}", api_addr);
    tracing::info!("Ops API token: {}", config.auth.api_token);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
