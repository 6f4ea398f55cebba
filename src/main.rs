//! Application entry point and server initialization
//!
//! This module contains the main function that:
//! - Loads environment configuration
//! - Initializes the database and the shared application state
//! - Starts the HTTP server with graceful shutdown support

use anyhow::Context;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use nimbaha::config::Config;
use nimbaha::database::{init_db, AppState};
use nimbaha::route::create_app;

/// Application entry point
///
/// 1. Loads environment variables from .env file
/// 2. Reads the configuration (see [`Config`])
/// 3. Initializes the embedded database
/// 4. Creates the application state and router
/// 5. Starts the HTTP server with graceful shutdown handling
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenv().ok();

    // Initialize logging; RUST_LOG overrides the default filter
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("nimbaha=debug,tower_http=debug")),
        )
        .init();

    // Read the configuration from the environment
    let config = Config::from_env();

    // Initialize the database (creates tables if they don't exist)
    let db = init_db(&config.database_path)
        .with_context(|| format!("failed to initialize database {}", config.database_path))?;

    let port = config.port;
    let db_name = config.database_path.clone();
    // Create the shared application state
    let state = AppState::new(db, config).context("failed to build HTTP client")?;

    // Build the router and log every request
    let app = create_app(state).layer(TraceLayer::new_for_http());

    // Bind to all network interfaces on the specified port
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("Server running at http://localhost:{}", port);
    tracing::info!("Using database: {}", db_name);

    // Start the server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM
///
/// In-flight requests, including running relays, are allowed to finish.
///
/// # Returns
///
/// A future that completes once a shutdown signal arrives
async fn shutdown_signal() {
    // Handle Ctrl+C signal
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    // Handle SIGTERM signal (Unix only)
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install signal handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    // On non-Unix systems (Windows), only handle Ctrl+C
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    // Wait for whichever signal arrives first
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping server.");
}
