//! ScanHub - main application entry point
//!
//! Starts the HTTP API server and the background job workers.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::{net::TcpListener, signal};

use scanhub::{AppHandle, Config, create_app, init_tracing};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = dotenvy::dotenv() {
        // Only warn if it's not a "file not found" error
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Load and validate configuration
    let config = Config::load().map_err(|e| {
        std::io::Error::other(format!(
            "Failed to load configuration. Check config/*.toml and SCANHUB__* env vars: {}",
            e
        ))
    })?;

    init_tracing(&config.logging)?;

    tracing::info!("Starting ScanHub server...");
    tracing::info!(
        "Configuration loaded: server={}:{}",
        config.server.host,
        config.server.port
    );

    let server_host = config.server.host.clone();
    let server_port = config.server.port;
    let enable_docs = config.server.enable_docs;
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);

    let app_handle = create_app(config)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to create application: {}", e)))?;

    let addr = SocketAddr::new(server_host.parse()?, server_port);

    tracing::info!("Server listening on {}", addr);
    if enable_docs {
        tracing::info!("API documentation available at http://{}/docs", addr);
    } else {
        tracing::info!("API documentation disabled");
    }

    let listener = TcpListener::bind(addr).await?;
    let router = app_handle.router.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    drain(app_handle, shutdown_timeout).await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}

/// Stop the worker pool, cancel live jobs and give them `timeout` to record
/// their final state.
async fn drain(app_handle: AppHandle, timeout: Duration) {
    let cancelled = app_handle.shutdown().await;
    tracing::info!(jobs = cancelled, "Cancelling background jobs...");

    let waited = tokio::time::timeout(timeout, async {
        while !app_handle.cancellations.is_empty().await {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await;

    if waited.is_err() {
        tracing::warn!(
            remaining = app_handle.cancellations.len().await,
            "Background jobs shutdown timeout reached"
        );
    }
    app_handle.workers.abort();
}
