//! Lookalike Server - REST API for perceptual image matching
//!
//! Exposes lookalike-core functionality via HTTP endpoints:
//! - POST /upload  - Add an image to the catalog
//! - POST /compare - Find catalog images matching an image

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use lookalike_core::{validate_catalog, Catalog, CatalogSync, HashExtractor, MemoryCatalog};
use lookalike_server::config::REFERENCE_PREFIX;
use lookalike_server::{create_router_with_config, AppState, Config, PostgresCatalog};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("lookalike_server=info,lookalike_core=info,tower_http=info")
            }),
        )
        .init();

    let config = Config::from_env();
    let match_config = config
        .match_config()
        .context("Invalid matching configuration")?;

    let catalog: Arc<dyn Catalog> = match &config.database_url {
        Some(url) => {
            let store = PostgresCatalog::new(
                url,
                config.database_max_connections,
                config.database_min_connections,
            )
            .await
            .context("Failed to connect to the catalog database")?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using an in-memory catalog");
            Arc::new(MemoryCatalog::new())
        }
    };

    // Refuse to serve a catalog built with a different hash configuration
    let entries = catalog.find_all().await.context("Failed to read catalog")?;
    validate_catalog(&entries, HashExtractor::new().hash_len())
        .context("Catalog contains hashes of an unexpected length")?;
    tracing::info!(entries = entries.len(), "Catalog validated");

    if config.sync_on_startup {
        let sync = CatalogSync::new(Arc::clone(&catalog), REFERENCE_PREFIX);
        match sync.sync(&config.reference_dir).await {
            Ok(report) => tracing::info!(
                inserted = report.inserted,
                duplicates = report.duplicates,
                failed = report.failed,
                "Reference images synced"
            ),
            Err(e) => tracing::warn!(
                directory = %config.reference_dir.display(),
                error = %e,
                "Reference sync skipped"
            ),
        }
    }

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.upload_dir.display()))?;

    let state = AppState::new(catalog, match_config, &config)?;
    let app = create_router_with_config(&config, state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        %addr,
        threshold = match_config.similar_threshold,
        concurrency = match_config.concurrency_limit,
        "Lookalike server listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
