//! fc-server: HTTP ingestion, catalog and range-request delivery.
//!
//! This crate ties the catalog and artifact store into a running server:
//!
//! - Axum HTTP API with authentication, request IDs and SSE
//! - Streaming multipart ingestion into the artifact store
//! - Range-request delivery with per-request file handles
//! - Graceful shutdown via signal handling

pub mod context;
pub mod delivery;
pub mod error;
pub mod ingest;
pub mod middleware;
pub mod range;
pub mod router;
pub mod routes;
pub mod store;

use std::net::SocketAddr;

use fc_core::config::Config;
use fc_db::Catalog;

use crate::context::AppContext;
use crate::store::ArtifactStore;

/// Start the filecast server.
///
/// Opens the catalog and content root, builds the [`AppContext`], and serves
/// HTTP until a shutdown signal is received.
pub async fn start(config: Config) -> fc_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let db_path = &config.server.db_path;
    let existed = db_path.exists();
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            tracing::info!("Created database directory {}", parent.display());
        }
    }
    let db_str = db_path.to_string_lossy();
    let catalog = Catalog::open(&db_str)?;
    if existed {
        tracing::info!("Catalog opened (existing) at {db_str}");
    } else {
        tracing::info!("Catalog created (new) at {db_str}");
    }

    let store = ArtifactStore::new(config.server.content_root.clone());
    store.ensure_root().await?;
    tracing::info!("Artifacts stored under {}", store.root().display());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| fc_core::Error::Internal(format!("Invalid server address: {e}")))?;
    let static_dir = config.server.static_dir.clone();

    let ctx = AppContext::new(catalog, store, config);
    let app = router::build_router(ctx, static_dir);

    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| fc_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| fc_core::Error::Internal(format!("Server error: {e}")))?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
