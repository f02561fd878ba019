//! Dynamo KV Cache - HTTP server over the cache adapter.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dynamo_kv_cache::api::{create_router, AppState};
use dynamo_kv_cache::cache::DocumentCache;
use dynamo_kv_cache::config::{Backend, CacheOptions, ServerConfig};
use dynamo_kv_cache::store::{DocumentStore, DynamoDbStore, MemoryStore};

/// Main entry point for the cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the configured backing store
/// 4. Create Axum router with all endpoints
/// 5. Start HTTP server on configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dynamo_kv_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Dynamo KV Cache Server");

    let config = ServerConfig::from_env();
    info!(
        "Configuration loaded: backend={:?}, table={}, default_ttl={}s, max_batch_size={}, port={}",
        config.backend,
        config.cache.table_name,
        config.cache.default_ttl,
        config.cache.max_batch_size,
        config.server_port
    );

    let store = build_store(&config).await;
    let cache = DocumentCache::new(store, config.cache.clone());
    info!("Cache adapter initialized");

    let app = create_router(AppState::new(cache));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn build_store(config: &ServerConfig) -> Arc<dyn DocumentStore> {
    match config.backend {
        Backend::Memory => Arc::new(memory_store(&config.cache)),
        Backend::DynamoDb => {
            Arc::new(DynamoDbStore::from_env(config.dynamodb_endpoint.as_deref()).await)
        }
    }
}

/// An in-process table shaped like the configured one.
fn memory_store(options: &CacheOptions) -> MemoryStore {
    MemoryStore::new().with_table(
        &options.table_name,
        &options.partition_key_name,
        options.sort_key_name.as_deref(),
    )
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
