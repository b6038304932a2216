use std::{future::Future, sync::Arc};

use axum::Router;
use configs::AppConfig;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::errors::StartupError;
use crate::routes::{self, ServerState};
use service::stock::SeaOrmStockGateway;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Build the app around a live pool; the gateway is the only holder of it.
pub async fn build_app(cfg: &AppConfig) -> Result<Router, StartupError> {
    let db = models::db::connect_with_config(&cfg.database)
        .await
        .map_err(|e| StartupError::Database(e.to_string()))?;
    let gateway = SeaOrmStockGateway::new(db, cfg.stocks.storage_timeout());
    let state = ServerState::new(Arc::new(gateway), cfg.stocks.id_policy);
    Ok(routes::build_router(state, build_cors()))
}

/// Public entry: build the app and serve until `shutdown` resolves.
/// Configuration is resolved by the caller once and passed in.
pub async fn run<F>(cfg: AppConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_app(&cfg).await?;

    let listener = tokio::net::TcpListener::bind(cfg.server.bind_addr()).await?;
    let addr = listener.local_addr()?;
    info!(
        %addr,
        id_policy = ?cfg.stocks.id_policy,
        storage_timeout_ms = cfg.stocks.storage_timeout().as_millis() as u64,
        "starting stocks server"
    );
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    info!(%addr, "server drained");
    Ok(())
}

/// Resolves when `signal` fires. If the listener itself fails, logs and never
/// resolves, so the server keeps running instead of stopping at startup.
pub async fn shutdown_on<F, E>(signal: F)
where
    F: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    if let Err(e) = signal.await {
        error!(event = "signal_handler_failed", error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Resolve configuration from `config.toml` / env, failing fast when invalid.
pub fn load_config() -> Result<AppConfig, StartupError> {
    AppConfig::load_and_validate().map_err(|e| StartupError::InvalidConfig(e.to_string()))
}
