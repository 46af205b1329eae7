//! Service entry point: wires config, store, generator, and HTTP server.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tenq::adapters::ai::{BreakerConfig, OpenAiGenerator, OpenAiSettings};
use tenq::adapters::http::{app_router, AppState};
use tenq::adapters::permissions::StaticPermissionChecker;
use tenq::adapters::sqlite::SqliteConversationStore;
use tenq::application::ConversationEngine;
use tenq::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;

    if let Some(dir) = Path::new(&config.database.path).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let store = Arc::new(SqliteConversationStore::connect(&config.database.path).await?);
    info!(path = %config.database.path, "database ready");

    if config.ai.api_key.is_none() {
        warn!("no API key configured; question generation will be unavailable");
    }
    let breaker = BreakerConfig {
        reset_timeout: Duration::from_secs(config.ai.breaker_reset_secs),
        error_threshold_pct: config.ai.breaker_error_threshold_pct,
        min_volume: config.ai.breaker_min_volume,
        ..BreakerConfig::default()
    };
    let generator = Arc::new(OpenAiGenerator::new(
        OpenAiSettings::from(&config.ai),
        breaker,
    ));

    let permissions = Arc::new(StaticPermissionChecker::allow_all());

    let engine = Arc::new(ConversationEngine::new(
        store.clone(),
        generator.clone(),
        permissions,
        config.limits.clone(),
    ));

    let router = app_router(
        AppState {
            engine,
            store,
            generator,
        },
        &config.limits,
    );

    let addr = config.server.socket_addr();
    info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => warn!(error = %err, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
