//! Admin Back-Office Service
//! Mission: Run the e-commerce administration API
//! Bootstrap order: config, tracing, store, default admin, listener

use admin_backoffice::{
    api::{create_router, AppState},
    auth::DefaultAdmin,
    config::Config,
    store::Database,
};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Invalid configuration")?;
    init_tracing();

    info!("🚀 Admin back-office starting ({})", config.environment);
    if !config.is_production() {
        warn!("⚠️  Running outside production: development secrets are accepted");
    }

    let db = Database::open(&config.database_url, config.store_timeout())
        .with_context(|| format!("Failed to open database at {}", config.database_url))?;

    let state = AppState::from_config(db, &config);

    let seed = DefaultAdmin::from(&config);
    let admin = state
        .admins
        .ensure_default_admin(&seed)
        .await
        .context("Failed to bootstrap default admin")?;
    info!("🔐 Default admin ready: {}", admin.email);

    let hasher = state.hasher.clone();
    tokio::task::spawn_blocking(move || hasher.warm_up())
        .await
        .context("Password hasher warm-up failed")?;

    let app = create_router(state, &config.allowed_origins());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🎯 API server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("👋 Server stopped");
    Ok(())
}

/// Initialize tracing with env-filter override
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "admin_backoffice=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
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
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("🛑 Shutdown signal received, draining connections");
}
