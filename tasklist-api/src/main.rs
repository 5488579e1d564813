//! # Tasklist API Server
//!
//! REST backend for tracking people, profiles, projects, and tasks.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/tasklist \
//! JWT_SECRET=change-me-to-a-secret-of-32-chars-or-more \
//! cargo run -p tasklist-api
//! ```
//!
//! `DATABASE_URL=memory://` runs without PostgreSQL; data is lost on exit.

use tasklist_api::{
    app::{build_router, AppState},
    config::{Config, LogFormat},
};
use tasklist_shared::store::open_store;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "tasklist_api=debug,tasklist_shared=info,tower_http=debug";

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    tracing::info!(
        "Tasklist API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let store = open_store(&config.database.url, config.database.max_connections).await?;
    tracing::info!(backend = store.backend(), "Store ready");

    let address = config.bind_address();
    let app = build_router(AppState::new(store.clone(), config));

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received, draining connections...");
}
