//! Guessmind - "guess the character" game server
//!
//! A thin HTTP layer over a remote guessing engine. Games live in memory,
//! keyed by session id, for as long as the process runs.

mod answer;
mod api;
mod config;
mod engine;
mod game;
mod session;

use api::{cors_layer, create_router, AppState};
use config::ServerConfig;
use engine::{AkinatorFactory, LoggingFactory};
use game::GameService;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "guessmind=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(
        port = config.port,
        origins = ?config.allowed_origins,
        engine_url = %config.engine_url,
        engine_timeout_ms = %config.engine_timeout.as_millis(),
        "Configuration loaded"
    );

    // Engine backend
    let factory = AkinatorFactory::new(&config.engine_url, config.engine_timeout)?;
    let games = Arc::new(GameService::new(
        Arc::new(LoggingFactory::new(factory)),
        config.engine_timeout,
    ));

    let app = create_router(AppState::new(games.clone()))
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("GuessMind server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let store = games.store();
    if store.is_empty().await {
        tracing::info!("Server stopped");
    } else {
        tracing::info!(
            active_sessions = store.len().await,
            "Server stopped, in-memory games discarded"
        );
    }
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        () = ctrl_c => tracing::info!("Received SIGINT - shutting down"),
        () = terminate => tracing::info!("Received SIGTERM - shutting down"),
    }
}
