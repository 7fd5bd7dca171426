//! Server initialization and routing
//!
//! This module handles the Axum server setup including:
//! - Router configuration with all API endpoints
//! - Middleware stack (request ids, logging, timeouts, compression, CORS)
//! - Graceful shutdown handling and store release

use crate::config::ServerConfig;
use crate::middleware::{log_requests, request_id, request_timeout};
use crate::routes::{chart_data, health, sample, status, upload};
use crate::routes::{hello, not_found};
use crate::state::ServerState;
use axum::extract::DefaultBodyLimit;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum router with all routes and middleware
///
/// API routes live under `config.api_prefix`; `/health` and `/ready` sit
/// outside it. Middleware stack, outermost first:
/// 1. Request ID tracking
/// 2. Request logging
/// 3. HTTP tracing
/// 4. CORS
/// 5. Compression
/// 6. Body size limit
/// 7. Timeout handling, on every route except the upload, which applies
///    the timeout itself and never abandons a started insert
pub fn build_router(state: Arc<ServerState>) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::very_permissive()
    } else {
        CorsLayer::new()
    };

    let prefix = state.config.api_prefix.clone();
    let at = |path: &str| format!("{prefix}{path}");

    let mut api = Router::new()
        .route(&at("/"), get(hello))
        .route(
            &at("/status"),
            post(status::create_status).get(status::list_status),
        )
        .route(&at("/chart-data/{id}"), get(chart_data::get_chart_data))
        .route(&at("/sample-data"), get(sample::get_sample_data));
    if !prefix.is_empty() {
        api = api.route(&prefix, get(hello));
    }

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check));

    let timed = Router::new()
        .merge(public_routes)
        .merge(api)
        .route_layer(from_fn_with_state(state.clone(), request_timeout));

    let uploads = Router::new().route(&at("/upload-csv"), post(upload::upload_csv));

    Router::new()
        .merge(timed)
        .merge(uploads)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(state.config.max_body_size()))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(log_requests))
        .layer(from_fn(request_id))
        .with_state(state)
}

/// Start the chartdeck HTTP server
///
/// Sets up JSON logging, opens the store named by the configuration, and
/// serves until SIGTERM or Ctrl+C. The store is closed after the server has
/// drained.
///
/// # Example
///
/// ```rust,no_run
/// use server::ServerConfig;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = ServerConfig::load()?;
///     server::start_server(config).await?;
///     Ok(())
/// }
/// ```
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json()
        .try_init();

    config.validate()?;
    let addr: SocketAddr = config.socket_addr()?;

    let state = Arc::new(ServerState::new(config.clone())?);
    let app = build_router(state.clone());

    tracing::info!(
        addr = %addr,
        database = %config.database_name,
        api_prefix = %config.api_prefix,
        "Starting chartdeck server"
    );
    tracing::info!(
        "Timeout: {}s, Max body: {}MB, CORS: {}",
        config.timeout_secs,
        config.max_body_size_mb,
        config.enable_cors
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.store.close().await?;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
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
