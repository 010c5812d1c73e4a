//! HTTP API for the agent service
//!
//! # Endpoints
//!
//! - `GET /` - Service banner
//! - `GET /health` - Health check
//! - `GET /agents` - Agents and their tool metadata
//! - `GET /system/status` - Per-agent status snapshot
//! - `POST /agent/{name}/run` - Run an agent's think/act loop
//! - `POST /agent/{name}/tool` - Dispatch one tool directly
//! - `GET /agent/{name}/history` - Recent invocation records

pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use state::AppState;

/// Create the API router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/agents", get(routes::list_agents))
        .route("/system/status", get(routes::system_status))
        .route("/agent/{name}/run", post(routes::run_agent))
        .route("/agent/{name}/tool", post(routes::run_tool))
        .route("/agent/{name}/history", get(routes::agent_history))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the API server on the given address
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let router = create_router(state);

    info!(%addr, "Starting Trinity API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
