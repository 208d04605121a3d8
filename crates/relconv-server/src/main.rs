//! # relconv-server: HTTP Service for Convention Conversion
//!
//! This binary exposes the relconv planner as a network service, so a compiler driver
//! written in another language can hand over bound plans and receive them normalized
//! to the requested conventions.
//!
//! ## Architecture
//!
//! ```text
//! Compiler driver
//!   |
//!   | HTTP POST /convert (PlanGraph JSON + target conventions)
//!   v
//! relconv-server (this binary)
//!   |
//!   +-> PlanGraph::to_plan_with_max_depth (resolve ids, reject cycles and deep trees)
//!   +-> Planner::convert_through (one bottom-up pass per target)
//!   +-> PlanGraph::from_plan (flatten the result)
//!   |
//!   | HTTP response (converted PlanGraph + explain text)
//!   v
//! Compiler driver
//! ```
//!
//! ## Endpoints
//!
//! - `GET  /health`   - Health check
//! - `GET  /rules`    - List registered converter rules
//! - `POST /convert`  - Convert a plan through one or more conventions
//! - `POST /explain`  - Render a plan without converting it
//!
//! ## Configuration
//!
//! See [`state::ServerConfig`]. Logging is controlled by the `RUST_LOG` environment
//! variable (defaults to `relconv=debug`).

mod routes;
mod state;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("relconv=debug")),
        )
        .init();

    let config = state::ServerConfig::from_env()?;
    let state = Arc::new(state::AppState::new(config)?);
    let listen_addr = state.config.listen_addr.clone();

    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/rules", get(routes::list_rules))
        .route("/convert", post(routes::convert))
        .route("/explain", post(routes::explain))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!("relconv-server listening on http://{}", listen_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
