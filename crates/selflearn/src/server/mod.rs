//! REST API module for the clustering service.
//!
//! Exposes the trigger, report and question endpoints over HTTP.
//! Uses axum for routing with a shared [`AppState`] carrying the
//! service and the background worker.

pub mod handlers;
pub mod routing;
pub mod types;

use anyhow::Result;
use axum::serve;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub use handlers::AppState;

/// Start the REST server
pub async fn start_server(state: AppState, addr: SocketAddr) -> Result<()> {
  let app = routing::create_router(state)
    .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()));

  let listener = TcpListener::bind(addr).await?;
  info!("Server listening on {addr}");

  serve(listener, app).await?;
  Ok(())
}
