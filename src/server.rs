//! HTTP exposition endpoint.
//!
//! Serves a single `GET` route at the configured metrics path. Every
//! request runs exactly one collector cycle before answering.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use log::{error, info};
use tokio::net::TcpListener;

use crate::{collector::Collector, config::Config, metrics::PrometheusSink};

#[derive(Clone)]
struct AppState {
    collector: Arc<dyn Collector>,
}

pub fn build_router(metrics_endpoint: &str, collector: Arc<dyn Collector>) -> Router {
    Router::new()
        .route(metrics_endpoint, get(metrics_handler))
        .with_state(AppState { collector })
}

/// Binds the listen address and serves until Ctrl-C.
///
/// A bind failure is returned to the caller and is fatal for the
/// process.
pub async fn serve(config: &Config, collector: Arc<dyn Collector>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&config.listen_address)
        .await
        .with_context(|| format!("failed to bind listen address {}", config.listen_address))?;

    info!("Starting Server at : {}", listener.local_addr()?);

    let router = build_router(&config.metrics_endpoint, collector);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("metrics server failed")?;

    info!("metrics server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", e);
        // Without a signal handler keep serving until the process is killed.
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

// Collector failures are logged inside `collect` and never reach
// the response: the scraper gets a 200 with whatever was emitted.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let mut sink = match PrometheusSink::new(state.collector.describe()) {
        Ok(sink) => sink,
        Err(e) => {
            error!("failed to build metric families: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    state.collector.collect(&mut sink).await;

    match sink.render() {
        Ok(body) => ([(header::CONTENT_TYPE, sink.content_type())], body).into_response(),
        Err(e) => {
            error!("failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
