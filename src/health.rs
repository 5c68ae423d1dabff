// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Health and metrics HTTP endpoints.

use crate::constants::{HEALTH_PATH, METRICS_PATH};
use crate::metrics::gather_metrics;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use tracing::{error, info};

/// Routes served on the health address.
pub fn routes() -> Router {
    Router::new()
        .route(HEALTH_PATH, get(|| async { "ok" }))
        .route(METRICS_PATH, get(metrics))
}

async fn metrics() -> impl IntoResponse {
    match gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                e.to_string(),
            )
        }
    }
}

/// Serve [`routes`] on `addr` until `shutdown` resolves.
///
/// # Errors
///
/// Returns the I/O error when the address cannot be bound or the server fails.
pub async fn serve<F>(addr: SocketAddr, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Health server started");
    axum::serve(listener, routes())
        .with_graceful_shutdown(shutdown)
        .await
}
