//! Demo service with a well-behaved graceful shutdown
//!
//! Serves a root endpoint and the two health endpoints the checker probes by
//! default. After the termination signal the readiness endpoint starts
//! failing, and once the shutdown delay has passed the server stops accepting
//! connections and drains the ones in flight.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use shared::{component_info, Component};
use tokio::net::TcpListener;

/// Readiness body while the server is terminating
pub const NOT_READY_BODY: &str = "Not so OK";

/// Shared server state
#[derive(Debug, Clone, Default)]
pub struct ServerState {
    terminating: Arc<AtomicBool>,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_terminating(&self) -> bool {
        self.terminating.load(Ordering::SeqCst)
    }

    /// Flip to the terminating phase; readiness fails from now on
    pub fn begin_termination(&self) {
        self.terminating.store(true, Ordering::SeqCst);
    }
}

/// Build the Axum router with all routes
pub fn build_router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(ok))
        .route("/health", get(ok))
        .route("/health/readiness", get(readiness))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Serve until `terminate` resolves, then wait `shutdown_delay` and drain
pub async fn serve<F>(listener: TcpListener, state: ServerState, shutdown_delay: Duration, terminate: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = build_router(state.clone());

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_sequence(state, shutdown_delay, terminate))
        .await?;

    component_info!(Component::DemoServer, "Server stopped gracefully");
    Ok(())
}

async fn shutdown_sequence<F>(state: ServerState, shutdown_delay: Duration, terminate: F)
where
    F: Future<Output = ()>,
{
    terminate.await;

    component_info!(Component::DemoServer, "SIGTERM signal received.");
    component_info!(Component::DemoServer, "Closing http server in {:?}.", shutdown_delay);
    state.begin_termination();

    tokio::time::sleep(shutdown_delay).await;
    component_info!(Component::DemoServer, "Closing http server now.");
}

// HTTP Handlers

async fn ok() -> &'static str {
    "OK"
}

async fn readiness(State(state): State<ServerState>) -> impl IntoResponse {
    if state.is_terminating() {
        (StatusCode::INTERNAL_SERVER_ERROR, NOT_READY_BODY)
    } else {
        (StatusCode::OK, "OK")
    }
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    component_info!(Component::DemoServer, "{} {} - {}", method, path, response.status().as_u16());
    response
}
