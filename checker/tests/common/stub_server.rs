//! In-process HTTP service standing in for the service under test

use std::net::SocketAddr;

use axum::{http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Stub answering the health endpoints with 200 and `/` with a chosen status
pub struct StubServer {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub async fn start(traffic_status: StatusCode) -> Self {
        let app = Router::new()
            .route("/", get(move || async move { (traffic_status, "OK") }))
            .route("/health", get(|| async { "OK" }))
            .route("/health/readiness", get(|| async { "OK" }));

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("Bind stub server");
        let addr = listener.local_addr().expect("Stub server address");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Stub server error: {}", e);
            }
        });

        Self { addr, handle }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
