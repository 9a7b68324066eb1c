//! Demo service entry point
//!
//! Run the checker against it with
//! `check-graceful-shutdown -- demo-server --port 8080`.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use shared::logging::{self, log_error, log_startup};
use shared::{component_info, parse_duration, Component};
use tokio::net::TcpListener;

use demo_server::{serve, ServerState};

/// HTTP service that shuts down gracefully on SIGTERM
#[derive(Parser, Debug)]
#[command(name = "demo-server")]
#[command(about = "HTTP service that shuts down gracefully on SIGTERM")]
struct Args {
    /// Port for the HTTP server
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Time between SIGTERM and closing the listener
    #[arg(long, default_value = "2s", value_parser = parse_duration)]
    shutdown_delay: Duration,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_tracing(Some(&args.log_level));

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    let listener = TcpListener::bind(addr).await?;

    log_startup(Component::DemoServer, "demo-server", &addr.to_string());
    component_info!(Component::DemoServer, "Listen on port {} with pid={}", args.port, std::process::id());

    serve(listener, ServerState::new(), args.shutdown_delay, terminate_signal()).await?;
    Ok(())
}

#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            terminate.recv().await;
        }
        Err(e) => {
            log_error(Component::DemoServer, "Installing SIGTERM handler", &e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log_error(Component::DemoServer, "Waiting for Ctrl+C", &e);
        std::future::pending::<()>().await;
    }
}
