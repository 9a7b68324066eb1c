//! Shared logging utilities for consistent tracing across the checker and demo service

use crate::types::{Component, Signal};
use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Filter directive for the given base level, covering every crate in the workspace
pub fn filter_directive(log_level: Option<&str>) -> String {
    let base_level = log_level.unwrap_or("info");
    format!("checker={base_level},shared={base_level},demo_server={base_level},reqwest=warn,hyper=warn")
}

/// Initialize the stdout tracing subscriber.
///
/// `RUST_LOG` takes precedence over `log_level` when it is set.
pub fn init_tracing(log_level: Option<&str>) {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directive(log_level)));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for component-aware info logging
#[macro_export]
macro_rules! component_info {
    ($component:expr, $($arg:tt)*) => {
        tracing::info!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for component-aware warning logging
#[macro_export]
macro_rules! component_warn {
    ($component:expr, $($arg:tt)*) => {
        tracing::warn!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for component-aware error logging
#[macro_export]
macro_rules! component_error {
    ($component:expr, $($arg:tt)*) => {
        tracing::error!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for component-aware debug logging
#[macro_export]
macro_rules! component_debug {
    ($component:expr, $($arg:tt)*) => {
        tracing::debug!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Log a binary starting up, with its build identity and the endpoint it works on
pub fn log_startup(component: Component, identity: &str, endpoint: &str) {
    info!(
        component = %component,
        timestamp = format_timestamp(),
        identity,
        endpoint,
        "Starting {} for {}",
        identity,
        endpoint
    );
}

/// Log a signal the service under test is about to receive
pub fn log_shutdown(component: Component, signal: Signal, reason: &str) {
    info!(
        component = %component,
        timestamp = format_timestamp(),
        signal = %signal,
        reason,
        "Requesting {} of the service: {}",
        signal,
        reason
    );
}

/// Log an operation that failed and ended the current run
pub fn log_error(component: Component, operation: &str, error: &dyn std::fmt::Display) {
    error!(
        component = %component,
        timestamp = format_timestamp(),
        operation,
        error = %error,
        "{} aborted: {}",
        operation,
        error
    );
}

/// Log how a run ended and how the service process exited
pub fn log_run_finished(component: Component, outcome: &dyn std::fmt::Display, exit: &dyn std::fmt::Display) {
    info!(
        component = %component,
        timestamp = format_timestamp(),
        outcome = %outcome,
        exit = %exit,
        "Run finished as {}, service exited with {}",
        outcome,
        exit
    );
}
