//! Graceful shutdown checker
//!
//! Launches a service, waits until it is ready, keeps it busy with traffic,
//! terminates it and reports whether any request failed along the way.

pub mod conductor;
pub mod config;
pub mod core;
pub mod error;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use conductor::{initiate_shutdown, Conductor, RunOutcome};
pub use config::{Config, ProbeConfig, ProcessConfig, ShutdownConfig, TrafficConfig};
pub use crate::core::{Phase, ReportSnapshot, SimulationReport, StatusWindow, Verdict};
pub use error::{CheckerError, CheckerResult, TrafficError};
pub use traits::{
    MockProbe, MockProcessHandler, MockTrafficSimulator, Probe, ProcessExit, ProcessHandler, TrafficSimulator,
};
