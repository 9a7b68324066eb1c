//! Trait definitions with mockall annotations for testing
//!
//! The conductor only talks to its collaborators through these traits, so the
//! protocol can be exercised against fakes and mocks without spawning real
//! processes or HTTP servers.

use std::fmt;
use std::process::ExitStatus;
use std::sync::Arc;

use shared::{ProbeStatus, ProcessStatus, Signal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::core::SimulationReport;
use crate::error::CheckerResult;

/// How the supervised process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, `None` when the process was ended by a signal
    pub code: Option<i32>,
    pub success: bool,
}

impl From<ExitStatus> for ProcessExit {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            success: status.success(),
        }
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => write!(f, "terminated by signal"),
        }
    }
}

/// Periodic health checker with debounced status transitions
#[mockall::automock]
#[async_trait::async_trait]
pub trait Probe: Send + Sync {
    /// Validate the probe configuration
    fn check(&self) -> CheckerResult<()>;

    /// Run checks until `cancel` fires
    ///
    /// Waits the initial delay, then launches one check per period. Checks may
    /// overlap; a slow check never delays the next tick.
    async fn run(&self, cancel: CancellationToken);

    /// Register a subscriber for stable status transitions
    fn notify(&self, subscriber: mpsc::Sender<ProbeStatus>);
}

/// Owner of the child process under test
#[mockall::automock]
#[async_trait::async_trait]
pub trait ProcessHandler: Send + Sync {
    /// Launch the process and block until it exits
    ///
    /// The process is killed when `cancel` fires. Fails only if the process
    /// could not be launched.
    async fn start(&self, cancel: CancellationToken) -> CheckerResult<ProcessExit>;

    /// Request delivery of a signal; a no-op once the process has exited
    async fn signal(&self, signal: Signal);

    /// Register a subscriber for running/exited transitions
    fn notify(&self, subscriber: mpsc::Sender<ProcessStatus>);
}

/// Concurrent request generator
#[mockall::automock]
pub trait TrafficSimulator: Send + Sync {
    /// Spawn the request loops on `tracker`; they stop once `cancel` fires
    fn simulate(&self, cancel: CancellationToken, tracker: &TaskTracker);

    /// Live report, safe to read while loops are still writing
    fn report(&self) -> Arc<SimulationReport>;
}
