//! Child process supervision
//!
//! Launches the service under test, samples its liveness and delivers
//! termination requests. Polling and signal delivery share one control loop,
//! which is the only code touching the child handle.

use std::process::Stdio;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use shared::{component_debug, component_info, component_warn, Component, ProcessStatus, Signal};
use tokio::process::{Child, Command};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::ProcessConfig;
use crate::error::{CheckerError, CheckerResult};
use crate::services::notifier::Subscribers;
use crate::traits::{ProcessExit, ProcessHandler};

/// Interval at which the child's liveness is sampled
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

const CONTROL_CAPACITY: usize = 8;

/// Supervisor owning exactly one child process
pub struct ProcessSupervisor {
    config: ProcessConfig,
    poll_interval: Duration,
    status: Mutex<ProcessStatus>,
    subscribers: Subscribers<ProcessStatus>,
    control_tx: mpsc::Sender<Signal>,
    control_rx: Mutex<Option<mpsc::Receiver<Signal>>>,
}

impl ProcessSupervisor {
    pub fn new(config: ProcessConfig) -> Self {
        let (control_tx, control_rx) = mpsc::channel(CONTROL_CAPACITY);

        Self {
            config,
            poll_interval: POLL_INTERVAL,
            status: Mutex::new(ProcessStatus::Exited),
            subscribers: Subscribers::new(Component::Supervisor),
            control_tx,
            control_rx: Mutex::new(Some(control_rx)),
        }
    }

    /// Configure the liveness sampling interval (fluent API)
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn status(&self) -> ProcessStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, status: ProcessStatus) {
        let mut current = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if *current == status {
            return;
        }

        *current = status;
        component_info!(Component::Supervisor, "Process status changed to {}", status);
        self.subscribers.broadcast(status);
    }

    fn spawn(&self) -> CheckerResult<Child> {
        let mut command = Command::new(&self.config.command);
        command
            .args(&self.config.arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        command.spawn().map_err(|source| CheckerError::Launch {
            command: self.config.command.clone(),
            source,
        })
    }

    fn deliver(&self, child: &mut Child, signal: Signal) {
        if let Ok(Some(_)) = child.try_wait() {
            component_debug!(Component::Supervisor, "Process already exited, ignoring {} signal", signal);
            return;
        }

        match signal {
            Signal::Terminate => {
                if let Err(e) = terminate(child) {
                    component_warn!(Component::Supervisor, "{}", e);
                }
            }
            Signal::Kill => match child.start_kill() {
                Ok(()) => component_info!(Component::Supervisor, "🔨 Killed process pid={:?}", child.id()),
                Err(e) => component_warn!(Component::Supervisor, "Failed to kill process pid={:?}: {}", child.id(), e),
            },
        }
    }
}

#[cfg(unix)]
fn terminate(child: &mut Child) -> CheckerResult<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal as UnixSignal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        component_debug!(Component::Supervisor, "Process already reaped, ignoring terminate signal");
        return Ok(());
    };

    match kill(Pid::from_raw(pid as i32), UnixSignal::SIGTERM) {
        Ok(()) => {
            component_info!(Component::Supervisor, "📤 Sent SIGTERM to process pid={}", pid);
            Ok(())
        }
        Err(Errno::ESRCH) => {
            component_debug!(Component::Supervisor, "Process pid={} already gone", pid);
            Ok(())
        }
        Err(e) => Err(CheckerError::Signal {
            message: format!("failed to send SIGTERM to pid {pid}: {e}"),
        }),
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) -> CheckerResult<()> {
    component_warn!(
        Component::Supervisor,
        "Graceful termination is not supported on this platform, killing process pid={:?}",
        child.id()
    );
    child.start_kill().map_err(|e| CheckerError::Signal {
        message: format!("failed to kill process: {e}"),
    })
}

#[async_trait]
impl ProcessHandler for ProcessSupervisor {
    async fn start(&self, cancel: CancellationToken) -> CheckerResult<ProcessExit> {
        let mut control_rx = self
            .control_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| CheckerError::config("process supervisor can only be started once"))?;

        let mut child = self.spawn()?;
        component_info!(
            Component::Supervisor,
            "🚀 Started '{}' (PID: {:?})",
            self.config.command,
            child.id()
        );

        let mut poll = interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let exit_status = loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    component_warn!(Component::Supervisor, "Run cancelled, killing process pid={:?}", child.id());
                    if let Err(e) = child.start_kill() {
                        component_debug!(Component::Supervisor, "Kill on cancellation failed: {}", e);
                    }
                    break child.wait().await?;
                }
                _ = poll.tick() => match child.try_wait() {
                    Ok(Some(status)) => break status,
                    Ok(None) => self.set_status(ProcessStatus::Running),
                    Err(e) => component_warn!(Component::Supervisor, "Failed to sample process status: {}", e),
                },
                Some(signal) = control_rx.recv() => self.deliver(&mut child, signal),
            }
        };

        self.set_status(ProcessStatus::Exited);

        let exit = ProcessExit::from(exit_status);
        component_info!(Component::Supervisor, "🏁 Process exited with {}", exit);
        Ok(exit)
    }

    async fn signal(&self, signal: Signal) {
        match self.control_tx.try_send(signal) {
            Ok(()) => component_debug!(Component::Supervisor, "Queued {} signal", signal),
            Err(TrySendError::Full(_)) => {
                component_warn!(Component::Supervisor, "Control channel full, dropped {} signal", signal)
            }
            Err(TrySendError::Closed(_)) => {
                component_debug!(Component::Supervisor, "Process already exited, ignoring {} signal", signal)
            }
        }
    }

    fn notify(&self, subscriber: mpsc::Sender<ProcessStatus>) {
        self.subscribers.subscribe(subscriber);
    }
}
