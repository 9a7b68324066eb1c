//! Graceful shutdown test protocol
//!
//! The conductor launches the service under test, waits for it to become
//! ready, drives traffic against it, asks it to terminate and watches how the
//! in-flight requests fare. All collaborators are injected through traits so
//! the protocol can run against fakes.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use shared::logging::{log_run_finished, log_shutdown};
use shared::{
    component_debug, component_error, component_info, component_warn, Component, ProbeKind, ProbeStatus,
    ProcessStatus, Signal,
};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::{Config, ShutdownConfig};
use crate::core::{Phase, SimulationReport};
use crate::error::CheckerResult;
use crate::services::{HttpProbe, HttpTrafficSimulator, ProcessSupervisor, SUBSCRIBER_CAPACITY};
use crate::traits::{Probe, ProcessHandler, TrafficSimulator};

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The service was terminated by the protocol and the process exited
    Completed,
    /// The liveness probe failed before shutdown was initiated
    LivenessFailed,
    /// The run was cancelled from the outside
    Interrupted,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed => write!(f, "completed"),
            RunOutcome::LivenessFailed => write!(f, "liveness_failed"),
            RunOutcome::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Main conductor that coordinates the process, the probes and the traffic
pub struct Conductor<P, H, T>
where
    P: Probe + 'static,
    H: ProcessHandler + 'static,
    T: TrafficSimulator + 'static,
{
    liveness: Arc<P>,
    readiness: Arc<P>,
    process: Arc<H>,
    traffic: Arc<T>,
    shutdown: ShutdownConfig,
}

impl Conductor<HttpProbe, ProcessSupervisor, HttpTrafficSimulator> {
    /// Build a conductor wired to the real HTTP and process implementations
    pub fn from_config(config: &Config) -> CheckerResult<Self> {
        Ok(Self::new(
            HttpProbe::from_config(ProbeKind::Liveness, &config.liveness_probe, &config.identity)?,
            HttpProbe::from_config(ProbeKind::Readiness, &config.readiness_probe, &config.identity)?,
            ProcessSupervisor::new(config.process.clone()),
            HttpTrafficSimulator::from_config(&config.traffic, &config.identity)?,
            config.shutdown,
        ))
    }
}

/// Mutable bookkeeping of a single run, owned by the event loop
struct RunState {
    phase: Phase,
    outcome: RunOutcome,
    run_scope: CancellationToken,
    probe_scope: CancellationToken,
    traffic_scope: Option<CancellationToken>,
    probes_started: bool,
    shutdown_scheduled: bool,
    settle_deadline: Option<Instant>,
    workers: TaskTracker,
}

impl RunState {
    fn new(cancel: &CancellationToken) -> Self {
        let run_scope = cancel.child_token();
        let probe_scope = run_scope.child_token();

        Self {
            phase: Phase::Init,
            outcome: RunOutcome::Completed,
            run_scope,
            probe_scope,
            traffic_scope: None,
            probes_started: false,
            shutdown_scheduled: false,
            settle_deadline: None,
            workers: TaskTracker::new(),
        }
    }

    fn enter(&mut self, next: Phase) -> bool {
        let previous = self.phase;
        let changed = self.phase.advance(next);
        if changed {
            component_info!(Component::Conductor, "Phase {} -> {}", previous, next);
        }
        changed
    }

    fn is_shutting_down(&self) -> bool {
        self.phase >= Phase::ShuttingDown
    }

    fn stop_traffic(&mut self) {
        if let Some(scope) = self.traffic_scope.take() {
            component_debug!(Component::Conductor, "Cancelling traffic scope");
            scope.cancel();
        }
    }

    fn stop_monitoring(&mut self) {
        self.stop_traffic();
        self.probe_scope.cancel();
        self.settle_deadline = None;
    }
}

impl<P, H, T> Conductor<P, H, T>
where
    P: Probe + 'static,
    H: ProcessHandler + 'static,
    T: TrafficSimulator + 'static,
{
    /// Create new conductor with injected dependencies
    pub fn new(liveness: P, readiness: P, process: H, traffic: T, shutdown: ShutdownConfig) -> Self {
        Self {
            liveness: Arc::new(liveness),
            readiness: Arc::new(readiness),
            process: Arc::new(process),
            traffic: Arc::new(traffic),
            shutdown,
        }
    }

    /// Live traffic report, complete once `run` has returned
    pub fn report(&self) -> Arc<SimulationReport> {
        self.traffic.report()
    }

    /// Execute the protocol until the process has exited and every worker stopped.
    ///
    /// Fails only on invalid probe configuration or when the process cannot be
    /// launched. Cancelling `cancel` kills the process and ends the run as
    /// [`RunOutcome::Interrupted`].
    pub async fn run(&self, cancel: CancellationToken) -> CheckerResult<RunOutcome> {
        self.liveness.check()?;
        self.readiness.check()?;

        let (process_tx, mut process_rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let (liveness_tx, mut liveness_rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let (readiness_tx, mut readiness_rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        self.process.notify(process_tx);
        self.liveness.notify(liveness_tx);
        self.readiness.notify(readiness_tx);

        let mut state = RunState::new(&cancel);
        let mut interrupted = false;

        state.enter(Phase::ProcessStarting);
        let mut process_run = self.process.start(state.run_scope.clone());

        let result = loop {
            let settle_deadline = state.settle_deadline;

            tokio::select! {
                result = &mut process_run => break result,

                Some(status) = process_rx.recv() => self.handle_process_status(&mut state, status),

                Some(status) = liveness_rx.recv() => self.handle_liveness_status(&mut state, status),

                Some(status) = readiness_rx.recv() => self.handle_readiness_status(&mut state, status),

                _ = sleep_until(settle_deadline.unwrap_or_else(Instant::now)), if settle_deadline.is_some() => {
                    state.settle_deadline = None;
                    self.begin_shutdown(&mut state);
                }

                // The process observes the same cancellation through the run scope
                _ = cancel.cancelled(), if !interrupted => {
                    interrupted = true;
                    log_shutdown(Component::Conductor, Signal::Kill, "run interrupted");
                    if state.outcome == RunOutcome::Completed {
                        state.outcome = RunOutcome::Interrupted;
                    }
                    state.stop_monitoring();
                }
            }
        };

        state.enter(Phase::Terminated);
        state.run_scope.cancel();
        state.workers.close();
        state.workers.wait().await;

        let exit = result?;
        log_run_finished(Component::Conductor, &state.outcome, &exit);

        Ok(state.outcome)
    }

    fn handle_process_status(&self, state: &mut RunState, status: ProcessStatus) {
        match status {
            ProcessStatus::Running => {
                if state.probes_started {
                    return;
                }
                state.probes_started = true;
                state.enter(Phase::Probing);

                for probe in [&self.liveness, &self.readiness] {
                    let probe = Arc::clone(probe);
                    let scope = state.probe_scope.clone();
                    state.workers.spawn(async move { probe.run(scope).await });
                }
            }
            ProcessStatus::Exited => {
                component_info!(Component::Conductor, "Process exited, stopping monitoring");
                state.enter(Phase::Terminated);
                state.stop_monitoring();
            }
        }
    }

    fn handle_liveness_status(&self, state: &mut RunState, status: ProbeStatus) {
        match status {
            ProbeStatus::Success => component_info!(Component::Conductor, "💚 Service is live"),
            ProbeStatus::Failure if state.is_shutting_down() => {
                component_warn!(Component::Conductor, "Liveness probe failed during shutdown");
            }
            ProbeStatus::Failure => {
                component_error!(Component::Conductor, "💔 Liveness probe failed, aborting the test");
                state.outcome = RunOutcome::LivenessFailed;
                state.stop_monitoring();
                self.begin_shutdown(state);
            }
        }
    }

    fn handle_readiness_status(&self, state: &mut RunState, status: ProbeStatus) {
        match status {
            ProbeStatus::Success if state.is_shutting_down() => {
                component_debug!(Component::Conductor, "Ignoring readiness success during shutdown");
            }
            ProbeStatus::Success => {
                component_info!(Component::Conductor, "🟢 Service is ready, starting traffic");
                self.start_traffic(state);

                if !state.shutdown_scheduled {
                    state.shutdown_scheduled = true;
                    state.settle_deadline = Some(Instant::now() + self.shutdown.settle_period);
                    state.enter(Phase::TrafficFlowing);
                    component_info!(
                        Component::Conductor,
                        "Terminating the service in {:?}",
                        self.shutdown.settle_period
                    );
                }
            }
            ProbeStatus::Failure => {
                component_info!(Component::Conductor, "🔴 Service is not ready, stopping traffic");
                state.stop_traffic();
            }
        }
    }

    fn start_traffic(&self, state: &mut RunState) {
        state.stop_traffic();

        let scope = state.run_scope.child_token();
        self.traffic.simulate(scope.clone(), &state.workers);
        state.traffic_scope = Some(scope);
    }

    fn begin_shutdown(&self, state: &mut RunState) {
        state.settle_deadline = None;
        if !state.enter(Phase::ShuttingDown) {
            return;
        }

        let process = Arc::clone(&self.process);
        let scope = state.run_scope.clone();
        let kill_deadline = self.shutdown.kill_deadline;
        state
            .workers
            .spawn(async move { initiate_shutdown(process.as_ref(), kill_deadline, scope).await });
    }
}

/// Ask the process to terminate, escalating to a kill after `kill_deadline`.
///
/// Returns early once `scope` is cancelled.
pub async fn initiate_shutdown<H>(process: &H, kill_deadline: Duration, scope: CancellationToken)
where
    H: ProcessHandler + ?Sized,
{
    let (tx, mut rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
    process.notify(tx);

    log_shutdown(Component::Conductor, Signal::Terminate, "graceful shutdown initiated");
    process.signal(Signal::Terminate).await;

    let exited = async {
        while let Some(status) = rx.recv().await {
            if status == ProcessStatus::Exited {
                return true;
            }
        }
        false
    };

    tokio::select! {
        _ = scope.cancelled() => {
            component_debug!(Component::Conductor, "Shutdown sequence cancelled");
        }
        result = timeout(kill_deadline, exited) => match result {
            Ok(true) => component_info!(Component::Conductor, "Service exited after terminate signal"),
            Ok(false) => component_debug!(Component::Conductor, "Process status channel closed"),
            Err(_) => {
                component_warn!(
                    Component::Conductor,
                    "⏱️ Service did not exit within {:?}, killing it",
                    kill_deadline
                );
                process.signal(Signal::Kill).await;
            }
        },
    }
}
