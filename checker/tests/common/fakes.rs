//! Scripted fakes for the conductor's collaborators
//!
//! Every fake is a cheap handle around shared state, so a test can keep a
//! clone to inspect what the conductor did with the one it was handed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use checker::services::Subscribers;
use checker::{CheckerResult, Probe, ProcessExit, ProcessHandler, SimulationReport, TrafficSimulator};
use shared::{Component, ProbeKind, ProbeStatus, ProcessStatus, Signal};
use tokio::sync::{mpsc, Notify};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Process that reports Running on start and exits once it receives `exits_on`
#[derive(Clone)]
pub struct FakeProcess {
    inner: Arc<FakeProcessInner>,
}

struct FakeProcessInner {
    exits_on: Signal,
    subscribers: Subscribers<ProcessStatus>,
    signals: Mutex<Vec<(Signal, Instant)>>,
    exit: Notify,
}

impl FakeProcess {
    fn exiting_on(exits_on: Signal) -> Self {
        Self {
            inner: Arc::new(FakeProcessInner {
                exits_on,
                subscribers: Subscribers::new(Component::Supervisor),
                signals: Mutex::new(Vec::new()),
                exit: Notify::new(),
            }),
        }
    }

    /// Exits as soon as it is asked to terminate
    pub fn graceful() -> Self {
        Self::exiting_on(Signal::Terminate)
    }

    /// Ignores the terminate signal and only dies when killed
    pub fn stuck() -> Self {
        Self::exiting_on(Signal::Kill)
    }

    /// Signals received so far, with the instant they arrived
    pub fn signals(&self) -> Vec<(Signal, Instant)> {
        self.inner.signals.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessHandler for FakeProcess {
    async fn start(&self, cancel: CancellationToken) -> CheckerResult<ProcessExit> {
        self.inner.subscribers.broadcast(ProcessStatus::Running);

        let exit = tokio::select! {
            _ = cancel.cancelled() => ProcessExit { code: None, success: false },
            _ = self.inner.exit.notified() => ProcessExit { code: Some(0), success: true },
        };

        self.inner.subscribers.broadcast(ProcessStatus::Exited);
        Ok(exit)
    }

    async fn signal(&self, signal: Signal) {
        self.inner.signals.lock().unwrap().push((signal, Instant::now()));
        if signal == self.inner.exits_on {
            self.inner.exit.notify_one();
        }
    }

    fn notify(&self, subscriber: mpsc::Sender<ProcessStatus>) {
        self.inner.subscribers.subscribe(subscriber);
    }
}

/// Probe publishing a scripted sequence of transitions, each after a delay
#[derive(Clone)]
pub struct FakeProbe {
    inner: Arc<FakeProbeInner>,
}

struct FakeProbeInner {
    script: Vec<(Duration, ProbeStatus)>,
    subscribers: Subscribers<ProbeStatus>,
    runs: AtomicUsize,
}

impl FakeProbe {
    pub fn new(kind: ProbeKind, script: Vec<(Duration, ProbeStatus)>) -> Self {
        Self {
            inner: Arc::new(FakeProbeInner {
                script,
                subscribers: Subscribers::new(Component::Probe(kind)),
                runs: AtomicUsize::new(0),
            }),
        }
    }

    /// Probe that never reports anything
    pub fn silent(kind: ProbeKind) -> Self {
        Self::new(kind, Vec::new())
    }

    /// Probe that reports success right away
    pub fn healthy(kind: ProbeKind) -> Self {
        Self::new(kind, vec![(Duration::ZERO, ProbeStatus::Success)])
    }

    pub fn runs(&self) -> usize {
        self.inner.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Probe for FakeProbe {
    fn check(&self) -> CheckerResult<()> {
        Ok(())
    }

    async fn run(&self, cancel: CancellationToken) {
        self.inner.runs.fetch_add(1, Ordering::SeqCst);

        for (delay, status) in &self.inner.script {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = sleep(*delay) => self.inner.subscribers.broadcast(*status),
            }
        }

        cancel.cancelled().await;
    }

    fn notify(&self, subscriber: mpsc::Sender<ProbeStatus>) {
        self.inner.subscribers.subscribe(subscriber);
    }
}

/// Traffic simulator recording one successful request per worker every 100ms
#[derive(Clone)]
pub struct FakeTraffic {
    inner: Arc<FakeTrafficInner>,
}

struct FakeTrafficInner {
    report: Arc<SimulationReport>,
    simulations: AtomicUsize,
}

impl FakeTraffic {
    pub const TICK: Duration = Duration::from_millis(100);

    pub fn new() -> Self {
        Self {
            inner: Arc::new(FakeTrafficInner {
                report: Arc::new(SimulationReport::new()),
                simulations: AtomicUsize::new(0),
            }),
        }
    }

    /// Number of times traffic was started
    pub fn simulations(&self) -> usize {
        self.inner.simulations.load(Ordering::SeqCst)
    }
}

impl TrafficSimulator for FakeTraffic {
    fn simulate(&self, cancel: CancellationToken, tracker: &TaskTracker) {
        self.inner.simulations.fetch_add(1, Ordering::SeqCst);

        let report = Arc::clone(&self.inner.report);
        tracker.spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = sleep(Self::TICK) => report.record(200, Self::TICK, None),
                }
            }
        });
    }

    fn report(&self) -> Arc<SimulationReport> {
        Arc::clone(&self.inner.report)
    }
}
