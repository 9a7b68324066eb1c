//! Conductor protocol tests
//!
//! These drive the conductor against scripted fakes and mockall mocks on a
//! paused clock, so every settle and kill deadline is checked exactly.

use std::io;
use std::time::Duration;

use checker::{
    CheckerError, Conductor, MockProbe, MockProcessHandler, MockTrafficSimulator, RunOutcome, ShutdownConfig,
};
use shared::{ProbeKind, ProbeStatus, Signal};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

mod common;
use common::{FakeProbe, FakeProcess, FakeTraffic};

const SETTLE: Duration = Duration::from_secs(10);
const KILL_DEADLINE: Duration = Duration::from_secs(30);

fn shutdown_config() -> ShutdownConfig {
    ShutdownConfig {
        settle_period: SETTLE,
        kill_deadline: KILL_DEADLINE,
    }
}

fn conductor(
    liveness: &FakeProbe,
    readiness: &FakeProbe,
    process: &FakeProcess,
    traffic: &FakeTraffic,
) -> Conductor<FakeProbe, FakeProcess, FakeTraffic> {
    Conductor::new(
        liveness.clone(),
        readiness.clone(),
        process.clone(),
        traffic.clone(),
        shutdown_config(),
    )
}

/// Test the full graceful protocol: ready, settle, terminate, exit
#[tokio::test(start_paused = true)]
async fn test_graceful_service_terminates_after_settle_period() {
    // Arrange
    let liveness = FakeProbe::healthy(ProbeKind::Liveness);
    let readiness = FakeProbe::healthy(ProbeKind::Readiness);
    let process = FakeProcess::graceful();
    let traffic = FakeTraffic::new();
    let conductor = conductor(&liveness, &readiness, &process, &traffic);
    let started = Instant::now();

    // Act
    let outcome = conductor.run(CancellationToken::new()).await.unwrap();

    // Assert
    assert_eq!(outcome, RunOutcome::Completed);

    let signals = process.signals();
    assert_eq!(signals.len(), 1, "Only the terminate signal is needed");
    assert_eq!(signals[0].0, Signal::Terminate);
    assert_eq!(signals[0].1 - started, SETTLE);

    assert_eq!(liveness.runs(), 1);
    assert_eq!(readiness.runs(), 1);
    assert_eq!(traffic.simulations(), 1);

    let report = conductor.report();
    assert!(report.total() > 0, "Traffic flowed during the settle period");
    assert_eq!(report.error_count(), 0);
    assert!(report.snapshot().verdict.is_success());
}

/// Test that a process ignoring SIGTERM is killed exactly at the deadline
#[tokio::test(start_paused = true)]
async fn test_stuck_service_is_killed_at_deadline() {
    // Arrange
    let liveness = FakeProbe::healthy(ProbeKind::Liveness);
    let readiness = FakeProbe::healthy(ProbeKind::Readiness);
    let process = FakeProcess::stuck();
    let traffic = FakeTraffic::new();
    let conductor = conductor(&liveness, &readiness, &process, &traffic);

    // Act
    let outcome = conductor.run(CancellationToken::new()).await.unwrap();

    // Assert
    assert_eq!(outcome, RunOutcome::Completed);

    let signals = process.signals();
    assert_eq!(signals.len(), 2);
    assert_eq!(signals[0].0, Signal::Terminate);
    assert_eq!(signals[1].0, Signal::Kill);
    assert_eq!(signals[1].1 - signals[0].1, KILL_DEADLINE);
}

/// Test that probing never starts before the service reported it is running
#[tokio::test(start_paused = true)]
async fn test_no_traffic_without_readiness() {
    // Arrange
    let liveness = FakeProbe::healthy(ProbeKind::Liveness);
    let readiness = FakeProbe::silent(ProbeKind::Readiness);
    let process = FakeProcess::graceful();
    let traffic = FakeTraffic::new();
    let conductor = conductor(&liveness, &readiness, &process, &traffic);
    let cancel = CancellationToken::new();

    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            cancel.cancel();
        })
    };

    // Act
    let outcome = conductor.run(cancel).await.unwrap();
    interrupt.await.unwrap();

    // Assert
    assert_eq!(outcome, RunOutcome::Interrupted);
    assert_eq!(traffic.simulations(), 0);
    assert!(process.signals().is_empty(), "Interrupted runs kill through cancellation");
    assert_eq!(conductor.report().total(), 0);
}

/// Test that a liveness failure aborts the protocol and shuts the service down
#[tokio::test(start_paused = true)]
async fn test_liveness_failure_initiates_shutdown() {
    // Arrange
    let liveness = FakeProbe::new(
        ProbeKind::Liveness,
        vec![(Duration::from_secs(3), ProbeStatus::Failure)],
    );
    let readiness = FakeProbe::silent(ProbeKind::Readiness);
    let process = FakeProcess::graceful();
    let traffic = FakeTraffic::new();
    let conductor = conductor(&liveness, &readiness, &process, &traffic);
    let started = Instant::now();

    // Act
    let outcome = conductor.run(CancellationToken::new()).await.unwrap();

    // Assert
    assert_eq!(outcome, RunOutcome::LivenessFailed);
    let signals = process.signals();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].0, Signal::Terminate);
    assert_eq!(signals[0].1 - started, Duration::from_secs(3), "No settle period after a liveness failure");
    assert_eq!(traffic.simulations(), 0);
}

/// Test that readiness loss pauses traffic and a recovery restarts it
#[tokio::test(start_paused = true)]
async fn test_readiness_flap_restarts_traffic_once_scheduled() {
    // Arrange
    let liveness = FakeProbe::healthy(ProbeKind::Liveness);
    let readiness = FakeProbe::new(
        ProbeKind::Readiness,
        vec![
            (Duration::ZERO, ProbeStatus::Success),
            (Duration::from_secs(2), ProbeStatus::Failure),
            (Duration::from_secs(2), ProbeStatus::Success),
        ],
    );
    let process = FakeProcess::graceful();
    let traffic = FakeTraffic::new();
    let conductor = conductor(&liveness, &readiness, &process, &traffic);
    let started = Instant::now();

    // Act
    let outcome = conductor.run(CancellationToken::new()).await.unwrap();

    // Assert
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(traffic.simulations(), 2, "Traffic restarts after readiness recovers");

    let signals = process.signals();
    assert_eq!(signals.len(), 1, "Shutdown is scheduled only once");
    assert_eq!(signals[0].1 - started, SETTLE, "Settle period counts from the first readiness success");
}

/// Test that the top-level cancellation interrupts a run in progress
#[tokio::test(start_paused = true)]
async fn test_interrupt_during_traffic() {
    // Arrange
    let liveness = FakeProbe::healthy(ProbeKind::Liveness);
    let readiness = FakeProbe::healthy(ProbeKind::Readiness);
    let process = FakeProcess::graceful();
    let traffic = FakeTraffic::new();
    let conductor = conductor(&liveness, &readiness, &process, &traffic);
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            cancel.cancel();
        });
    }

    // Act
    let outcome = conductor.run(cancel).await.unwrap();

    // Assert
    assert_eq!(outcome, RunOutcome::Interrupted);
    assert!(process.signals().is_empty());

    // Workers are gone: the report no longer changes
    let total = conductor.report().total();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(conductor.report().total(), total);
}

fn passing_probe() -> MockProbe {
    let mut probe = MockProbe::new();
    probe.expect_check().returning(|| Ok(()));
    probe.expect_notify().returning(|_| ());
    probe.expect_run().times(0);
    probe
}

fn idle_traffic() -> MockTrafficSimulator {
    let mut traffic = MockTrafficSimulator::new();
    traffic.expect_simulate().times(0);
    traffic
}

/// Test that a launch failure is returned from the run
#[tokio::test]
async fn test_launch_failure_is_fatal() {
    // Arrange
    let mut process = MockProcessHandler::new();
    process.expect_notify().returning(|_| ());
    process.expect_start().times(1).returning(|_| {
        Err(CheckerError::Launch {
            command: "/missing/service".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        })
    });
    process.expect_signal().times(0);

    let conductor = Conductor::new(passing_probe(), passing_probe(), process, idle_traffic(), shutdown_config());

    // Act
    let result = conductor.run(CancellationToken::new()).await;

    // Assert
    let err = result.unwrap_err();
    assert!(matches!(err, CheckerError::Launch { .. }));
    assert!(err.is_fatal());
}

/// Test that an invalid probe configuration stops the run before launch
#[tokio::test]
async fn test_invalid_probe_configuration_prevents_launch() {
    // Arrange
    let mut liveness = MockProbe::new();
    liveness
        .expect_check()
        .returning(|| Err(CheckerError::config("liveness probe timeout of 10s must be lower than period 10s")));

    let mut process = MockProcessHandler::new();
    process.expect_start().times(0);

    let conductor = Conductor::new(liveness, passing_probe(), process, idle_traffic(), shutdown_config());

    // Act
    let result = conductor.run(CancellationToken::new()).await;

    // Assert
    assert!(matches!(result, Err(CheckerError::Configuration { .. })));
}
