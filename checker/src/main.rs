//! Main entry point for the check-graceful-shutdown binary
//!
//! Everything after the first `--` is the command of the service under test.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use checker::config::{parse_duration, parse_url, split_process_args};
use checker::{
    CheckerResult, Conductor, Config, ProbeConfig, ReportSnapshot, RunOutcome, ShutdownConfig, TrafficConfig,
};
use shared::logging::{self, log_error, log_startup};
use shared::{component_info, component_warn, ClientIdentity, Component, PROJECT_NAME};

/// Exit code used when a second interrupt forces the tool to stop
const FORCED_EXIT_CODE: i32 = 128 + 143;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

/// Tool to check whether a service supports graceful shutdown
#[derive(Parser, Debug)]
#[command(name = PROJECT_NAME)]
#[command(about = "Tool to check if a service supports graceful shutdown")]
#[command(override_usage = "check-graceful-shutdown [OPTIONS] -- <COMMAND> [ARGS]...")]
#[command(disable_version_flag = true)]
pub struct Args {
    /// HTTP endpoint to simulate traffic to
    #[arg(long, default_value = "http://127.0.0.1:8080/")]
    pub traffic_target: String,

    /// Number of concurrent request loops
    #[arg(long, default_value_t = 2)]
    pub traffic_request_concurrency: usize,

    /// HTTP request timeout of the simulated traffic
    #[arg(long, default_value = "60s", value_parser = parse_duration)]
    pub traffic_request_timeout: Duration,

    /// Delay before reading a response body, keeps connections busy during shutdown
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    pub traffic_body_read_delay: Duration,

    /// HTTP endpoint to perform liveness checks against
    #[arg(long, default_value = "http://127.0.0.1:8080/health")]
    pub liveness_probe_target: String,

    /// Period of liveness checks
    #[arg(long, default_value = "10s", value_parser = parse_duration)]
    pub liveness_probe_period: Duration,

    /// Initial delay before starting with liveness checks
    #[arg(long, default_value = "0s", value_parser = parse_duration)]
    pub liveness_probe_initial_delay: Duration,

    /// HTTP timeout for liveness checks
    #[arg(long, default_value = "1s", value_parser = parse_duration)]
    pub liveness_probe_request_timeout: Duration,

    /// Consecutive liveness checks required to succeed
    #[arg(long, default_value_t = 1)]
    pub liveness_probe_success_threshold: usize,

    /// Consecutive liveness checks required to fail
    #[arg(long, default_value_t = 3)]
    pub liveness_probe_failure_threshold: usize,

    /// HTTP endpoint to perform readiness checks against
    #[arg(long, default_value = "http://127.0.0.1:8080/health/readiness")]
    pub readiness_probe_target: String,

    /// Period of readiness checks
    #[arg(long, default_value = "2s", value_parser = parse_duration)]
    pub readiness_probe_period: Duration,

    /// Initial delay before starting with readiness checks
    #[arg(long, default_value = "0s", value_parser = parse_duration)]
    pub readiness_probe_initial_delay: Duration,

    /// HTTP timeout for readiness checks
    #[arg(long, default_value = "1s", value_parser = parse_duration)]
    pub readiness_probe_request_timeout: Duration,

    /// Consecutive readiness checks required to succeed
    #[arg(long, default_value_t = 1)]
    pub readiness_probe_success_threshold: usize,

    /// Consecutive readiness checks required to fail
    #[arg(long, default_value_t = 3)]
    pub readiness_probe_failure_threshold: usize,

    /// Time traffic flows after the service became ready, before it is terminated
    #[arg(long, default_value = "10s", value_parser = parse_duration)]
    pub settle_period: Duration,

    /// Time the service gets to exit after the terminate signal before it is killed
    #[arg(long, default_value = "30s", value_parser = parse_duration)]
    pub kill_deadline: Duration,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Output format of the final report
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub report_format: ReportFormat,

    /// Print version information and exit
    #[arg(long, short = 'V')]
    pub version: bool,
}

impl Args {
    /// Convert the parsed flags into a run configuration
    pub fn into_config(self, process: checker::ProcessConfig) -> CheckerResult<Config> {
        Ok(Config {
            liveness_probe: ProbeConfig {
                target: parse_url("liveness-probe-target", &self.liveness_probe_target)?,
                request_timeout: self.liveness_probe_request_timeout,
                initial_delay: self.liveness_probe_initial_delay,
                period: self.liveness_probe_period,
                success_threshold: self.liveness_probe_success_threshold,
                failure_threshold: self.liveness_probe_failure_threshold,
            },
            readiness_probe: ProbeConfig {
                target: parse_url("readiness-probe-target", &self.readiness_probe_target)?,
                request_timeout: self.readiness_probe_request_timeout,
                initial_delay: self.readiness_probe_initial_delay,
                period: self.readiness_probe_period,
                success_threshold: self.readiness_probe_success_threshold,
                failure_threshold: self.readiness_probe_failure_threshold,
            },
            traffic: TrafficConfig {
                target: parse_url("traffic-target", &self.traffic_target)?,
                request_concurrency: self.traffic_request_concurrency,
                request_timeout: self.traffic_request_timeout,
                body_read_delay: self.traffic_body_read_delay,
            },
            process,
            shutdown: ShutdownConfig {
                settle_period: self.settle_period,
                kill_deadline: self.kill_deadline,
            },
            identity: ClientIdentity::current(),
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let (retained, process) = split_process_args(std::env::args());
    let args = Args::parse_from(retained);

    if args.version {
        println!("{} {}", PROJECT_NAME, ClientIdentity::current().info());
        return ExitCode::SUCCESS;
    }

    logging::init_tracing(Some(&args.log_level));

    let report_format = args.report_format;
    match run(args, process, report_format).await {
        Ok(outcome) => {
            component_info!(Component::Conductor, "Finished with outcome {}", outcome);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log_error(Component::Conductor, "Graceful shutdown check", &e);
            eprintln!("An error occurred.\nError: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, process: checker::ProcessConfig, report_format: ReportFormat) -> CheckerResult<RunOutcome> {
    let config = args.into_config(process)?;
    config.validate()?;

    log_startup(
        Component::Conductor,
        &format!("{} {}", PROJECT_NAME, config.identity.info()),
        config.traffic.target.as_str(),
    );

    let conductor = Conductor::from_config(&config)?;

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let outcome = conductor.run(cancel).await?;

    let snapshot = conductor.report().snapshot();
    println!("{}", render_report(outcome, &snapshot, report_format)?);

    Ok(outcome)
}

#[derive(Serialize)]
struct RunSummary<'a> {
    outcome: RunOutcome,
    report: &'a ReportSnapshot,
}

/// Render the report together with how the run ended
fn render_report(outcome: RunOutcome, snapshot: &ReportSnapshot, format: ReportFormat) -> CheckerResult<String> {
    match format {
        ReportFormat::Text => {
            let mut rendered = format!("Run outcome: {outcome}\n");
            if outcome != RunOutcome::Completed {
                rendered.push_str("Shutdown protocol did not complete, the verdict only covers the traffic sent\n");
            }
            rendered.push_str(&format!("Report:\n{snapshot}"));
            Ok(rendered)
        }
        ReportFormat::Json => Ok(serde_json::to_string_pretty(&RunSummary {
            outcome,
            report: snapshot,
        })?),
    }
}

/// First interrupt cancels the run, a second one exits immediately
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = wait_for_interrupt().await {
            log_error(Component::Conductor, "Signal handling", &e);
            return;
        }

        component_warn!(Component::Conductor, "Interrupt received, stopping the run");
        cancel.cancel();

        match wait_for_interrupt().await {
            Ok(()) => {
                component_warn!(Component::Conductor, "Second interrupt received, exiting immediately");
                std::process::exit(FORCED_EXIT_CODE);
            }
            Err(e) => log_error(Component::Conductor, "Signal handling", &e),
        }
    });
}

#[cfg(unix)]
async fn wait_for_interrupt() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_interrupt() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
