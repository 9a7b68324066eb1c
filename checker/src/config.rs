//! Run configuration with the tool's defaults and validation rules

use std::time::Duration;

use serde::Serialize;
use shared::{ClientIdentity, ProbeKind};
use url::Url;

pub use shared::duration::parse_duration;

use crate::core::HISTORY_CAPACITY;
use crate::error::{CheckerError, CheckerResult};

/// Separator between the checker's own flags and the child command
pub const PROCESS_ARGS_SEPARATOR: &str = "--";

/// Health endpoint polling configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeConfig {
    pub target: Url,
    pub request_timeout: Duration,
    pub initial_delay: Duration,
    pub period: Duration,
    pub success_threshold: usize,
    pub failure_threshold: usize,
}

impl ProbeConfig {
    /// Defaults for the liveness probe: `/health` every 10s
    pub fn liveness_default() -> Self {
        Self {
            target: default_url("http://127.0.0.1:8080/health"),
            request_timeout: Duration::from_secs(1),
            initial_delay: Duration::ZERO,
            period: Duration::from_secs(10),
            success_threshold: 1,
            failure_threshold: 3,
        }
    }

    /// Defaults for the readiness probe: `/health/readiness` every 2s
    pub fn readiness_default() -> Self {
        Self {
            target: default_url("http://127.0.0.1:8080/health/readiness"),
            period: Duration::from_secs(2),
            ..Self::liveness_default()
        }
    }

    pub fn validate(&self, kind: ProbeKind) -> CheckerResult<()> {
        validate_http_scheme(&format!("{kind}-probe-target"), &self.target)?;

        if self.request_timeout >= self.period {
            return Err(CheckerError::config(format!(
                "{kind} probe timeout of {:?} must be lower than period {:?}",
                self.request_timeout, self.period
            )));
        }

        for (name, threshold) in [("success", self.success_threshold), ("failure", self.failure_threshold)] {
            if threshold == 0 || threshold > HISTORY_CAPACITY {
                return Err(CheckerError::config(format!(
                    "{kind} probe {name} threshold must be between 1 and {HISTORY_CAPACITY}, got {threshold}"
                )));
            }
        }

        Ok(())
    }
}

/// Synthetic traffic configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficConfig {
    pub target: Url,
    pub request_concurrency: usize,
    pub request_timeout: Duration,
    /// Delay before the response body is consumed, keeps connections open during shutdown
    pub body_read_delay: Duration,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            target: default_url("http://127.0.0.1:8080/"),
            request_concurrency: 2,
            request_timeout: Duration::from_secs(60),
            body_read_delay: Duration::from_secs(5),
        }
    }
}

impl TrafficConfig {
    pub fn validate(&self) -> CheckerResult<()> {
        validate_http_scheme("traffic-target", &self.target)?;

        if self.request_concurrency == 0 {
            return Err(CheckerError::config("traffic request concurrency must be at least 1"));
        }

        if self.request_timeout.is_zero() {
            return Err(CheckerError::config("traffic request timeout must be greater than zero"));
        }

        Ok(())
    }
}

/// Child process to launch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessConfig {
    pub command: String,
    pub arguments: Vec<String>,
}

impl ProcessConfig {
    pub fn new(command: impl Into<String>, arguments: Vec<String>) -> Self {
        Self {
            command: command.into(),
            arguments,
        }
    }

    pub fn validate(&self) -> CheckerResult<()> {
        if self.command.trim().is_empty() {
            return Err(CheckerError::config("invalid command to execute"));
        }
        Ok(())
    }
}

/// Timing of the termination sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShutdownConfig {
    /// Wait after readiness success before sending the termination signal
    pub settle_period: Duration,
    /// Maximum wait for a graceful exit before the process is killed
    pub kill_deadline: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            settle_period: Duration::from_secs(10),
            kill_deadline: Duration::from_secs(30),
        }
    }
}

/// Complete configuration of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub liveness_probe: ProbeConfig,
    pub readiness_probe: ProbeConfig,
    pub traffic: TrafficConfig,
    pub process: ProcessConfig,
    pub shutdown: ShutdownConfig,
    pub identity: ClientIdentity,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            liveness_probe: ProbeConfig::liveness_default(),
            readiness_probe: ProbeConfig::readiness_default(),
            traffic: TrafficConfig::default(),
            process: ProcessConfig::default(),
            shutdown: ShutdownConfig::default(),
            identity: ClientIdentity::current(),
        }
    }
}

impl Config {
    /// Validate every part of the configuration, failing on the first problem
    pub fn validate(&self) -> CheckerResult<()> {
        self.process.validate()?;
        self.liveness_probe.validate(ProbeKind::Liveness)?;
        self.readiness_probe.validate(ProbeKind::Readiness)?;
        self.traffic.validate()?;

        if self.shutdown.kill_deadline.is_zero() {
            return Err(CheckerError::config("kill deadline must be greater than zero"));
        }

        Ok(())
    }
}

/// Parse a target URL supplied for `field`
pub fn parse_url(field: &str, value: &str) -> CheckerResult<Url> {
    Url::parse(value).map_err(|source| CheckerError::InvalidUrl {
        field: field.to_string(),
        value: value.to_string(),
        source,
    })
}

fn validate_http_scheme(field: &str, url: &Url) -> CheckerResult<()> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(CheckerError::config(format!(
            "{field} must be an http(s) URL, got scheme '{other}' in {url}"
        ))),
    }
}

fn default_url(value: &str) -> Url {
    Url::parse(value).expect("built-in default URL")
}

/// Split the raw command line at the first `--`.
///
/// Returns the arguments meant for the checker itself and the child process
/// described by the remainder. Without a separator every argument is kept and
/// the process configuration is empty.
pub fn split_process_args<I, S>(args: I) -> (Vec<String>, ProcessConfig)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut args = args.into_iter().map(Into::into);
    let retained: Vec<String> = args.by_ref().take_while(|arg| arg != PROCESS_ARGS_SEPARATOR).collect();

    let mut process = ProcessConfig::default();
    if let Some(command) = args.next() {
        process.command = command;
        process.arguments = args.collect();
    }

    (retained, process)
}
