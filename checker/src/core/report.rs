//! Aggregated outcome of the simulated traffic

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;

use crate::error::TrafficError;

/// Verdict line printed when no request failed
pub const VERDICT_SUCCEED: &str = "GRACEFUL SHUTDOWN SUCCEED";

/// One failed request as kept in the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedError {
    pub status_code: u16,
    pub elapsed: Duration,
    pub error: TrafficError,
}

#[derive(Debug, Default)]
struct ReportState {
    status_codes: BTreeMap<u16, u64>,
    errors: Vec<RecordedError>,
    recorded: u64,
}

/// Report shared by all traffic workers.
///
/// Writers serialize on a single write lock; readers may run concurrently
/// with ongoing writes and always see a consistent state.
#[derive(Debug, Default)]
pub struct SimulationReport {
    state: RwLock<ReportState>,
}

impl SimulationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one request. A status code of 0 means no response was received.
    pub fn record(&self, status_code: u16, elapsed: Duration, error: Option<TrafficError>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        state.recorded += 1;

        if let Some(error) = error {
            state.errors.push(RecordedError {
                status_code,
                elapsed,
                error,
            });
        }

        if status_code > 0 {
            *state.status_codes.entry(status_code).or_insert(0) += 1;
        }
    }

    /// Number of outcomes recorded so far
    pub fn total(&self) -> u64 {
        self.state.read().unwrap_or_else(PoisonError::into_inner).recorded
    }

    pub fn error_count(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).errors.len()
    }

    pub fn count_for(&self, status_code: u16) -> u64 {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.status_codes.get(&status_code).copied().unwrap_or(0)
    }

    pub fn errors(&self) -> Vec<RecordedError> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).errors.clone()
    }

    /// Consistent copy of the report at this instant
    pub fn snapshot(&self) -> ReportSnapshot {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);

        ReportSnapshot {
            status_codes: state
                .status_codes
                .iter()
                .map(|(code, count)| (code.to_string(), *count))
                .collect(),
            total_requests: state.recorded,
            errors: state
                .errors
                .iter()
                .map(|recorded| ErrorEntry {
                    status_code: recorded.status_code,
                    elapsed_ms: recorded.elapsed.as_millis() as u64,
                    message: recorded.error.to_string(),
                })
                .collect(),
            verdict: Verdict::from_error_count(state.errors.len()),
        }
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.snapshot().fmt(f)
    }
}

/// Pass/fail outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum Verdict {
    Succeed,
    Failed { errors: usize },
}

impl Verdict {
    pub fn from_error_count(errors: usize) -> Self {
        if errors == 0 {
            Verdict::Succeed
        } else {
            Verdict::Failed { errors }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Succeed)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Succeed => write!(f, "{VERDICT_SUCCEED}"),
            Verdict::Failed { errors } => write!(f, "GRACEFUL SHUTDOWN FAILED WITH {errors} ERRORS!"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEntry {
    pub status_code: u16,
    pub elapsed_ms: u64,
    pub message: String,
}

/// Immutable, serializable view of a [`SimulationReport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSnapshot {
    pub status_codes: BTreeMap<String, u64>,
    pub total_requests: u64,
    pub errors: Vec<ErrorEntry>,
    pub verdict: Verdict,
}

impl fmt::Display for ReportSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "http response code count:")?;
        for (code, count) in &self.status_codes {
            writeln!(f, "\t{code}: {count}")?;
        }
        writeln!(f)?;
        writeln!(f, "num errors: {}", self.errors.len())?;
        writeln!(f, "{}", self.verdict)
    }
}
