//! Status vocabulary shared by the checker and the demo service

use serde::{Deserialize, Serialize};
use std::fmt;

/// Debounced result of a health or readiness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Success,
    Failure,
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Success => write!(f, "success"),
            ProbeStatus::Failure => write!(f, "failure"),
        }
    }
}

/// Lifecycle status of the supervised child process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Running,
    Exited,
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessStatus::Running => write!(f, "running"),
            ProcessStatus::Exited => write!(f, "exited"),
        }
    }
}

/// Signal requests accepted by the process supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// Platform graceful-termination signal (SIGTERM)
    Terminate,
    /// Forceful kill (SIGKILL)
    Kill,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Terminate => write!(f, "terminate"),
            Signal::Kill => write!(f, "kill"),
        }
    }
}

/// Which of the two probes a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Liveness,
    Readiness,
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeKind::Liveness => write!(f, "liveness"),
            ProbeKind::Readiness => write!(f, "readiness"),
        }
    }
}

/// Identity attached to every log line emitted through the component macros
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Conductor,
    Probe(ProbeKind),
    Supervisor,
    Traffic,
    DemoServer,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Conductor => write!(f, "conductor"),
            Component::Probe(kind) => write!(f, "{kind}_probe"),
            Component::Supervisor => write!(f, "supervisor"),
            Component::Traffic => write!(f, "traffic"),
            Component::DemoServer => write!(f, "demo_server"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_display() {
        assert_eq!(Component::Conductor.to_string(), "conductor");
        assert_eq!(Component::Probe(ProbeKind::Liveness).to_string(), "liveness_probe");
        assert_eq!(Component::Probe(ProbeKind::Readiness).to_string(), "readiness_probe");
        assert_eq!(Component::Supervisor.to_string(), "supervisor");
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ProbeStatus::Failure.to_string(), "failure");
        assert_eq!(ProcessStatus::Exited.to_string(), "exited");
        assert_eq!(Signal::Terminate.to_string(), "terminate");
    }
}
