//! Conductor protocol phases

use std::fmt;

use serde::Serialize;

/// Where a run stands in the shutdown test protocol.
///
/// Phases only move forward; a run never returns to an earlier phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Init,
    ProcessStarting,
    Probing,
    TrafficFlowing,
    ShuttingDown,
    Terminated,
}

impl Phase {
    /// Move to `next` if it lies ahead, returning whether the phase changed
    pub fn advance(&mut self, next: Phase) -> bool {
        if next > *self {
            *self = next;
            true
        } else {
            false
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Init => "init",
            Phase::ProcessStarting => "process_starting",
            Phase::Probing => "probing",
            Phase::TrafficFlowing => "traffic_flowing",
            Phase::ShuttingDown => "shutting_down",
            Phase::Terminated => "terminated",
        };
        write!(f, "{name}")
    }
}
