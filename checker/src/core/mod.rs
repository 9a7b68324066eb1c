//! Core logic with no I/O dependencies
//!
//! The debounce window, the traffic report and the protocol phases are plain
//! values; the services drive them.

pub mod debounce;
pub mod phase;
pub mod report;

pub use debounce::{StatusWindow, HISTORY_CAPACITY};
pub use phase::Phase;
pub use report::{ErrorEntry, RecordedError, ReportSnapshot, SimulationReport, Verdict, VERDICT_SUCCEED};
