//! Debounced probe status
//!
//! Raw check results are pushed into a bounded history window. The stable
//! status only moves once enough consecutive, most-recent results agree.

use std::collections::VecDeque;

use shared::ProbeStatus;

/// Number of raw results kept in a probe's history
pub const HISTORY_CAPACITY: usize = 10;

/// Bounded history of raw check results plus the stable status derived from it
#[derive(Debug, Clone)]
pub struct StatusWindow {
    /// Most recent result first
    history: VecDeque<ProbeStatus>,
    stable: Option<ProbeStatus>,
    success_threshold: usize,
    failure_threshold: usize,
}

impl StatusWindow {
    /// Create an empty window with an unknown stable status
    pub fn new(success_threshold: usize, failure_threshold: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            stable: None,
            success_threshold,
            failure_threshold,
        }
    }

    /// Record a raw result and return the new stable status if it changed
    pub fn push(&mut self, result: ProbeStatus) -> Option<ProbeStatus> {
        self.history.push_front(result);
        self.history.truncate(HISTORY_CAPACITY);
        self.evaluate()
    }

    fn evaluate(&mut self) -> Option<ProbeStatus> {
        let next = *self.history.front()?;
        if self.stable == Some(next) {
            return None;
        }

        let consecutive = self.history.iter().take_while(|status| **status == next).count();
        if consecutive >= self.threshold_for(next) {
            self.stable = Some(next);
            return Some(next);
        }

        None
    }

    fn threshold_for(&self, status: ProbeStatus) -> usize {
        match status {
            ProbeStatus::Success => self.success_threshold,
            ProbeStatus::Failure => self.failure_threshold,
        }
    }

    /// Current stable status, `None` until a threshold was first reached
    pub fn stable(&self) -> Option<ProbeStatus> {
        self.stable
    }

    /// Raw history, most recent first
    pub fn history(&self) -> impl Iterator<Item = ProbeStatus> + '_ {
        self.history.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
