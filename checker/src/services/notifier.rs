//! One-to-many delivery of status transitions
//!
//! Publishers never wait on subscribers: every subscriber owns a bounded
//! inbox and a full inbox drops the value with a warning.

use std::fmt::Display;
use std::sync::{Mutex, PoisonError};

use shared::{component_debug, component_warn, Component};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Inbox size subscribers should use when creating their channel
pub const SUBSCRIBER_CAPACITY: usize = 16;

/// Registry of subscriber inboxes
#[derive(Debug)]
pub struct Subscribers<T> {
    component: Component,
    senders: Mutex<Vec<mpsc::Sender<T>>>,
}

impl<T: Clone + Display> Subscribers<T> {
    pub fn new(component: Component) -> Self {
        Self {
            component,
            senders: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, sender: mpsc::Sender<T>) {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner).push(sender);
    }

    /// Deliver `value` to every live subscriber without blocking.
    ///
    /// Closed inboxes are removed from the registry.
    pub fn broadcast(&self, value: T) {
        let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);

        senders.retain(|sender| match sender.try_send(value.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                component_warn!(self.component, "Subscriber inbox full, dropped status {}", value);
                true
            }
            Err(TrySendError::Closed(_)) => {
                component_debug!(self.component, "Subscriber gone, removing it");
                false
            }
        });
    }

    pub fn len(&self) -> usize {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
