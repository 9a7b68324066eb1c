//! Service implementations
//!
//! Real implementations of the collaborator traits. These are the ones that
//! perform actual I/O: HTTP requests, process spawning and signal delivery.

pub mod http_client;
pub mod notifier;
pub mod probe;
pub mod process_handler;
pub mod traffic;

#[cfg(test)]
mod tests;

// Re-export all service implementations
pub use notifier::{Subscribers, SUBSCRIBER_CAPACITY};
pub use probe::HttpProbe;
pub use process_handler::{ProcessSupervisor, POLL_INTERVAL};
pub use traffic::HttpTrafficSimulator;
