//! Common test utilities and infrastructure
//!
//! Fakes for the conductor's collaborators and an in-process stub service
//! used across the checker test suites.

#![allow(dead_code)]

pub mod fakes;
pub mod stub_server;

// Re-export commonly used items for convenience
pub use fakes::{FakeProbe, FakeProcess, FakeTraffic};
pub use stub_server::StubServer;
