//! Shared types for the graceful shutdown checker
//!
//! Contains the status vocabulary exchanged between components, the
//! component-aware logging macros and the build identity handed to HTTP
//! clients.

pub mod duration;
pub mod logging;
pub mod types;
pub mod version;

pub use duration::parse_duration;
pub use types::*;
pub use version::{ClientIdentity, PROJECT_NAME};
