//! Human friendly duration parsing shared by the command line tools

use std::time::Duration;

/// Parse durations such as `500ms`, `2s`, `1m30s` or `1h`
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value.trim()).map_err(|e| format!("invalid duration '{}': {e}", value.trim()))
}
