//! Outbound HTTP client construction

use std::time::Duration;

use shared::ClientIdentity;

use crate::error::CheckerResult;

/// User agent role of the health probes
pub const PROBE_ROLE: &str = "http-probe";

/// User agent role of the traffic simulator
pub const TRAFFIC_ROLE: &str = "traffic-simulator";

/// Build a client tagged with the tool's identity and bounded by `timeout`
pub fn build_client(identity: &ClientIdentity, role: &str, timeout: Duration) -> CheckerResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(identity.user_agent(role))
        .timeout(timeout)
        .build()?;
    Ok(client)
}
