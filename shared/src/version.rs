//! Build identification passed explicitly into HTTP clients

use serde::Serialize;

/// Project name used in user agents and the CLI banner
pub const PROJECT_NAME: &str = "check-graceful-shutdown";

/// Immutable identity of the running tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientIdentity {
    pub project_name: String,
    pub version: String,
    pub git_commit: String,
}

impl ClientIdentity {
    pub fn new(project_name: impl Into<String>, version: impl Into<String>, git_commit: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            version: version.into(),
            git_commit: git_commit.into(),
        }
    }

    /// Identity of this build, commit taken from `CHECK_GRACEFUL_SHUTDOWN_GIT_COMMIT` at compile time
    pub fn current() -> Self {
        Self::new(
            PROJECT_NAME,
            env!("CARGO_PKG_VERSION"),
            option_env!("CHECK_GRACEFUL_SHUTDOWN_GIT_COMMIT").unwrap_or("dirty"),
        )
    }

    /// `User-Agent` header value for a client playing `role`, e.g. `http-probe`
    pub fn user_agent(&self, role: &str) -> String {
        format!("{}/{} {}", self.project_name, self.version, role)
    }

    /// Human readable version line
    pub fn info(&self) -> String {
        format!("version: {}, commit: {}", self.version, self.git_commit)
    }
}

impl Default for ClientIdentity {
    fn default() -> Self {
        Self::current()
    }
}
