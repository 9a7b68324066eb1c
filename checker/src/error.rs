//! Checker-specific error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckerError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid URL for {field}: {value}")]
    InvalidUrl {
        field: String,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to launch process '{command}': {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Signal delivery failed: {message}")]
    Signal { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CheckerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// True for errors that stop the run before any report could be produced
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::InvalidUrl { .. } | Self::Launch { .. })
    }
}

pub type CheckerResult<T> = Result<T, CheckerError>;

/// Why a single probe check counted as a failure
#[derive(Error, Debug)]
pub enum CheckFailure {
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("failed to read response: {0}")]
    Body(#[source] reqwest::Error),

    #[error("bad response code: {0}")]
    BadStatus(u16),
}

impl CheckFailure {
    /// Short class name used as a structured log field
    pub fn class(&self) -> &'static str {
        match self {
            CheckFailure::Transport(_) => "transport",
            CheckFailure::Body(_) => "body",
            CheckFailure::BadStatus(_) => "status",
        }
    }
}

/// Why a single simulated request counted as an error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrafficError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("unexpected status code: {0}")]
    BadStatus(u16),
}
