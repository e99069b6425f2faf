//! Error types for the harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Driver failed to start: {0}")]
    DriverStartup(String),

    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Driver connection closed")]
    DriverClosed,

    #[error("Driver protocol error: {0}")]
    Protocol(String),

    #[error("Driver command '{cmd}' failed: {reason}")]
    CommandFailed { cmd: String, reason: String },

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Site unreachable at {url}: {reason}")]
    SiteUnreachable { url: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
