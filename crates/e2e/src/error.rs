//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server health check failed for {url} after {attempts} attempts")]
    ServerHealthCheck { url: String, attempts: usize },

    #[error("Firestore emulator is not reachable at {0}")]
    EmulatorUnreachable(String),

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Timeout after {waited_ms} ms waiting for: {what}")]
    Timeout { what: String, waited_ms: u64 },

    /// A backend job reached a terminal state other than success.
    #[error("Job '{job}' ended with status '{status}'")]
    JobFailed { job: String, status: String },

    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// True for failures caused by a bounded wait running out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, E2eError::Timeout { .. })
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
