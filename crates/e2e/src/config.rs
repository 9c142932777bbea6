//! Harness configuration
//!
//! Resolution order: built-in defaults, then an optional TOML file, then
//! `ADVISOR_E2E_*` environment variables. The runner binary applies its CLI
//! flags last.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::playwright::PlaywrightConfig;
use crate::runner::RunnerConfig;
use crate::server::StackConfig;
use crate::wait::Backoff;

/// Environment exposed to the front end by its build configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppEnv {
    /// Local development port of the front end
    pub port: u16,
    /// Base URL of the backend API
    pub api_url: String,
}

impl Default for AppEnv {
    fn default() -> Self {
        Self {
            port: 3000,
            api_url: "http://localhost:8001".to_string(),
        }
    }
}

impl AppEnv {
    /// Variables handed to the front-end process.
    pub fn vars(&self) -> Vec<(&'static str, String)> {
        vec![
            ("PORT", self.port.to_string()),
            ("NEXT_PUBLIC_API_URL", self.api_url.clone()),
        ]
    }

    pub fn frontend_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}

/// Credentials policy for the session bootstrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Fixed password used for every generated account
    pub password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            password: "password123".to_string(),
        }
    }
}

/// Bounds for every wait the harness performs, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub action_ms: u64,
    pub dialog_ms: u64,
    pub navigation_ms: u64,
    pub auth_ms: u64,
    /// Optimization, backtest and research jobs
    pub job_ms: u64,
    /// Pause after plan creation so secondary data can load
    pub settle_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            action_ms: 10_000,
            dialog_ms: 10_000,
            navigation_ms: 15_000,
            auth_ms: 15_000,
            job_ms: 180_000,
            settle_ms: 500,
        }
    }
}

impl Timeouts {
    pub fn action(&self) -> Duration {
        Duration::from_millis(self.action_ms)
    }

    pub fn dialog(&self) -> Duration {
        Duration::from_millis(self.dialog_ms)
    }

    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn auth(&self) -> Duration {
        Duration::from_millis(self.auth_ms)
    }

    pub fn job(&self) -> Duration {
        Duration::from_millis(self.job_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Complete harness configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub auth: AuthConfig,
    pub timeouts: Timeouts,
    pub backoff: Backoff,
    pub job_backoff: Option<Backoff>,
    pub app: AppEnv,
    pub browser: PlaywrightConfig,
    pub stack: StackConfig,
    pub runner: RunnerConfig,
}

impl HarnessConfig {
    /// Defaults, overlaid with `path` when given, then the process environment.
    pub fn load(path: Option<&Path>) -> E2eResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> E2eResult<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        debug!("Loading harness config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Backoff schedule for long-running backend jobs.
    pub fn job_backoff(&self) -> Backoff {
        self.job_backoff.unwrap_or_else(Backoff::for_jobs)
    }

    /// Overlay `ADVISOR_E2E_*` variables read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> E2eResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ADVISOR_E2E_BASE_URL") {
            self.browser.base_url = v;
        }
        if let Some(v) = lookup("ADVISOR_E2E_PASSWORD") {
            self.auth.password = v;
        }
        if let Some(v) = lookup("ADVISOR_E2E_BROWSER") {
            self.browser.browser = v.parse()?;
        }
        if let Some(v) = lookup("ADVISOR_E2E_HEADLESS") {
            self.browser.headless = parse_bool("ADVISOR_E2E_HEADLESS", &v)?;
        }
        if let Some(v) = lookup("ADVISOR_E2E_JOB_TIMEOUT_MS") {
            self.timeouts.job_ms = parse_number("ADVISOR_E2E_JOB_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("ADVISOR_E2E_MAX_PARALLEL") {
            self.runner.max_parallel = parse_number("ADVISOR_E2E_MAX_PARALLEL", &v)?;
        }
        if let Some(v) = lookup("ADVISOR_E2E_API_URL") {
            self.app.api_url = v;
        }
        if let Some(v) = lookup("ADVISOR_E2E_APP_PORT") {
            self.app.port = parse_number("ADVISOR_E2E_APP_PORT", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> E2eResult<()> {
        reqwest::Url::parse(&self.browser.base_url)
            .map_err(|e| E2eError::Config(format!("base_url '{}': {}", self.browser.base_url, e)))?;
        reqwest::Url::parse(&self.app.api_url)
            .map_err(|e| E2eError::Config(format!("app.api_url '{}': {}", self.app.api_url, e)))?;
        if self.runner.max_parallel == 0 {
            return Err(E2eError::Config("runner.max_parallel must be at least 1".into()));
        }
        if self.auth.password.is_empty() {
            return Err(E2eError::Config("auth.password must not be empty".into()));
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> E2eResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(E2eError::Config(format!("{}: expected a boolean, got '{}'", key, other))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> E2eResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| E2eError::Config(format!("{}: expected a number, got '{}'", key, value)))
}
