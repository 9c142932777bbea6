//! Scenario runner: one isolated browser context per scenario

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult};
use crate::naming::UniqueNames;
use crate::page::BrowserLauncher;
use crate::playwright::PlaywrightLauncher;
use crate::scenarios::{self, Area, Scenario};
use crate::server::{AppStack, StackConfig};
use crate::session::Session;

/// Configuration for the test runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Where `results.json` is written
    pub output_dir: PathBuf,
    /// Browser contexts allowed to run at the same time
    pub max_parallel: usize,
    pub screenshot_on_failure: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("test-results"),
            max_parallel: 1,
            screenshot_on_failure: true,
        }
    }
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub area: Area,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Account registered for this context, if any
    pub username: Option<String>,
    pub error: Option<String>,
    pub timed_out: bool,
    pub screenshot: Option<PathBuf>,
}

/// Result of running a set of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl TestSuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.results.iter().filter(|r| !r.success)
    }
}

/// Main E2E test runner
pub struct TestRunner {
    config: Arc<HarnessConfig>,
    /// Injected launcher; Playwright is used when absent
    launcher: Option<Arc<dyn BrowserLauncher>>,
    stack: Option<AppStack>,
}

impl TestRunner {
    /// Runner driving real browsers through Playwright.
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config: Arc::new(config),
            launcher: None,
            stack: None,
        }
    }

    /// Runner opening pages through `launcher`.
    pub fn with_launcher(config: HarnessConfig, launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            config: Arc::new(config),
            launcher: Some(launcher),
            stack: None,
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Start the backend and front end described by the stack configuration.
    pub async fn start_stack(&mut self) -> E2eResult<()> {
        if self.stack.is_some() {
            return Ok(());
        }
        let config = Arc::make_mut(&mut self.config);
        if config.stack.is_empty() {
            config.stack = StackConfig::local_checkout(&config.app);
        }

        let stack = AppStack::start(&config.stack, &config.app).await?;
        if config.stack.frontend.is_some() {
            config.browser.base_url = config.app.frontend_url();
        }
        self.stack = Some(stack);
        Ok(())
    }

    pub fn stop_stack(&mut self) {
        if let Some(mut stack) = self.stack.take() {
            stack.stop();
        }
    }

    pub async fn run_all(&self) -> TestSuiteResult {
        self.run_scenarios(&scenarios::all()).await
    }

    pub async fn run_area(&self, area: Area) -> TestSuiteResult {
        self.run_scenarios(&scenarios::by_area(area)).await
    }

    pub async fn run_named(&self, name: &str) -> E2eResult<TestSuiteResult> {
        let scenario = scenarios::find(name)?;
        Ok(self.run_scenarios(&[scenario]).await)
    }

    /// Run `scenarios` with at most `max_parallel` contexts alive at once.
    /// Results keep the order of `scenarios`.
    pub async fn run_scenarios(&self, scenarios: &[Scenario]) -> TestSuiteResult {
        let start = Instant::now();
        let parallel = self.config.runner.max_parallel.max(1);
        let launcher = self.launcher();

        info!("Running {} scenario(s), {} at a time...", scenarios.len(), parallel);

        let results: Vec<ScenarioResult> = stream::iter(scenarios.iter())
            .map(|scenario| self.run_one(launcher.as_ref(), scenario))
            .buffered(parallel)
            .collect()
            .await;

        let passed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!("Test Results: {} passed, {} failed ({} ms)", passed, failed, duration_ms);

        TestSuiteResult {
            total: results.len(),
            passed,
            failed,
            duration_ms,
            results,
        }
    }

    /// Run one scenario in a fresh context. Never fails: every error ends up
    /// in the returned result.
    pub async fn run_one(&self, launcher: &dyn BrowserLauncher, scenario: &Scenario) -> ScenarioResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let span = info_span!("scenario", name = scenario.name);

        let outcome = self.execute(launcher, scenario).instrument(span).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (result, screenshot, username) = match outcome {
            Ok(parts) => parts,
            Err(e) => (Err(e), None, None),
        };

        match &result {
            Ok(()) => info!("✓ {} ({} ms)", scenario.name, duration_ms),
            Err(e) => error!("✗ {} - {}", scenario.name, e),
        }

        ScenarioResult {
            name: scenario.name.to_string(),
            area: scenario.area,
            success: result.is_ok(),
            started_at,
            duration_ms,
            username,
            timed_out: result.as_ref().err().map(E2eError::is_timeout).unwrap_or(false),
            error: result.err().map(|e| e.to_string()),
            screenshot,
        }
    }

    async fn execute(
        &self,
        launcher: &dyn BrowserLauncher,
        scenario: &Scenario,
    ) -> E2eResult<(E2eResult<()>, Option<PathBuf>, Option<String>)> {
        let page = launcher.new_page().await?;
        let names = UniqueNames::new();
        debug!("Scenario {} uses name tag {}", scenario.name, names.tag());
        let session = Session::new(page.clone(), self.config.clone(), names);

        let result = (scenario.run)(&session).await;

        let mut screenshot = None;
        if result.is_err() && self.config.runner.screenshot_on_failure {
            let file = scenario.name.replace('/', "-");
            match page.screenshot(&file).await {
                Ok(path) => screenshot = path,
                Err(e) => warn!("Failed to capture screenshot for {}: {}", scenario.name, e),
            }
        }

        let username = session.credentials().await.map(|c| c.username);
        if let Err(e) = page.close().await {
            warn!("Failed to close context for {}: {}", scenario.name, e);
        }

        Ok((result, screenshot, username))
    }

    fn launcher(&self) -> Arc<dyn BrowserLauncher> {
        match &self.launcher {
            Some(launcher) => launcher.clone(),
            None => Arc::new(PlaywrightLauncher::new(
                self.config.browser.clone(),
                self.config.timeouts.action(),
            )),
        }
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        let output_dir = &self.config.runner.output_dir;
        std::fs::create_dir_all(output_dir)?;

        let path = output_dir.join("results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Drop for TestRunner {
    fn drop(&mut self) {
        self.stop_stack();
    }
}
