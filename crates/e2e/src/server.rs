//! Application stack management - spawning and health checking the backend
//! and front end under test

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::config::AppEnv;
use crate::error::{E2eError, E2eResult};

/// Keys removed from the backend environment so it falls back to its mocks.
pub const SCRUBBED_BACKEND_ENV: [&str; 3] = ["GEMINI_API_KEY", "OPENAI_API_KEY", "ALPHA_VANTAGE_API_KEY"];

/// How to start one process of the stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Polled until it answers with a success status
    pub health_url: String,
}

/// Configuration for spawning the application under test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    pub backend: Option<ProcessSpec>,
    pub frontend: Option<ProcessSpec>,
    /// `host:port` of the Firestore emulator the backend stores data in
    pub emulator_host: String,
    pub startup_timeout_ms: u64,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            backend: None,
            frontend: None,
            emulator_host: "localhost:8080".to_string(),
            startup_timeout_ms: 60_000,
        }
    }
}

impl StackConfig {
    /// Backend and front end started from a source checkout with the usual
    /// commands.
    pub fn local_checkout(app: &AppEnv) -> Self {
        Self {
            backend: Some(ProcessSpec {
                program: "python".to_string(),
                args: vec!["start_test_server.py".to_string()],
                cwd: Some(PathBuf::from("backend")),
                env: BTreeMap::new(),
                health_url: format!("{}/", app.api_url.trim_end_matches('/')),
            }),
            frontend: Some(ProcessSpec {
                program: "npm".to_string(),
                args: vec!["run".to_string(), "dev".to_string()],
                cwd: Some(PathBuf::from("frontend")),
                env: BTreeMap::new(),
                health_url: app.frontend_url(),
            }),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.backend.is_none() && self.frontend.is_none()
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }
}

/// Handle to a running process of the stack
pub struct ManagedProcess {
    name: String,
    child: Child,
    health_url: String,
}

impl ManagedProcess {
    /// Spawn `spec` with `extra_env` applied and `scrub` removed.
    pub async fn spawn(
        name: &str,
        spec: &ProcessSpec,
        extra_env: &[(&str, String)],
        scrub: &[&str],
        startup_timeout: Duration,
    ) -> E2eResult<Self> {
        info!("Spawning {}: {} {}", name, spec.program, spec.args.join(" "));

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }
        for key in scrub {
            cmd.env_remove(key);
        }
        for (key, value) in extra_env {
            cmd.env(key, value);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }
        cmd.stdout(Stdio::null()).stderr(Stdio::null());

        let child = cmd.spawn().map_err(|e| {
            E2eError::ServerStartup(format!("Failed to spawn {} ({}): {}", name, spec.program, e))
        })?;

        let mut handle = ManagedProcess {
            name: name.to_string(),
            child,
            health_url: spec.health_url.clone(),
        };

        if let Err(e) = handle.wait_for_healthy(startup_timeout).await {
            let _ = handle.stop();
            return Err(e);
        }

        info!("{} is healthy at {}", name, handle.health_url);
        Ok(handle)
    }

    /// Wait for the process to respond to health checks
    async fn wait_for_healthy(&mut self, timeout_duration: Duration) -> E2eResult<()> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            if let Ok(Some(status)) = self.child.try_wait() {
                return Err(E2eError::ServerStartup(format!(
                    "{} exited during startup with {}",
                    self.name, status
                )));
            }

            match client.get(&self.health_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("{} health check returned {}", self.name, resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for {} to start...", self.name);
                    }
                    // Connection refused is expected while starting
                    if !e.is_connect() {
                        warn!("{} health check error: {}", self.name, e);
                    }
                }
            }

            sleep(Duration::from_millis(250)).await;
        }

        Err(E2eError::ServerHealthCheck {
            url: self.health_url.clone(),
            attempts,
        })
    }

    pub fn health_url(&self) -> &str {
        &self.health_url
    }

    /// Stop the process
    pub fn stop(&mut self) -> E2eResult<()> {
        if let Ok(Some(_)) = self.child.try_wait() {
            return Ok(());
        }
        info!("Stopping {} (pid: {})", self.name, self.child.id());

        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        // Force kill if still running
        let _ = self.child.kill();
        let _ = self.child.wait();

        Ok(())
    }
}

impl Drop for ManagedProcess {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// The backend and front end, started in dependency order.
#[derive(Default)]
pub struct AppStack {
    // Field order drops the front end before the backend it talks to.
    frontend: Option<ManagedProcess>,
    backend: Option<ManagedProcess>,
}

impl AppStack {
    pub async fn start(config: &StackConfig, app: &AppEnv) -> E2eResult<Self> {
        let mut stack = AppStack::default();

        if let Some(spec) = &config.backend {
            check_emulator(&config.emulator_host).await?;
            let env = vec![
                ("GCP_PROJECT_ID", "test-project".to_string()),
                ("FIRESTORE_EMULATOR_HOST", config.emulator_host.clone()),
            ];
            stack.backend = Some(
                ManagedProcess::spawn(
                    "backend",
                    spec,
                    &env,
                    &SCRUBBED_BACKEND_ENV,
                    config.startup_timeout(),
                )
                .await?,
            );
        }

        if let Some(spec) = &config.frontend {
            stack.frontend = Some(
                ManagedProcess::spawn("frontend", spec, &app.vars(), &[], config.startup_timeout())
                    .await?,
            );
        }

        Ok(stack)
    }

    pub fn stop(&mut self) {
        if let Some(mut frontend) = self.frontend.take() {
            let _ = frontend.stop();
        }
        if let Some(mut backend) = self.backend.take() {
            let _ = backend.stop();
        }
    }
}

/// Fail fast when the emulator the backend depends on is down.
pub async fn check_emulator(host: &str) -> E2eResult<()> {
    info!("Checking Firestore emulator at {}", host);
    match timeout(Duration::from_secs(2), tokio::net::TcpStream::connect(host)).await {
        Ok(Ok(_)) => Ok(()),
        _ => Err(E2eError::EmulatorUnreachable(host.to_string())),
    }
}
