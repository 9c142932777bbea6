//! Playwright browser automation
//!
//! Each [`PlaywrightDriver`] owns one long-lived `node` process running a
//! small Playwright driver script. The process holds a single browser
//! context and page; Rust sends newline-delimited JSON commands on stdin and
//! reads one JSON reply per command from stdout.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::{BrowserLauncher, Page};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(E2eError::Config(format!("unknown browser '{}'", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub screenshot_dir: PathBuf,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub browser: Browser,
    pub headless: bool,
    /// Directory holding the `playwright` npm package
    pub node_modules: PathBuf,
    /// How long the browser may take to launch
    pub launch_timeout_ms: u64,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            viewport_width: 1280,
            viewport_height: 720,
            browser: Browser::Chromium,
            headless: true,
            node_modules: PathBuf::from("node_modules"),
            launch_timeout_ms: 30_000,
        }
    }
}

/// Driver script run by `node`. Launch options arrive through
/// `ADVISOR_E2E_DRIVER_OPTIONS`; stdout carries protocol replies only.
const DRIVER_SCRIPT: &str = r#"
const pw = require('playwright');
const readline = require('readline');

const options = JSON.parse(process.env.ADVISOR_E2E_DRIVER_OPTIONS);

function resolve(page, locator) {
  let current = page;
  for (const step of locator.chain) {
    switch (step.kind) {
      case 'role': {
        const opts = {};
        if (step.name) { opts.name = step.name.text; opts.exact = step.name.exact; }
        if (step.level) { opts.level = step.level; }
        current = current.getByRole(step.role, opts);
        break;
      }
      case 'text': current = current.getByText(step.text, { exact: step.exact }); break;
      case 'label': current = current.getByLabel(step.text, { exact: step.exact }); break;
      case 'placeholder': current = current.getByPlaceholder(step.text, { exact: step.exact }); break;
      case 'title': current = current.getByTitle(step.text, { exact: step.exact }); break;
      default: throw new Error('unknown selector kind ' + step.kind);
    }
  }
  return locator.first ? current.first() : current;
}

async function anyVisible(loc) {
  const n = await loc.count();
  for (let i = 0; i < n; i++) {
    if (await loc.nth(i).isVisible()) { return true; }
  }
  return false;
}

let dialogHandler = null;

function clearDialogHandler(page) {
  if (dialogHandler) {
    page.off('dialog', dialogHandler);
    dialogHandler = null;
  }
}

async function handle(page, cmd) {
  const timeout = cmd.timeout_ms;
  const loc = cmd.locator ? resolve(page, cmd.locator) : null;
  switch (cmd.op) {
    case 'goto': await page.goto(options.base_url + cmd.path, { timeout }); return null;
    case 'click': await loc.click({ timeout }); return null;
    case 'fill': await loc.fill(cmd.value, { timeout }); return null;
    case 'select': await loc.selectOption(cmd.value, { timeout }); return null;
    case 'visible': return await anyVisible(loc);
    case 'count': return await loc.count();
    case 'text': return (await loc.count()) === 0 ? null : await loc.textContent({ timeout });
    case 'attribute': return (await loc.count()) === 0 ? null : await loc.getAttribute(cmd.name, { timeout });
    case 'input_value': return await loc.inputValue({ timeout });
    case 'accept_next_dialog': {
      clearDialogHandler(page);
      const handler = (d) => { clearDialogHandler(page); d.accept(); };
      dialogHandler = handler;
      page.on('dialog', handler);
      return null;
    }
    case 'clear_dialog_handler': clearDialogHandler(page); return null;
    case 'screenshot': await page.screenshot({ path: cmd.path, fullPage: true }); return cmd.path;
    default: throw new Error('unknown op ' + cmd.op);
  }
}

(async () => {
  const browser = await pw[options.browser].launch({ headless: options.headless });
  const context = await browser.newContext({
    viewport: { width: options.viewport_width, height: options.viewport_height },
  });
  const page = await context.newPage();
  const reply = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');
  reply({ id: 0, ok: true, value: 'ready' });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    if (!line.trim()) { continue; }
    const cmd = JSON.parse(line);
    if (cmd.op === 'close') {
      await browser.close();
      reply({ id: cmd.id, ok: true, value: null });
      process.exit(0);
    }
    try {
      const value = await handle(page, cmd);
      reply({ id: cmd.id, ok: true, value: value === undefined ? null : value });
    } catch (error) {
      reply({ id: cmd.id, ok: false, error: error.message });
    }
  }
  await browser.close();
})().catch((error) => {
  console.error(error.stack || String(error));
  process.exit(1);
});
"#;

#[derive(Serialize)]
struct Request<'a> {
    id: u64,
    op: &'a str,
    timeout_ms: u64,
    #[serde(flatten)]
    args: Value,
}

#[derive(Debug, Deserialize)]
struct Response {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<String>,
}

struct DriverIo {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

/// A browser context driven through Playwright.
pub struct PlaywrightDriver {
    config: PlaywrightConfig,
    action_timeout: Duration,
    io: Mutex<DriverIo>,
    child: Mutex<Child>,
    next_id: AtomicU64,
    // Keeps the driver script alive for the process lifetime.
    _script_dir: tempfile::TempDir,
}

impl PlaywrightDriver {
    /// Start a browser with a fresh, isolated context.
    pub async fn launch(config: PlaywrightConfig, action_timeout: Duration) -> E2eResult<Self> {
        check_playwright_installed().await?;
        std::fs::create_dir_all(&config.screenshot_dir)?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, DRIVER_SCRIPT)?;

        let options = json!({
            "base_url": config.base_url.trim_end_matches('/'),
            "browser": config.browser.as_str(),
            "headless": config.headless,
            "viewport_width": config.viewport_width,
            "viewport_height": config.viewport_height,
        });

        debug!("Launching Playwright driver: {}", script_path.display());

        let mut cmd = Command::new("node");
        cmd.arg(&script_path)
            .env("ADVISOR_E2E_DRIVER_OPTIONS", options.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(node_path) = resolve_node_modules(&config.node_modules) {
            cmd.env("NODE_PATH", node_path);
        }

        let mut child = cmd.spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Driver("driver stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Driver("driver stdout unavailable".into()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!(target: "playwright", "{}", line);
                }
            });
        }

        let mut io = DriverIo {
            stdin,
            stdout: BufReader::new(stdout).lines(),
        };

        let launch_timeout = Duration::from_millis(config.launch_timeout_ms);
        let ready = tokio::time::timeout(launch_timeout, read_response(&mut io.stdout, 0))
            .await
            .map_err(|_| E2eError::Timeout {
                what: format!("{} to launch", config.browser.as_str()),
                waited_ms: config.launch_timeout_ms,
            })??;
        if !ready.ok {
            return Err(E2eError::Driver(ready.error.unwrap_or_else(|| "launch failed".into())));
        }

        info!(
            "Playwright {} ready ({}x{}, headless={})",
            config.browser.as_str(),
            config.viewport_width,
            config.viewport_height,
            config.headless
        );

        Ok(Self {
            config,
            action_timeout,
            io: Mutex::new(io),
            child: Mutex::new(child),
            next_id: AtomicU64::new(1),
            _script_dir: script_dir,
        })
    }

    pub fn config(&self) -> &PlaywrightConfig {
        &self.config
    }

    async fn request(&self, op: &str, args: Value) -> E2eResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let timeout_ms = self.action_timeout.as_millis() as u64;
        let line = serde_json::to_string(&Request { id, op, timeout_ms, args })?;
        trace!("-> {}", line);

        let mut io = self.io.lock().await;
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.write_all(b"\n").await?;
        io.stdin.flush().await?;

        // Playwright enforces its own timeout; the slack covers IPC.
        let bound = self.action_timeout + Duration::from_secs(5);
        let response = tokio::time::timeout(bound, read_response(&mut io.stdout, id))
            .await
            .map_err(|_| E2eError::Timeout {
                what: format!("driver reply to '{}'", op),
                waited_ms: bound.as_millis() as u64,
            })??;

        if response.ok {
            Ok(response.value)
        } else {
            Err(E2eError::Driver(format!(
                "{}: {}",
                op,
                response.error.unwrap_or_else(|| "unknown error".into())
            )))
        }
    }

    async fn locator_request(&self, op: &str, locator: &Locator, mut extra: Value) -> E2eResult<Value> {
        let mut args = json!({ "locator": locator });
        if let (Some(args), Some(extra)) = (args.as_object_mut(), extra.as_object_mut()) {
            args.append(extra);
        }
        self.request(op, args).await
    }

    /// Close the browser and wait for the driver to exit.
    pub async fn shutdown(&self) -> E2eResult<()> {
        let result = self.request("close", json!({})).await;
        let mut child = self.child.lock().await;
        if result.is_err() {
            let _ = child.start_kill();
        }
        let _ = child.wait().await;
        result.map(|_| ())
    }
}

async fn read_response(lines: &mut Lines<BufReader<ChildStdout>>, id: u64) -> E2eResult<Response> {
    loop {
        let line = lines
            .next_line()
            .await?
            .ok_or_else(|| E2eError::Driver("driver exited unexpectedly".into()))?;
        trace!("<- {}", line);
        match serde_json::from_str::<Response>(&line) {
            Ok(response) if response.id == id => return Ok(response),
            Ok(response) => debug!("Ignoring stale driver reply {}", response.id),
            Err(_) => debug!("Ignoring non-protocol driver output: {}", line),
        }
    }
}

/// Check if Playwright is installed
async fn check_playwright_installed() -> E2eResult<()> {
    let status = Command::new("npx")
        .args(["playwright", "--version"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match status {
        Ok(status) if status.success() => Ok(()),
        _ => Err(E2eError::PlaywrightNotFound),
    }
}

fn resolve_node_modules(dir: &Path) -> Option<PathBuf> {
    std::fs::canonicalize(dir).ok().filter(|p| p.is_dir())
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl Page for PlaywrightDriver {
    async fn goto(&self, path: &str) -> E2eResult<()> {
        self.request("goto", json!({ "path": path })).await.map(|_| ())
    }

    async fn click(&self, locator: &Locator) -> E2eResult<()> {
        self.locator_request("click", locator, json!({})).await.map(|_| ())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        self.locator_request("fill", locator, json!({ "value": value }))
            .await
            .map(|_| ())
    }

    async fn select_option(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        self.locator_request("select", locator, json!({ "value": value }))
            .await
            .map(|_| ())
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        let value = self.locator_request("visible", locator, json!({})).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        let value = self.locator_request("count", locator, json!({})).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn text_content(&self, locator: &Locator) -> E2eResult<Option<String>> {
        let value = self.locator_request("text", locator, json!({})).await?;
        Ok(value_to_string(value))
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> E2eResult<Option<String>> {
        let value = self
            .locator_request("attribute", locator, json!({ "name": name }))
            .await?;
        Ok(value_to_string(value))
    }

    async fn input_value(&self, locator: &Locator) -> E2eResult<String> {
        let value = self.locator_request("input_value", locator, json!({})).await?;
        Ok(value_to_string(value).unwrap_or_default())
    }

    async fn accept_next_dialog(&self) -> E2eResult<()> {
        self.request("accept_next_dialog", json!({})).await.map(|_| ())
    }

    async fn clear_dialog_handler(&self) -> E2eResult<()> {
        self.request("clear_dialog_handler", json!({})).await.map(|_| ())
    }

    async fn screenshot(&self, name: &str) -> E2eResult<Option<PathBuf>> {
        let path = self.config.screenshot_dir.join(format!("{}.png", name));
        let path = if path.is_absolute() {
            path
        } else {
            std::env::current_dir()?.join(path)
        };
        self.request("screenshot", json!({ "path": path.to_string_lossy() }))
            .await?;
        Ok(Some(path))
    }

    async fn close(&self) -> E2eResult<()> {
        self.shutdown().await
    }
}

/// Launches one Playwright driver per scenario.
pub struct PlaywrightLauncher {
    config: PlaywrightConfig,
    action_timeout: Duration,
}

impl PlaywrightLauncher {
    pub fn new(config: PlaywrightConfig, action_timeout: Duration) -> Self {
        Self { config, action_timeout }
    }
}

#[async_trait]
impl BrowserLauncher for PlaywrightLauncher {
    async fn new_page(&self) -> E2eResult<Arc<dyn Page>> {
        let driver = PlaywrightDriver::launch(self.config.clone(), self.action_timeout).await?;
        Ok(Arc::new(driver))
    }
}
