//! ETF Portfolio Advisor E2E Test Framework
//!
//! This crate drives the advisor web application through a real browser and
//! checks user-visible workflows end to end:
//! - Registers a throwaway account per browser context on first use
//! - Creates and deletes plans through the UI, the only way tests get data
//! - Waits on accessible roles, names and labels with bounded polling
//! - Runs scenarios per feature area with one isolated context each
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── start_stack() -> AppStack (backend, front end)       │
//! │    ├── launcher.new_page() -> Arc<dyn Page>                 │
//! │    └── run_one(scenario) -> ScenarioResult                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Session (one browser context)                              │
//! │    ├── ensure_authenticated() -> BootstrapOutcome           │
//! │    ├── plans::create_plan / delete_plan                     │
//! │    ├── confirm_action(trigger, ConfirmationKind)            │
//! │    ├── JobMonitor::wait_completed() -> JobStatus            │
//! │    └── expect(locator).to_be_visible() / to_have_text() ... │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Page (trait)                                               │
//! │    └── PlaywrightDriver: node child process, JSON lines     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod cli;
pub mod config;
pub mod confirm;
pub mod error;
pub mod expect;
pub mod jobs;
pub mod locator;
pub mod naming;
pub mod page;
pub mod plans;
pub mod playwright;
pub mod runner;
pub mod scenarios;
pub mod server;
pub mod session;
pub mod wait;

pub use config::HarnessConfig;
pub use confirm::{confirm_action, ConfirmationKind};
pub use error::{E2eError, E2eResult};
pub use jobs::{JobMonitor, JobStatus};
pub use locator::{AriaRole, Locator};
pub use page::{BrowserLauncher, Page};
pub use plans::{create_plan, delete_plan, PlanHandle};
pub use runner::{TestRunner, TestSuiteResult};
pub use session::{BootstrapOutcome, Session};
