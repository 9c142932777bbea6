//! Command line of the runner binary

use std::path::PathBuf;

use clap::builder::FalseyValueParser;
use clap::Parser;

use crate::config::HarnessConfig;
use crate::playwright::Browser;
use crate::scenarios::Area;

#[derive(Parser, Debug)]
#[command(name = "advisor-e2e")]
#[command(about = "E2E test runner for the ETF Portfolio Advisor")]
pub struct RunnerArgs {
    /// Actually launch browsers and run scenarios
    ///
    /// `ADVISOR_E2E_RUN` counts as set unless it is empty or one of
    /// `0`, `false`, `no`, `off`, `n`, `f`.
    #[arg(long, env = "ADVISOR_E2E_RUN", value_parser = FalseyValueParser::new())]
    pub run: bool,

    /// Harness configuration file (TOML)
    #[arg(short, long, env = "ADVISOR_E2E_CONFIG")]
    pub config: Option<PathBuf>,

    /// Run only scenarios of this area
    #[arg(short, long)]
    pub area: Option<Area>,

    /// Run only a specific scenario by name, e.g. plans/delete_plan
    #[arg(short, long)]
    pub name: Option<String>,

    /// List registered scenarios and exit
    #[arg(long)]
    pub list: bool,

    /// Front-end URL the browser navigates to
    #[arg(long)]
    pub base_url: Option<String>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    pub browser: Option<Browser>,

    /// Run in headless mode
    #[arg(long)]
    pub headless: Option<bool>,

    /// Browser contexts to run concurrently
    #[arg(long)]
    pub max_parallel: Option<usize>,

    /// Start backend and front end before running
    #[arg(long)]
    pub start_stack: bool,

    /// Output directory for results
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl RunnerArgs {
    /// Flags take precedence over the file and environment configuration.
    pub fn apply(&self, config: &mut HarnessConfig) {
        if let Some(base_url) = &self.base_url {
            config.browser.base_url = base_url.clone();
        }
        if let Some(browser) = self.browser {
            config.browser.browser = browser;
        }
        if let Some(headless) = self.headless {
            config.browser.headless = headless;
        }
        if let Some(max_parallel) = self.max_parallel {
            config.runner.max_parallel = max_parallel;
        }
        if let Some(output) = &self.output {
            config.runner.output_dir = output.clone();
        }
    }
}
