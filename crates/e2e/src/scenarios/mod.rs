//! Scenario registry
//!
//! Every scenario drives one workflow in a fresh browser context: it gets a
//! plan through the lifecycle helpers, performs feature-specific actions and
//! asserts on what the application renders.

use std::fmt;
use std::str::FromStr;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};
use crate::session::Session;

pub mod accounts;
pub mod auth;
pub mod optimization;
pub mod plans;
pub mod playground;
pub mod portfolio;
pub mod research;

/// Feature area a scenario exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Area {
    Auth,
    Plans,
    Accounts,
    Portfolio,
    Optimization,
    Playground,
    Research,
}

impl Area {
    pub fn as_str(&self) -> &'static str {
        match self {
            Area::Auth => "auth",
            Area::Plans => "plans",
            Area::Accounts => "accounts",
            Area::Portfolio => "portfolio",
            Area::Optimization => "optimization",
            Area::Playground => "playground",
            Area::Research => "research",
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Area {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auth" => Ok(Area::Auth),
            "plans" => Ok(Area::Plans),
            "accounts" => Ok(Area::Accounts),
            "portfolio" => Ok(Area::Portfolio),
            "optimization" => Ok(Area::Optimization),
            "playground" => Ok(Area::Playground),
            "research" => Ok(Area::Research),
            other => Err(E2eError::Config(format!("unknown area '{}'", other))),
        }
    }
}

pub type ScenarioFn = for<'a> fn(&'a Session) -> BoxFuture<'a, E2eResult<()>>;

#[derive(Clone, Copy)]
pub struct Scenario {
    pub name: &'static str,
    pub area: Area,
    pub run: ScenarioFn,
}

impl Scenario {
    pub const fn new(name: &'static str, area: Area, run: ScenarioFn) -> Self {
        Self { name, area, run }
    }
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("area", &self.area)
            .finish()
    }
}

/// Every registered scenario, grouped by area.
pub fn all() -> Vec<Scenario> {
    let mut scenarios = Vec::new();
    scenarios.extend(auth::scenarios());
    scenarios.extend(plans::scenarios());
    scenarios.extend(accounts::scenarios());
    scenarios.extend(portfolio::scenarios());
    scenarios.extend(optimization::scenarios());
    scenarios.extend(playground::scenarios());
    scenarios.extend(research::scenarios());
    scenarios
}

pub fn by_area(area: Area) -> Vec<Scenario> {
    all().into_iter().filter(|s| s.area == area).collect()
}

pub fn find(name: &str) -> E2eResult<Scenario> {
    all()
        .into_iter()
        .find(|s| s.name == name)
        .ok_or_else(|| E2eError::ScenarioNotFound(name.to_string()))
}
