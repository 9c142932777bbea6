//! Authenticated browser sessions
//!
//! A [`Session`] bundles the page of one isolated browser context with the
//! harness configuration. [`Session::ensure_authenticated`] registers a fresh
//! account the first time the "Sign In" affordance is seen and is a no-op
//! afterwards.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::HarnessConfig;
use crate::error::E2eResult;
use crate::expect::Expect;
use crate::locator::Locator;
use crate::naming::UniqueNames;
use crate::page::Page;
use crate::wait;

pub const SIGN_IN: &str = "Sign In";
pub const AUTH_DIALOG: &str = "Welcome";
pub const SWITCH_TO_REGISTER: &str = "Register";
pub const CREATE_ACCOUNT: &str = "Create Account";
pub const USERNAME_LABEL: &str = "Username";
pub const PASSWORD_LABEL: &str = "Password";
pub const CONFIRM_PASSWORD_LABEL: &str = "Confirm Password";

/// Identity registered by the bootstrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// No "Sign In" affordance: the context was already logged in.
    AlreadyAuthenticated,
    /// A new account was registered and the context is now logged in.
    Registered(Credentials),
}

/// One authenticated (or soon to be) browser context.
pub struct Session {
    page: Arc<dyn Page>,
    config: Arc<HarnessConfig>,
    names: UniqueNames,
    // Serialises login flows so at most one runs per context.
    login: Mutex<Option<Credentials>>,
}

impl Session {
    pub fn new(page: Arc<dyn Page>, config: Arc<HarnessConfig>, names: UniqueNames) -> Self {
        Self {
            page,
            config,
            names,
            login: Mutex::new(None),
        }
    }

    pub fn page(&self) -> &dyn Page {
        self.page.as_ref()
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn names(&self) -> &UniqueNames {
        &self.names
    }

    /// Credentials registered through this session, if any.
    pub async fn credentials(&self) -> Option<Credentials> {
        self.login.lock().await.clone()
    }

    /// Guarantee the context is logged in, registering a new account if the
    /// "Sign In" button is showing.
    pub async fn ensure_authenticated(&self) -> E2eResult<BootstrapOutcome> {
        let mut login = self.login.lock().await;
        let page = self.page();
        let sign_in = Locator::button(SIGN_IN);

        if !page.is_visible(&sign_in).await? {
            debug!("Sign In not visible, session already authenticated");
            return Ok(BootstrapOutcome::AlreadyAuthenticated);
        }

        let credentials = Credentials {
            username: self.names.username(),
            password: self.config.auth.password.clone(),
        };
        info!("Registering test account {}", credentials.username);

        page.click(&sign_in).await?;
        let dialog = Locator::dialog(AUTH_DIALOG);
        self.wait_visible_for(&dialog, self.config.timeouts.dialog()).await?;

        page.click(&dialog.child(Locator::button(SWITCH_TO_REGISTER))).await?;
        let confirm_field = dialog.child(Locator::label(CONFIRM_PASSWORD_LABEL));
        self.wait_visible(&confirm_field).await?;

        page.fill(&dialog.child(Locator::label(USERNAME_LABEL)), &credentials.username)
            .await?;
        page.fill(&dialog.child(Locator::label(PASSWORD_LABEL)), &credentials.password)
            .await?;
        page.fill(&confirm_field, &credentials.password).await?;
        page.click(&dialog.child(Locator::button(CREATE_ACCOUNT))).await?;

        // The only signal of success; a timeout here must abort the scenario.
        self.wait_hidden_for(&sign_in, self.config.timeouts.auth()).await?;

        info!("Authenticated as {}", credentials.username);
        *login = Some(credentials.clone());
        Ok(BootstrapOutcome::Registered(credentials))
    }

    /// Wait for a locator to become visible within the action timeout.
    pub async fn wait_visible(&self, locator: &Locator) -> E2eResult<()> {
        self.wait_visible_for(locator, self.config.timeouts.action()).await
    }

    pub async fn wait_visible_for(&self, locator: &Locator, timeout: Duration) -> E2eResult<()> {
        wait::visible(self.page(), locator, timeout, self.config.backoff).await
    }

    /// Wait for a locator to disappear within the action timeout.
    pub async fn wait_hidden(&self, locator: &Locator) -> E2eResult<()> {
        self.wait_hidden_for(locator, self.config.timeouts.action()).await
    }

    pub async fn wait_hidden_for(&self, locator: &Locator, timeout: Duration) -> E2eResult<()> {
        wait::hidden(self.page(), locator, timeout, self.config.backoff).await
    }

    /// Wait until the locator is visible, then click it.
    pub async fn click_when_visible(&self, locator: &Locator) -> E2eResult<()> {
        self.wait_visible(locator).await?;
        self.page().click(locator).await
    }

    /// Start an assertion on `locator`.
    pub fn expect(&self, locator: Locator) -> Expect<'_> {
        Expect::new(self, locator)
    }
}
