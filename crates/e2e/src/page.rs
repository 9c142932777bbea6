//! The browser page seam
//!
//! Everything above this trait (bootstrap, plan helpers, polling, scenarios)
//! talks to the application only through accessibility locators, so the same
//! code runs against a real browser or an in-memory application.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::E2eResult;
use crate::locator::Locator;

/// One browser tab inside an isolated browser context.
///
/// Actions (`click`, `fill`, `select_option`) act on a single visible
/// element and fail if it is missing. Queries never wait: callers poll with
/// [`crate::wait`] when they need a condition to become true.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate to a path relative to the application base URL.
    async fn goto(&self, path: &str) -> E2eResult<()>;

    async fn click(&self, locator: &Locator) -> E2eResult<()>;

    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()>;

    async fn select_option(&self, locator: &Locator, value: &str) -> E2eResult<()>;

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool>;

    async fn count(&self, locator: &Locator) -> E2eResult<usize>;

    /// Text content of the element, `None` when it does not exist.
    async fn text_content(&self, locator: &Locator) -> E2eResult<Option<String>>;

    async fn attribute(&self, locator: &Locator, name: &str) -> E2eResult<Option<String>>;

    async fn input_value(&self, locator: &Locator) -> E2eResult<String>;

    /// Accept the next native `confirm()`/`alert()` prompt, once.
    async fn accept_next_dialog(&self) -> E2eResult<()>;

    /// Drop a handler armed by [`Page::accept_next_dialog`] that has not fired.
    async fn clear_dialog_handler(&self) -> E2eResult<()>;

    /// Full-page screenshot, returns where it was written.
    async fn screenshot(&self, name: &str) -> E2eResult<Option<PathBuf>>;

    /// Tear down the browser context.
    async fn close(&self) -> E2eResult<()> {
        Ok(())
    }
}

/// Opens a fresh, isolated browser context per scenario.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn new_page(&self) -> E2eResult<Arc<dyn Page>>;
}
