//! Auto-retrying assertions
//!
//! `session.expect(locator).to_be_visible().await` polls until the condition
//! holds and fails with [`E2eError::AssertionFailed`] carrying the last value
//! observed when the bound runs out.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{E2eError, E2eResult};
use crate::locator::{Locator, TextMatch};
use crate::session::Session;
use crate::wait::poll_until;

pub struct Expect<'a> {
    session: &'a Session,
    locator: Locator,
    timeout: Duration,
}

impl<'a> Expect<'a> {
    pub(crate) fn new(session: &'a Session, locator: Locator) -> Self {
        let timeout = session.config().timeouts.action();
        Self { session, locator, timeout }
    }

    /// Override the bound, e.g. for results of long-running jobs.
    pub fn within(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn to_be_visible(&self) -> E2eResult<()> {
        let page = self.session.page();
        self.check("to be visible", || async {
            let visible = page.is_visible(&self.locator).await?;
            Ok::<_, E2eError>((visible, format!("visible={}", visible)))
        })
        .await
    }

    pub async fn to_be_hidden(&self) -> E2eResult<()> {
        let page = self.session.page();
        self.check("to be hidden", || async {
            let visible = page.is_visible(&self.locator).await?;
            Ok::<_, E2eError>((!visible, format!("visible={}", visible)))
        })
        .await
    }

    /// Whole text equals `expected` after whitespace normalisation.
    pub async fn to_have_text(&self, expected: &str) -> E2eResult<()> {
        self.text_matches(&TextMatch::exact(expected)).await
    }

    /// Text contains `expected`, case-insensitively.
    pub async fn to_contain_text(&self, expected: &str) -> E2eResult<()> {
        self.text_matches(&TextMatch::loose(expected)).await
    }

    async fn text_matches(&self, expected: &TextMatch) -> E2eResult<()> {
        let page = self.session.page();
        let expectation = if expected.exact {
            format!("to have text \"{}\"", expected.text)
        } else {
            format!("to contain text \"{}\"", expected.text)
        };
        self.check(&expectation, || async {
            let text = page.text_content(&self.locator).await?;
            let ok = text.as_deref().map(|t| expected.matches(t)).unwrap_or(false);
            Ok::<_, E2eError>((ok, format!("{:?}", text)))
        })
        .await
    }

    pub async fn to_have_attribute(&self, name: &str, value: &str) -> E2eResult<()> {
        let page = self.session.page();
        let expectation = format!("to have {}=\"{}\"", name, value);
        self.check(&expectation, || async {
            let actual = page.attribute(&self.locator, name).await?;
            Ok::<_, E2eError>((actual.as_deref() == Some(value), format!("{:?}", actual)))
        })
        .await
    }

    pub async fn to_have_count(&self, expected: usize) -> E2eResult<()> {
        let page = self.session.page();
        let expectation = format!("to match {} element(s)", expected);
        self.check(&expectation, || async {
            let count = page.count(&self.locator).await?;
            Ok::<_, E2eError>((count == expected, format!("{} element(s)", count)))
        })
        .await
    }

    pub async fn to_have_value(&self, expected: &str) -> E2eResult<()> {
        let page = self.session.page();
        let expectation = format!("to have value \"{}\"", expected);
        self.check(&expectation, || async {
            let value = page.input_value(&self.locator).await?;
            Ok::<_, E2eError>((value == expected, format!("{:?}", value)))
        })
        .await
    }

    async fn check<F, Fut>(&self, expectation: &str, mut probe: F) -> E2eResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = E2eResult<(bool, String)>>,
    {
        let last_seen = Mutex::new(None::<String>);
        let what = format!("{} {}", self.locator, expectation);
        let result = poll_until(&what, self.timeout, self.session.config().backoff, || {
            let attempt = probe();
            let last_seen = &last_seen;
            async move {
                let (ok, observed) = attempt.await?;
                *last_seen.lock() = Some(observed);
                Ok::<_, E2eError>(ok.then_some(()))
            }
        })
        .await;

        match result {
            Err(E2eError::Timeout { waited_ms, .. }) => Err(E2eError::AssertionFailed(format!(
                "expected {} {} within {} ms, last observed {}",
                self.locator,
                expectation,
                waited_ms,
                last_seen.lock().take().unwrap_or_else(|| "nothing".into())
            ))),
            other => other,
        }
    }
}
