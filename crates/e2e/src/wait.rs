//! Bounded polling
//!
//! The harness never sleeps and hopes: every wait is a probe repeated with
//! exponential backoff until it yields a value or the deadline passes, in
//! which case the caller gets [`E2eError::Timeout`].

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::Page;

/// Exponential backoff between probes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Backoff {
    pub initial_ms: u64,
    pub max_ms: u64,
    pub factor: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial_ms: 50,
            max_ms: 1000,
            factor: 2.0,
        }
    }
}

impl Backoff {
    /// Slower schedule for backend jobs that run for tens of seconds.
    pub fn for_jobs() -> Self {
        Self {
            initial_ms: 250,
            max_ms: 5000,
            factor: 1.5,
        }
    }

    /// Delay before probe number `attempt` (0-based) is retried.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = if self.factor < 1.0 { 1.0 } else { self.factor };
        let ms = (self.initial_ms as f64) * factor.powi(attempt.min(32) as i32);
        Duration::from_millis(ms.min(self.max_ms as f64) as u64)
    }
}

/// Repeat `probe` until it returns `Some`, or fail with a timeout.
///
/// The probe always runs at least once, and once more right at the deadline
/// so a condition that becomes true during the last sleep is not missed.
/// Probe errors are returned immediately.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    timeout: Duration,
    backoff: Backoff,
    mut probe: F,
) -> E2eResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<Option<T>>>,
{
    let start = Instant::now();
    let deadline = start + timeout;
    let mut attempt = 0u32;

    loop {
        if let Some(value) = probe().await? {
            debug!("{} satisfied after {} probe(s)", what, attempt + 1);
            return Ok(value);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(E2eError::Timeout {
                what: what.to_string(),
                waited_ms: now.duration_since(start).as_millis() as u64,
            });
        }

        let delay = backoff.delay(attempt).min(deadline - now);
        trace!("{} not yet satisfied, retrying in {:?}", what, delay);
        sleep(delay).await;
        attempt += 1;
    }
}

/// Wait until the locator resolves to a visible element.
pub async fn visible(
    page: &dyn Page,
    locator: &Locator,
    timeout: Duration,
    backoff: Backoff,
) -> E2eResult<()> {
    let what = format!("{} to be visible", locator);
    poll_until(&what, timeout, backoff, || async {
        Ok::<_, E2eError>(page.is_visible(locator).await?.then_some(()))
    })
    .await
}

/// Wait until the locator no longer resolves to a visible element.
pub async fn hidden(
    page: &dyn Page,
    locator: &Locator,
    timeout: Duration,
    backoff: Backoff,
) -> E2eResult<()> {
    let what = format!("{} to be hidden", locator);
    poll_until(&what, timeout, backoff, || async {
        Ok::<_, E2eError>((!page.is_visible(locator).await?).then_some(()))
    })
    .await
}

/// Wait until one of `candidates` is visible and return its index.
pub async fn any_visible(
    page: &dyn Page,
    candidates: &[&Locator],
    timeout: Duration,
    backoff: Backoff,
) -> E2eResult<usize> {
    let names: Vec<String> = candidates.iter().map(|l| l.to_string()).collect();
    let what = format!("one of [{}] to be visible", names.join(", "));
    poll_until(&what, timeout, backoff, || async {
        for (i, locator) in candidates.iter().enumerate() {
            if page.is_visible(locator).await? {
                return Ok(Some(i));
            }
        }
        Ok::<_, E2eError>(None)
    })
    .await
}
