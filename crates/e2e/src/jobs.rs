//! Long-running backend jobs observed through the UI
//!
//! Optimization, backtest and research runs render a status label. The
//! harness polls that label until it shows a terminal state.

use std::fmt;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::session::Session;
use crate::wait::{poll_until, Backoff};

static STATUS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(queued|fetching[ _]data|optimizing|running|completed|failed)\b")
        .expect("status pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    FetchingData,
    Optimizing,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Find the first status word in rendered text.
    pub fn parse(text: &str) -> Option<Self> {
        let word = STATUS_PATTERN.captures(text)?.get(1)?.as_str().to_ascii_lowercase();
        match word.replace(' ', "_").as_str() {
            "queued" => Some(JobStatus::Queued),
            "fetching_data" => Some(JobStatus::FetchingData),
            "optimizing" => Some(JobStatus::Optimizing),
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::FetchingData => "fetching_data",
            JobStatus::Optimizing => "optimizing",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polls a job's status label until it reaches a terminal state.
pub struct JobMonitor {
    job: String,
    status: Locator,
    failure: Option<Locator>,
    timeout: Duration,
    backoff: Backoff,
}

impl JobMonitor {
    pub fn new(session: &Session, job: impl Into<String>, status: Locator) -> Self {
        Self {
            job: job.into(),
            status,
            failure: None,
            timeout: session.config().timeouts.job(),
            backoff: session.config().job_backoff(),
        }
    }

    /// Treat this element appearing as the job having failed.
    pub fn failure_marker(mut self, locator: Locator) -> Self {
        self.failure = Some(locator);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Wait for `Completed`. `Failed` (or the failure marker) ends the wait
    /// early with [`E2eError::JobFailed`]; running out of time is a
    /// [`E2eError::Timeout`].
    pub async fn wait_completed(&self, session: &Session) -> E2eResult<JobStatus> {
        let page = session.page();
        let what = format!("job '{}' to complete", self.job);
        info!("Waiting up to {:?} for {}", self.timeout, what);

        poll_until(&what, self.timeout, self.backoff, || async {
            let text = page.text_content(&self.status).await?;
            let status = text.as_deref().and_then(JobStatus::parse);
            debug!("job '{}' status: {:?}", self.job, status);

            let mut marker = None;
            if let Some(failure) = &self.failure {
                if page.is_visible(failure).await? {
                    marker = Some(failure);
                }
            }
            if marker.is_some() || status == Some(JobStatus::Failed) {
                // Prefer the failure message over the bare status word.
                let detail = match marker {
                    Some(failure) => page.text_content(failure).await?,
                    None => text,
                };
                return Err(E2eError::JobFailed {
                    job: self.job.clone(),
                    status: detail.unwrap_or_default().trim().to_string(),
                });
            }

            Ok::<_, E2eError>((status == Some(JobStatus::Completed)).then_some(JobStatus::Completed))
        })
        .await
    }
}
