//! Portfolio optimization jobs.

use tracing::info;

use crate::error::{E2eError, E2eResult};
use crate::jobs::JobMonitor;
use crate::locator::{AriaRole, Locator};
use crate::scenarios::portfolio::plan_with_holding;
use crate::scenarios::{Area, Scenario};
use crate::session::Session;

pub const OPTIMIZATION_TAB: &str = "Optimization";
pub const RUN_OPTIMIZATION: &str = "Run Optimization";
pub const STATUS_LABEL: &str = "Optimization status";
pub const MAX_WEIGHT_LABEL: &str = "Max Asset Weight";
pub const RESULT_HEADING: &str = "Optimized Allocation";

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("optimization/run_optimization", Area::Optimization, |s| {
            Box::pin(run_optimization(s))
        }),
        Scenario::new("optimization/invalid_constraint_fails_job", Area::Optimization, |s| {
            Box::pin(invalid_constraint_fails_job(s))
        }),
    ]
}

fn monitor(session: &Session) -> JobMonitor {
    JobMonitor::new(session, "optimization", Locator::label(STATUS_LABEL))
        .failure_marker(Locator::role(AriaRole::Alert))
}

async fn open_optimization_tab(session: &Session) -> E2eResult<()> {
    plan_with_holding(session, "VTI", "10").await?;
    session.click_when_visible(&Locator::tab(OPTIMIZATION_TAB)).await
}

pub async fn run_optimization(session: &Session) -> E2eResult<()> {
    open_optimization_tab(session).await?;
    session.click_when_visible(&Locator::button(RUN_OPTIMIZATION)).await?;

    let status = monitor(session).wait_completed(session).await?;
    info!("optimization finished with {}", status);

    session.expect(Locator::heading(RESULT_HEADING)).to_be_visible().await?;
    session
        .expect(Locator::role(AriaRole::ColumnHeader).named_exactly("Weight"))
        .to_be_visible()
        .await?;
    session.expect(Locator::role(AriaRole::Row).named("VTI")).to_be_visible().await
}

/// An impossible constraint must end the wait as a job failure, not a timeout.
pub async fn invalid_constraint_fails_job(session: &Session) -> E2eResult<()> {
    open_optimization_tab(session).await?;
    session
        .page()
        .fill(&Locator::label(MAX_WEIGHT_LABEL), "150")
        .await?;
    session.click_when_visible(&Locator::button(RUN_OPTIMIZATION)).await?;

    match monitor(session).wait_completed(session).await {
        Err(E2eError::JobFailed { status, .. }) => {
            info!("optimization failed as expected: {}", status);
            session
                .expect(Locator::heading(RESULT_HEADING))
                .to_be_hidden()
                .await
        }
        Ok(status) => Err(E2eError::AssertionFailed(format!(
            "optimization with max weight 150% ended {} instead of failing",
            status
        ))),
        Err(e) => Err(e),
    }
}
