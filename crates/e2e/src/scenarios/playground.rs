//! Backtest playground and display-currency switching.

use crate::error::E2eResult;
use crate::jobs::JobMonitor;
use crate::locator::{AriaRole, Locator};
use crate::plans;
use crate::scenarios::{Area, Scenario};
use crate::session::Session;

pub const PLAYGROUND_TAB: &str = "Playground";
pub const TICKERS_LABEL: &str = "Tickers";
pub const START_DATE_LABEL: &str = "Start Date";
pub const RUN_BACKTEST: &str = "Run Backtest";
pub const STATUS_LABEL: &str = "Backtest status";
pub const RESULT_HEADING: &str = "Backtest Results";
pub const CURRENCIES: [&str; 2] = ["JPY", "USD"];

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("playground/run_backtest", Area::Playground, |s| {
            Box::pin(run_backtest(s))
        }),
        Scenario::new("playground/switch_display_currency", Area::Playground, |s| {
            Box::pin(switch_display_currency(s))
        }),
    ]
}

async fn open_playground(session: &Session) -> E2eResult<()> {
    session.page().goto("/").await?;
    let plan = session.names().name("Playground");
    plans::create_plan(session, &plan).await?;
    session.click_when_visible(&Locator::tab(PLAYGROUND_TAB)).await
}

pub async fn run_backtest(session: &Session) -> E2eResult<()> {
    let page = session.page();
    open_playground(session).await?;

    page.fill(&Locator::label(TICKERS_LABEL), "VTI, BND").await?;
    page.fill(&Locator::label(START_DATE_LABEL), "2020-01-01").await?;
    session.click_when_visible(&Locator::button(RUN_BACKTEST)).await?;

    JobMonitor::new(session, "backtest", Locator::label(STATUS_LABEL))
        .failure_marker(Locator::role(AriaRole::Alert))
        .wait_completed(session)
        .await?;

    session.expect(Locator::heading(RESULT_HEADING)).to_be_visible().await
}

/// The selected currency tab carries `aria-selected="true"`, the other one
/// `"false"`.
pub async fn switch_display_currency(session: &Session) -> E2eResult<()> {
    open_playground(session).await?;

    for (selected, other) in [(CURRENCIES[1], CURRENCIES[0]), (CURRENCIES[0], CURRENCIES[1])] {
        session.click_when_visible(&Locator::tab(selected)).await?;
        session
            .expect(Locator::tab(selected))
            .to_have_attribute("aria-selected", "true")
            .await?;
        session
            .expect(Locator::tab(other))
            .to_have_attribute("aria-selected", "false")
            .await?;
    }
    Ok(())
}
