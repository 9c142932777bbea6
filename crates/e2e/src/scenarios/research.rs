//! Research assistant panel.

use crate::error::E2eResult;
use crate::jobs::JobMonitor;
use crate::locator::{AriaRole, Locator};
use crate::plans;
use crate::scenarios::{Area, Scenario};
use crate::session::Session;

pub const OPEN_ASSISTANT_TITLE: &str = "Open research assistant";
pub const ASSISTANT_DIALOG: &str = "Research Assistant";
pub const QUERY_LABEL: &str = "Research query";
pub const ASK: &str = "Ask";
pub const STATUS_LABEL: &str = "Research status";
pub const SUMMARY_HEADING: &str = "Summary";
pub const FOLLOW_UPS: &str = "Suggested follow-ups";

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("research/ask_assistant", Area::Research, |s| {
            Box::pin(ask_assistant(s))
        }),
        Scenario::new("research/create_plan_with_assistant_open", Area::Research, |s| {
            Box::pin(create_plan_with_assistant_open(s))
        }),
    ]
}

pub fn assistant() -> Locator {
    Locator::dialog(ASSISTANT_DIALOG)
}

async fn open_assistant(session: &Session) -> E2eResult<Locator> {
    session.ensure_authenticated().await?;
    session
        .click_when_visible(&Locator::title(OPEN_ASSISTANT_TITLE))
        .await?;
    let dialog = assistant();
    session
        .wait_visible_for(&dialog, session.config().timeouts.dialog())
        .await?;
    Ok(dialog)
}

pub async fn ask_assistant(session: &Session) -> E2eResult<()> {
    session.page().goto("/").await?;
    let dialog = open_assistant(session).await?;

    session
        .page()
        .fill(&dialog.child(Locator::label(QUERY_LABEL)), "low cost global equity ETFs")
        .await?;
    session.page().click(&dialog.child(Locator::button(ASK))).await?;

    JobMonitor::new(session, "research", dialog.child(Locator::label(STATUS_LABEL)))
        .failure_marker(dialog.child(Locator::role(AriaRole::Alert)))
        .wait_completed(session)
        .await?;

    session
        .expect(dialog.child(Locator::heading(SUMMARY_HEADING)))
        .to_be_visible()
        .await?;
    let follow_ups = dialog.child(Locator::role(AriaRole::Group).named_exactly(FOLLOW_UPS));
    session
        .expect(follow_ups.child(Locator::heading(FOLLOW_UPS)))
        .to_be_visible()
        .await?;
    session
        .expect(follow_ups.child(Locator::role(AriaRole::Button).first()))
        .to_be_visible()
        .await
}

/// Closing the plan dialog must not be confused with the assistant dialog
/// that stays open next to it.
pub async fn create_plan_with_assistant_open(session: &Session) -> E2eResult<()> {
    session.page().goto("/").await?;
    let dialog = open_assistant(session).await?;

    let name = session.names().name("Assisted");
    plans::create_plan(session, &name).await?;

    session.expect(Locator::page_heading(&name)).to_be_visible().await?;
    session.expect(dialog).to_be_visible().await
}
