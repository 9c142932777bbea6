//! Plan lifecycle helpers
//!
//! Plans are created and deleted through the UI. Both helpers wait on
//! observable transitions (dialog closed, heading shown, card gone) and never
//! retry: a missed transition is a scenario failure.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::confirm::{confirm_action, ConfirmationKind};
use crate::error::E2eResult;
use crate::locator::{AriaRole, Locator};
use crate::session::Session;
use crate::wait;

pub const CREATE_FIRST_PLAN: &str = "Create your first plan";
pub const NEW_PLAN: &str = "New Plan";
pub const BACK_TO_PLANS: &str = "Back to Plans";
pub const CREATE_PLAN_DIALOG: &str = "Create New Plan";
pub const PLAN_NAME_LABEL: &str = "Plan Name";
pub const RISK_PREFERENCE_LABEL: &str = "Risk Preference";
pub const CREATE_PLAN_SUBMIT: &str = "Create Plan";
pub const DELETE_PLAN_TITLE: &str = "Delete plan";

/// Risk tolerance stored on a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskPreference {
    VeryConservative,
    Conservative,
    #[default]
    Moderate,
    Growth,
    Aggressive,
}

impl RiskPreference {
    /// `<option>` value in the risk selector
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskPreference::VeryConservative => "very_conservative",
            RiskPreference::Conservative => "conservative",
            RiskPreference::Moderate => "moderate",
            RiskPreference::Growth => "growth",
            RiskPreference::Aggressive => "aggressive",
        }
    }
}

/// A plan created by the calling scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanHandle {
    pub name: String,
    pub risk: RiskPreference,
}

/// The card for `name` in the plan list.
pub fn plan_card(name: &str) -> Locator {
    Locator::role(AriaRole::Group).named_exactly(format!("Plan {}", name))
}

/// The creation dialog. Scoped by name so an open assistant panel, which is
/// also a dialog, never satisfies waits meant for it.
pub fn create_plan_dialog() -> Locator {
    Locator::dialog(CREATE_PLAN_DIALOG)
}

/// Create a plan and leave the browser on its detail view.
pub async fn create_plan(session: &Session, name: &str) -> E2eResult<PlanHandle> {
    session.ensure_authenticated().await?;

    let page = session.page();
    let timeouts = &session.config().timeouts;
    let first_plan = Locator::button(CREATE_FIRST_PLAN);
    let new_plan = Locator::button(NEW_PLAN);

    let back = Locator::button(BACK_TO_PLANS);

    // The list or detail view may still be loading right after navigation.
    let entry = wait::any_visible(
        page,
        &[&first_plan, &new_plan, &back],
        timeouts.navigation(),
        session.config().backoff,
    )
    .await?;
    let create = match entry {
        0 => &first_plan,
        1 => &new_plan,
        _ => {
            debug!("No create affordance visible, leaving detail view first");
            page.click(&back).await?;
            let found = wait::any_visible(
                page,
                &[&first_plan, &new_plan],
                timeouts.navigation(),
                session.config().backoff,
            )
            .await?;
            if found == 0 {
                &first_plan
            } else {
                &new_plan
            }
        }
    };
    page.click(create).await?;

    let dialog = create_plan_dialog();
    session.wait_visible_for(&dialog, timeouts.dialog()).await?;

    let handle = PlanHandle {
        name: name.to_string(),
        risk: RiskPreference::Moderate,
    };
    page.fill(&dialog.child(Locator::label(PLAN_NAME_LABEL)), &handle.name)
        .await?;
    page.select_option(
        &dialog.child(Locator::label(RISK_PREFERENCE_LABEL)),
        handle.risk.as_str(),
    )
    .await?;
    page.click(&dialog.child(Locator::button(CREATE_PLAN_SUBMIT)))
        .await?;

    session.wait_hidden_for(&dialog, timeouts.dialog()).await?;
    session
        .wait_visible_for(&Locator::page_heading(&handle.name), timeouts.navigation())
        .await?;

    // Asset lists and account data load after the heading renders.
    tokio::time::sleep(timeouts.settle()).await;

    info!("Created plan '{}'", handle.name);
    Ok(handle)
}

/// Return to the plan list if a detail view is open.
pub async fn back_to_plans(session: &Session) -> E2eResult<()> {
    let page = session.page();
    let back = Locator::button(BACK_TO_PLANS);
    if !page.is_visible(&back).await? {
        return Ok(());
    }
    page.click(&back).await?;
    wait::any_visible(
        page,
        &[&Locator::button(NEW_PLAN), &Locator::button(CREATE_FIRST_PLAN)],
        session.config().timeouts.navigation(),
        session.config().backoff,
    )
    .await?;
    Ok(())
}

/// Open an existing plan from the list.
pub async fn open_plan(session: &Session, name: &str) -> E2eResult<()> {
    back_to_plans(session).await?;
    let card = plan_card(name);
    session.click_when_visible(&card.child(Locator::text_exact(name))).await?;
    session
        .wait_visible_for(&Locator::page_heading(name), session.config().timeouts.navigation())
        .await
}

/// Delete the plan called exactly `name` and wait for its card to vanish.
pub async fn delete_plan(session: &Session, name: &str) -> E2eResult<()> {
    back_to_plans(session).await?;

    let card = plan_card(name);
    session.wait_visible(&card).await?;

    let delete = card.child(Locator::title(DELETE_PLAN_TITLE));
    confirm_action(session, &delete, &ConfirmationKind::NativeBrowserDialog).await?;

    session.wait_hidden(&card).await?;
    info!("Deleted plan '{}'", name);
    Ok(())
}
