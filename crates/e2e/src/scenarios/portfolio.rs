//! Portfolio holdings of a plan.

use crate::error::E2eResult;
use crate::locator::{AriaRole, Locator};
use crate::plans;
use crate::scenarios::{Area, Scenario};
use crate::session::Session;

pub const PORTFOLIO_TAB: &str = "Portfolio";
pub const ADD_ASSET: &str = "Add Asset";
pub const ASSET_DIALOG: &str = "Add Asset";
pub const EDIT_ASSET_DIALOG: &str = "Edit Asset";
pub const TICKER_LABEL: &str = "Ticker";
pub const QUANTITY_LABEL: &str = "Quantity";
pub const SAVE_ASSET: &str = "Save";
pub const EDIT_HOLDING_TITLE: &str = "Edit holding";
pub const REMOVE_HOLDING_TITLE: &str = "Remove holding";

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("portfolio/add_holding", Area::Portfolio, |s| Box::pin(add_holding(s))),
        Scenario::new("portfolio/edit_holding_quantity", Area::Portfolio, |s| {
            Box::pin(edit_holding_quantity(s))
        }),
        Scenario::new("portfolio/remove_holding", Area::Portfolio, |s| {
            Box::pin(remove_holding(s))
        }),
    ]
}

pub fn holding_row(ticker: &str) -> Locator {
    Locator::role(AriaRole::Row).named(ticker)
}

/// Create a plan, open its portfolio tab and add one holding.
pub async fn plan_with_holding(session: &Session, ticker: &str, quantity: &str) -> E2eResult<String> {
    let page = session.page();
    page.goto("/").await?;
    let plan = session.names().name("Portfolio");
    plans::create_plan(session, &plan).await?;
    session.click_when_visible(&Locator::tab(PORTFOLIO_TAB)).await?;

    session.click_when_visible(&Locator::button(ADD_ASSET)).await?;
    let dialog = Locator::dialog(ASSET_DIALOG);
    session
        .wait_visible_for(&dialog, session.config().timeouts.dialog())
        .await?;
    page.fill(&dialog.child(Locator::label(TICKER_LABEL)), ticker).await?;
    page.fill(&dialog.child(Locator::label(QUANTITY_LABEL)), quantity).await?;
    page.click(&dialog.child(Locator::button(SAVE_ASSET))).await?;
    session
        .wait_hidden_for(&dialog, session.config().timeouts.dialog())
        .await?;

    session.wait_visible(&holding_row(ticker)).await?;
    Ok(plan)
}

pub async fn add_holding(session: &Session) -> E2eResult<()> {
    plan_with_holding(session, "VTI", "10").await?;

    for header in [TICKER_LABEL, QUANTITY_LABEL] {
        session
            .expect(Locator::role(AriaRole::ColumnHeader).named_exactly(header))
            .to_be_visible()
            .await?;
    }
    session.expect(holding_row("VTI")).to_contain_text("10").await
}

pub async fn edit_holding_quantity(session: &Session) -> E2eResult<()> {
    let page = session.page();
    plan_with_holding(session, "BND", "5").await?;

    page.click(&holding_row("BND").child(Locator::title(EDIT_HOLDING_TITLE)))
        .await?;
    let dialog = Locator::dialog(EDIT_ASSET_DIALOG);
    session
        .wait_visible_for(&dialog, session.config().timeouts.dialog())
        .await?;
    let quantity = dialog.child(Locator::label(QUANTITY_LABEL));
    session.expect(quantity.clone()).to_have_value("5").await?;
    page.fill(&quantity, "25").await?;
    page.click(&dialog.child(Locator::button(SAVE_ASSET))).await?;
    session
        .wait_hidden_for(&dialog, session.config().timeouts.dialog())
        .await?;

    session
        .expect(holding_row("BND").child(Locator::role(AriaRole::Cell).named_exactly("25")))
        .to_be_visible()
        .await
}

pub async fn remove_holding(session: &Session) -> E2eResult<()> {
    plan_with_holding(session, "VXUS", "3").await?;

    let row = holding_row("VXUS");
    session
        .page()
        .click(&row.child(Locator::title(REMOVE_HOLDING_TITLE)))
        .await?;

    session.expect(row).to_be_hidden().await
}
