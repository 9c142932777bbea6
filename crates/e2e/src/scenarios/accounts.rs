//! Tax-advantaged account management inside a plan.

use crate::confirm::{confirm_action, ConfirmationKind};
use crate::error::E2eResult;
use crate::locator::{AriaRole, Locator};
use crate::plans;
use crate::scenarios::{Area, Scenario};
use crate::session::Session;

pub const ACCOUNTS_TAB: &str = "Accounts";
pub const ADD_ACCOUNT: &str = "Add Account";
pub const ACCOUNT_DIALOG: &str = "Add Tax Account";
pub const ACCOUNT_NAME_LABEL: &str = "Account Name";
pub const ACCOUNT_TYPE_LABEL: &str = "Account Type";
pub const ANNUAL_LIMIT_LABEL: &str = "Annual Limit";
pub const CURRENT_BALANCE_LABEL: &str = "Current Balance";
pub const SAVE_ACCOUNT: &str = "Save Account";
pub const DELETE_ACCOUNT_TITLE: &str = "Delete account";
pub const DELETE_ACCOUNT_DIALOG: &str = "Delete Account";
pub const CONFIRM_DELETE: &str = "Delete";

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("accounts/add_tax_account", Area::Accounts, |s| {
            Box::pin(add_tax_account(s))
        }),
        Scenario::new("accounts/negative_limit_rejected", Area::Accounts, |s| {
            Box::pin(negative_limit_rejected(s))
        }),
        Scenario::new("accounts/over_limit_allocation_rejected", Area::Accounts, |s| {
            Box::pin(over_limit_allocation_rejected(s))
        }),
        Scenario::new("accounts/delete_tax_account", Area::Accounts, |s| {
            Box::pin(delete_tax_account(s))
        }),
    ]
}

pub fn account_row(name: &str) -> Locator {
    Locator::role(AriaRole::Row).named(name)
}

async fn open_accounts_tab(session: &Session, plan_prefix: &str) -> E2eResult<()> {
    session.page().goto("/").await?;
    let plan = session.names().name(plan_prefix);
    plans::create_plan(session, &plan).await?;
    session.click_when_visible(&Locator::tab(ACCOUNTS_TAB)).await
}

/// Fill and submit the account dialog; leaves it open when validation fails.
async fn submit_account(
    session: &Session,
    name: &str,
    account_type: &str,
    limit: &str,
    balance: Option<&str>,
) -> E2eResult<Locator> {
    let page = session.page();
    session.click_when_visible(&Locator::button(ADD_ACCOUNT)).await?;

    let dialog = Locator::dialog(ACCOUNT_DIALOG);
    session
        .wait_visible_for(&dialog, session.config().timeouts.dialog())
        .await?;
    page.fill(&dialog.child(Locator::label(ACCOUNT_NAME_LABEL)), name).await?;
    page.select_option(&dialog.child(Locator::label(ACCOUNT_TYPE_LABEL)), account_type)
        .await?;
    page.fill(&dialog.child(Locator::label(ANNUAL_LIMIT_LABEL)), limit).await?;
    if let Some(balance) = balance {
        page.fill(&dialog.child(Locator::label(CURRENT_BALANCE_LABEL)), balance)
            .await?;
    }
    page.click(&dialog.child(Locator::button(SAVE_ACCOUNT))).await?;
    Ok(dialog)
}

pub async fn add_tax_account(session: &Session) -> E2eResult<()> {
    open_accounts_tab(session, "Accounts").await?;
    let name = session.names().name("NISA");

    let dialog = submit_account(session, &name, "nisa_growth", "2400000", None).await?;
    session
        .wait_hidden_for(&dialog, session.config().timeouts.dialog())
        .await?;

    session.expect(account_row(&name)).to_be_visible().await?;
    session
        .expect(Locator::role(AriaRole::ColumnHeader).named_exactly(ACCOUNT_TYPE_LABEL))
        .to_be_visible()
        .await
}

pub async fn negative_limit_rejected(session: &Session) -> E2eResult<()> {
    open_accounts_tab(session, "Limits").await?;
    let name = session.names().name("iDeCo");

    let dialog = submit_account(session, &name, "ideco", "-1000", None).await?;

    let alert = dialog.child(Locator::role(AriaRole::Alert));
    session.expect(alert).to_contain_text("annual limit").await?;
    session.expect(dialog).to_be_visible().await?;
    session.expect(account_row(&name)).to_be_hidden().await
}

/// More already allocated than the account allows in a year.
pub async fn over_limit_allocation_rejected(session: &Session) -> E2eResult<()> {
    open_accounts_tab(session, "Allocation").await?;
    let name = session.names().name("NISA");

    let dialog = submit_account(session, &name, "nisa_growth", "1200000", Some("1500000")).await?;

    let alert = dialog.child(Locator::role(AriaRole::Alert));
    session.expect(alert).to_contain_text("exceeds the annual limit").await?;
    session.expect(dialog).to_be_visible().await?;
    session.expect(account_row(&name)).to_be_hidden().await
}

pub async fn delete_tax_account(session: &Session) -> E2eResult<()> {
    open_accounts_tab(session, "Cleanup").await?;
    let name = session.names().name("Taxable");

    let dialog = submit_account(session, &name, "taxable", "1000000", None).await?;
    session
        .wait_hidden_for(&dialog, session.config().timeouts.dialog())
        .await?;
    let row = account_row(&name);
    session.wait_visible(&row).await?;

    let confirmation = ConfirmationKind::ModalDialog {
        dialog: Locator::dialog(DELETE_ACCOUNT_DIALOG),
        confirm: Locator::button(CONFIRM_DELETE),
    };
    confirm_action(session, &row.child(Locator::title(DELETE_ACCOUNT_TITLE)), &confirmation).await?;

    session.expect(row).to_be_hidden().await
}
