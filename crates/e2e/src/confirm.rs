//! Confirmation flows
//!
//! Destructive actions in the application are confirmed either through an
//! in-page modal dialog or through the browser's native `confirm()` prompt.
//! The two need different handling, so callers must say which one they
//! expect.

use tracing::{debug, warn};

use crate::error::E2eResult;
use crate::locator::Locator;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationKind {
    /// In-page dialog; `confirm` is resolved inside `dialog`.
    ModalDialog { dialog: Locator, confirm: Locator },
    /// Native browser prompt, accepted by a one-shot handler.
    ///
    /// The handler accepts whatever prompt fires next, so no other native
    /// dialog may be triggered between arming it and the prompt. It is
    /// disarmed again if the trigger cannot be clicked.
    NativeBrowserDialog,
}

/// Activate `trigger` and accept the confirmation it raises.
pub async fn confirm_action(
    session: &Session,
    trigger: &Locator,
    kind: &ConfirmationKind,
) -> E2eResult<()> {
    match kind {
        ConfirmationKind::ModalDialog { dialog, confirm } => {
            confirm_with_modal(session, trigger, dialog, confirm).await
        }
        ConfirmationKind::NativeBrowserDialog => confirm_with_native_prompt(session, trigger).await,
    }
}

async fn confirm_with_modal(
    session: &Session,
    trigger: &Locator,
    dialog: &Locator,
    confirm: &Locator,
) -> E2eResult<()> {
    let page = session.page();
    page.click(trigger).await?;
    session
        .wait_visible_for(dialog, session.config().timeouts.dialog())
        .await?;
    debug!("Confirming through {}", dialog);
    page.click(&dialog.child(confirm.clone())).await?;
    session
        .wait_hidden_for(dialog, session.config().timeouts.dialog())
        .await
}

async fn confirm_with_native_prompt(session: &Session, trigger: &Locator) -> E2eResult<()> {
    let page = session.page();
    // Armed before the click; the prompt fires synchronously with it.
    page.accept_next_dialog().await?;
    if let Err(e) = page.click(trigger).await {
        // A handler left armed would accept the next, unrelated prompt.
        if let Err(cleanup) = page.clear_dialog_handler().await {
            warn!("Failed to disarm dialog handler: {}", cleanup);
        }
        return Err(e);
    }
    Ok(())
}
