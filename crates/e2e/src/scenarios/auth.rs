use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::scenarios::{Area, Scenario};
use crate::session::{BootstrapOutcome, Session, SIGN_IN};

pub fn scenarios() -> Vec<Scenario> {
    vec![Scenario::new(
        "auth/bootstrap_is_idempotent",
        Area::Auth,
        |s| Box::pin(bootstrap_is_idempotent(s)),
    )]
}

/// A second bootstrap in the same context must not register again.
pub async fn bootstrap_is_idempotent(session: &Session) -> E2eResult<()> {
    session.page().goto("/").await?;

    let first = session.ensure_authenticated().await?;
    let second = session.ensure_authenticated().await?;

    if second != BootstrapOutcome::AlreadyAuthenticated {
        return Err(E2eError::AssertionFailed(format!(
            "second bootstrap registered again: {:?}",
            second
        )));
    }
    if let BootstrapOutcome::Registered(credentials) = first {
        if session.credentials().await.as_ref() != Some(&credentials) {
            return Err(E2eError::AssertionFailed(
                "registered credentials were not recorded on the session".into(),
            ));
        }
    }

    session.expect(Locator::button(SIGN_IN)).to_be_hidden().await
}
