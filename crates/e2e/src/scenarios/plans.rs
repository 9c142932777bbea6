use crate::error::E2eResult;
use crate::locator::Locator;
use crate::plans::{self, plan_card, BACK_TO_PLANS};
use crate::scenarios::{Area, Scenario};
use crate::session::Session;

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new("plans/create_first_plan", Area::Plans, |s| {
            Box::pin(create_first_plan(s))
        }),
        Scenario::new("plans/create_multiple_plans", Area::Plans, |s| {
            Box::pin(create_multiple_plans(s))
        }),
        Scenario::new("plans/delete_plan", Area::Plans, |s| Box::pin(delete_plan(s))),
        Scenario::new("plans/delete_leaves_other_plans", Area::Plans, |s| {
            Box::pin(delete_leaves_other_plans(s))
        }),
        Scenario::new("plans/reopen_plan_from_list", Area::Plans, |s| {
            Box::pin(reopen_plan_from_list(s))
        }),
    ]
}

pub async fn create_first_plan(session: &Session) -> E2eResult<()> {
    session.page().goto("/").await?;
    let name = session.names().name("First Plan");
    plans::create_plan(session, &name).await?;

    session.expect(Locator::page_heading(&name)).to_be_visible().await?;
    session.expect(Locator::button(BACK_TO_PLANS)).to_be_visible().await
}

pub async fn create_multiple_plans(session: &Session) -> E2eResult<()> {
    session.page().goto("/").await?;
    let retirement = session.names().name("Retirement");
    let education = session.names().name("Education");

    plans::create_plan(session, &retirement).await?;
    plans::back_to_plans(session).await?;
    plans::create_plan(session, &education).await?;
    plans::back_to_plans(session).await?;

    session.expect(Locator::text_exact(&retirement)).to_be_visible().await?;
    session.expect(Locator::text_exact(&education)).to_be_visible().await
}

pub async fn delete_plan(session: &Session) -> E2eResult<()> {
    session.page().goto("/").await?;
    let name = session.names().name("Delete Me");

    plans::create_plan(session, &name).await?;
    plans::delete_plan(session, &name).await?;

    session.expect(Locator::text_exact(&name)).to_be_hidden().await
}

pub async fn delete_leaves_other_plans(session: &Session) -> E2eResult<()> {
    session.page().goto("/").await?;
    let keep = session.names().name("Keep");
    let doomed = session.names().name("Keep Not");

    plans::create_plan(session, &keep).await?;
    plans::create_plan(session, &doomed).await?;
    plans::delete_plan(session, &doomed).await?;

    session.expect(plan_card(&doomed)).to_be_hidden().await?;
    session.expect(plan_card(&keep)).to_be_visible().await
}

pub async fn reopen_plan_from_list(session: &Session) -> E2eResult<()> {
    session.page().goto("/").await?;
    let name = session.names().name("Reopen");

    plans::create_plan(session, &name).await?;
    plans::back_to_plans(session).await?;
    session.expect(Locator::page_heading(&name)).to_be_hidden().await?;

    plans::open_plan(session, &name).await?;
    session.expect(Locator::page_heading(&name)).to_be_visible().await
}
