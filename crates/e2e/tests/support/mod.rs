//! In-memory advisor application behind the `Page` seam
//!
//! Every call renders the current state into a small accessibility tree and
//! resolves locators against it with the same role/name/label rules the
//! browser driver uses. Long-running jobs advance one step every few page
//! calls, so polling code sees them move through their phases.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use advisor_e2e::locator::{AriaRole, Locator, Selector, TextMatch};
use advisor_e2e::naming::UniqueNames;
use advisor_e2e::wait::Backoff;
use advisor_e2e::{BrowserLauncher, E2eError, E2eResult, HarnessConfig, Page, Session};

const OPTIMIZE_OK: &[&str] = &["QUEUED", "FETCHING_DATA", "OPTIMIZING", "COMPLETED"];
const OPTIMIZE_FAILED: &[&str] = &["QUEUED", "FETCHING_DATA", "FAILED"];
const RUN: &[&str] = &["QUEUED", "RUNNING", "COMPLETED"];

const ACCOUNT_TYPES: &[&str] = &["nisa_growth", "nisa_tsumitate", "ideco", "taxable"];
const RISK_LEVELS: &[&str] = &["very_conservative", "conservative", "moderate", "growth", "aggressive"];
const FOLLOW_UPS: &[&str] = &[
    "How do expense ratios compare?",
    "What is the currency exposure?",
];

/// Harness configuration tuned for the fake: no settle pause, short backoff.
pub fn test_config() -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.timeouts.settle_ms = 0;
    config.timeouts.job_ms = 30_000;
    config.backoff = Backoff {
        initial_ms: 10,
        max_ms: 100,
        factor: 2.0,
    };
    config.job_backoff = Some(Backoff {
        initial_ms: 20,
        max_ms: 200,
        factor: 1.5,
    });
    config
}

pub fn session_on(page: Arc<FakePage>) -> Session {
    session_with(page, test_config())
}

pub fn session_with(page: Arc<FakePage>, config: HarnessConfig) -> Session {
    let page: Arc<dyn Page> = page;
    Session::new(page, Arc::new(config), UniqueNames::new())
}

#[derive(Debug, Clone)]
pub struct FakeOptions {
    /// Page calls each job phase lasts
    pub ticks_per_phase: u32,
    /// Jobs never reach a terminal phase
    pub stall_jobs: bool,
    /// Every registration is answered with "Username already exists"
    pub reject_registration: bool,
    /// Page calls after each navigation that still show the loading state
    pub loading_calls: u32,
}

impl Default for FakeOptions {
    fn default() -> Self {
        Self {
            ticks_per_phase: 2,
            stall_jobs: false,
            reject_registration: false,
            loading_calls: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub id: u64,
    pub owner: String,
    pub name: String,
    pub risk: String,
    pub accounts: Vec<Account>,
    pub holdings: Vec<Holding>,
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: u64,
    pub name: String,
    pub kind: String,
    pub limit: f64,
    pub balance: f64,
}

#[derive(Debug, Clone)]
pub struct Holding {
    pub ticker: String,
    pub quantity: f64,
}

/// State shared by every context, like the real backend.
#[derive(Debug, Default)]
pub struct Backend {
    users: Vec<(String, String)>,
    next_id: u64,
    plans: Vec<Plan>,
}

impl Backend {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn plan_mut(&mut self, id: u64) -> Option<&mut Plan> {
        self.plans.iter_mut().find(|p| p.id == id)
    }
}

/// The application; opens one [`FakePage`] per browser context.
#[derive(Clone, Default)]
pub struct FakeAdvisor {
    backend: Arc<Mutex<Backend>>,
    options: FakeOptions,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl FakeAdvisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: FakeOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn open(&self) -> Arc<FakePage> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Arc::new(FakePage {
            backend: self.backend.clone(),
            options: self.options.clone(),
            view: Mutex::new(View::default()),
            closed: self.closed.clone(),
            screenshots: Mutex::new(Vec::new()),
        })
    }

    /// A context whose session cookie already belongs to `user`.
    pub fn open_as(&self, user: &str) -> Arc<FakePage> {
        self.backend
            .lock()
            .users
            .push((user.to_string(), "password123".to_string()));
        let page = self.open();
        page.view.lock().user = Some(user.to_string());
        page
    }

    pub fn users(&self) -> Vec<String> {
        self.backend.lock().users.iter().map(|(u, _)| u.clone()).collect()
    }

    pub fn plans_of(&self, user: &str) -> Vec<Plan> {
        self.backend
            .lock()
            .plans
            .iter()
            .filter(|p| p.owner == user)
            .cloned()
            .collect()
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for FakeAdvisor {
    async fn new_page(&self) -> E2eResult<Arc<dyn Page>> {
        let page: Arc<dyn Page> = self.open();
        Ok(page)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Route {
    #[default]
    Home,
    Plan(u64),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum PlanTab {
    #[default]
    Portfolio,
    Accounts,
    Optimization,
    Playground,
}

impl PlanTab {
    const ALL: [PlanTab; 4] = [
        PlanTab::Portfolio,
        PlanTab::Accounts,
        PlanTab::Optimization,
        PlanTab::Playground,
    ];

    fn label(&self) -> &'static str {
        match self {
            PlanTab::Portfolio => "Portfolio",
            PlanTab::Accounts => "Accounts",
            PlanTab::Optimization => "Optimization",
            PlanTab::Playground => "Playground",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Currency {
    #[default]
    Jpy,
    Usd,
}

#[derive(Debug, Clone, PartialEq)]
enum Modal {
    Auth { register: bool, error: Option<String> },
    CreatePlan { error: Option<String> },
    AddAccount { error: Option<String> },
    DeleteAccount { id: u64, name: String },
    AddAsset { error: Option<String> },
    EditAsset { ticker: String, error: Option<String> },
}

#[derive(Debug, Clone)]
struct Job {
    phases: &'static [&'static str],
    index: usize,
    ticks: u32,
    stalled: bool,
    failure: Option<String>,
}

impl Job {
    fn new(phases: &'static [&'static str], stalled: bool) -> Self {
        Self {
            phases,
            index: 0,
            ticks: 0,
            stalled,
            failure: None,
        }
    }

    fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::new(OPTIMIZE_FAILED, false)
        }
    }

    fn advance(&mut self, per_phase: u32) {
        let last = self.phases.len() - 1;
        let limit = if self.stalled { last - 1 } else { last };
        if self.index >= limit {
            return;
        }
        self.ticks += 1;
        if self.ticks >= per_phase {
            self.index += 1;
            self.ticks = 0;
        }
    }

    fn status(&self) -> &'static str {
        self.phases[self.index]
    }

    fn completed(&self) -> bool {
        self.status() == "COMPLETED"
    }

    fn failed(&self) -> bool {
        self.status() == "FAILED"
    }
}

#[derive(Debug, Default)]
struct Assistant {
    job: Option<Job>,
    error: Option<String>,
}

/// Per-context UI state.
#[derive(Debug, Default)]
struct View {
    user: Option<String>,
    route: Route,
    tab: PlanTab,
    modal: Option<Modal>,
    assistant: Option<Assistant>,
    inputs: HashMap<&'static str, String>,
    optimization: Option<Job>,
    backtest: Option<Job>,
    playground_error: Option<String>,
    currency: Currency,
    dialog_armed: bool,
    loading: u32,
    closed: bool,
}

impl View {
    fn input(&self, field: &str) -> String {
        self.inputs.get(field).map(|v| v.trim().to_string()).unwrap_or_default()
    }

    fn leave_plan_view(&mut self) {
        self.tab = PlanTab::default();
        self.optimization = None;
        self.backtest = None;
        self.playground_error = None;
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Action {
    OpenAuth,
    ShowRegister(bool),
    SubmitLogin,
    SubmitRegister,
    CloseModal,
    OpenCreatePlan,
    SubmitCreatePlan,
    BackToPlans,
    OpenPlan(u64),
    DeletePlan(u64),
    SelectTab(PlanTab),
    OpenAddAccount,
    SubmitAccount,
    RequestDeleteAccount(u64),
    ConfirmDeleteAccount,
    OpenAddAsset,
    SubmitAsset,
    EditAsset(String),
    SubmitEditAsset,
    RemoveAsset(String),
    RunOptimization,
    RunBacktest,
    SelectCurrency(Currency),
    OpenAssistant,
    CloseAssistant,
    AskAssistant,
    FollowUp(usize),
}

#[derive(Debug, Clone, Default)]
struct Node {
    parent: Option<usize>,
    role: Option<AriaRole>,
    name: String,
    level: Option<u8>,
    text: String,
    label: Option<String>,
    title: Option<String>,
    selected: Option<bool>,
    field: Option<&'static str>,
    options: &'static [&'static str],
    action: Option<Action>,
}

impl Node {
    fn role(role: AriaRole, name: impl Into<String>) -> Self {
        Self {
            role: Some(role),
            name: name.into(),
            ..Self::default()
        }
    }

    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    fn heading(text: &str, level: u8) -> Self {
        Self {
            level: Some(level),
            text: text.to_string(),
            ..Self::role(AriaRole::Heading, text)
        }
    }

    fn button(name: &str, action: Action) -> Self {
        Self {
            text: name.to_string(),
            action: Some(action),
            ..Self::role(AriaRole::Button, name)
        }
    }

    /// Icon-only control: no text, identified by its `title`.
    fn icon(title: &str, action: Action) -> Self {
        Self {
            title: Some(title.to_string()),
            action: Some(action),
            ..Self::role(AriaRole::Button, "")
        }
    }

    fn input(label: &str, field: &'static str) -> Self {
        Self {
            label: Some(label.to_string()),
            field: Some(field),
            ..Self::role(AriaRole::Textbox, label)
        }
    }

    fn select(label: &str, field: &'static str, options: &'static [&'static str]) -> Self {
        Self {
            options,
            ..Self {
                role: Some(AriaRole::Combobox),
                ..Self::input(label, field)
            }
        }
    }

    fn cell(role: AriaRole, text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::role(role, text)
        }
    }

    fn alert(message: &str) -> Self {
        Self {
            text: message.to_string(),
            ..Self::role(AriaRole::Alert, message)
        }
    }

    /// Region described by `aria-label`, e.g. a job status line.
    fn labelled(label: &str, text: String) -> Self {
        Self {
            label: Some(label.to_string()),
            text,
            ..Self::default()
        }
    }

    fn on_click(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    fn matches(&self, selector: &Selector) -> bool {
        let opt = |value: &Option<String>, m: &TextMatch| value.as_deref().map(|v| m.matches(v)).unwrap_or(false);
        match selector {
            Selector::Role { role, name, level } => {
                self.role == Some(*role)
                    && name.as_ref().map(|m| m.matches(&self.name)).unwrap_or(true)
                    && level.map(|l| self.level == Some(l)).unwrap_or(true)
            }
            Selector::Text(m) => !self.text.is_empty() && m.matches(&self.text),
            Selector::Label(m) => opt(&self.label, m),
            Selector::Placeholder(_) => false,
            Selector::Title(m) => opt(&self.title, m),
        }
    }
}

#[derive(Debug, Default)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn add(&mut self, parent: Option<usize>, mut node: Node) -> usize {
        node.parent = parent;
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn is_descendant(&self, node: usize, ancestor: usize) -> bool {
        let mut current = self.nodes[node].parent;
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.nodes[p].parent;
        }
        false
    }

    fn resolve(&self, locator: &Locator) -> Vec<usize> {
        let mut scope: Option<Vec<usize>> = None;
        for selector in &locator.chain {
            let matched = (0..self.nodes.len())
                .filter(|&i| self.nodes[i].matches(selector))
                .filter(|&i| match &scope {
                    Some(scope) => scope.iter().any(|&a| self.is_descendant(i, a)),
                    None => true,
                })
                .collect();
            scope = Some(matched);
        }
        let mut found = scope.unwrap_or_default();
        if locator.first {
            found.truncate(1);
        }
        found
    }

    fn text_content(&self, node: usize) -> String {
        let mut parts = Vec::new();
        if !self.nodes[node].text.is_empty() {
            parts.push(self.nodes[node].text.clone());
        }
        for child in (node + 1)..self.nodes.len() {
            if self.nodes[child].parent == Some(node) {
                let text = self.text_content(child);
                if !text.is_empty() {
                    parts.push(text);
                }
            }
        }
        parts.join(" ")
    }
}

fn quantity(q: f64) -> String {
    format!("{}", q)
}

fn render(view: &View, backend: &Backend) -> Tree {
    let mut t = Tree::default();
    let root = t.add(None, Node::default());
    t.add(Some(root), Node::text("ETF Portfolio Advisor"));

    match &view.user {
        None => {
            t.add(Some(root), Node::button("Sign In", Action::OpenAuth));
        }
        Some(user) => {
            t.add(Some(root), Node::text(format!("Signed in as {}", user)));
            t.add(Some(root), Node::icon("Open research assistant", Action::OpenAssistant));
            let plan = match view.route {
                Route::Plan(id) => backend.plans.iter().find(|p| p.id == id),
                Route::Home => None,
            };
            match plan {
                _ if view.loading > 0 => {
                    t.add(Some(root), Node::text("Loading..."));
                }
                Some(plan) => render_plan(&mut t, root, view, plan),
                None => render_plan_list(&mut t, root, backend, user),
            }
        }
    }

    if let Some(modal) = &view.modal {
        render_modal(&mut t, root, modal);
    }
    if let Some(assistant) = &view.assistant {
        render_assistant(&mut t, root, assistant);
    }
    t
}

fn render_plan_list(t: &mut Tree, root: usize, backend: &Backend, user: &str) {
    t.add(Some(root), Node::heading("Your Plans", 2));
    let plans: Vec<&Plan> = backend.plans.iter().filter(|p| p.owner == user).collect();
    if plans.is_empty() {
        t.add(Some(root), Node::text("You have no plans yet."));
        t.add(Some(root), Node::button("Create your first plan", Action::OpenCreatePlan));
        return;
    }
    t.add(Some(root), Node::button("New Plan", Action::OpenCreatePlan));
    for plan in plans {
        let card = t.add(Some(root), Node::role(AriaRole::Group, format!("Plan {}", plan.name)));
        t.add(Some(card), Node::text(plan.name.clone()).on_click(Action::OpenPlan(plan.id)));
        t.add(Some(card), Node::text(format!("Risk: {}", plan.risk)));
        t.add(Some(card), Node::icon("Delete plan", Action::DeletePlan(plan.id)));
    }
}

fn render_plan(t: &mut Tree, root: usize, view: &View, plan: &Plan) {
    t.add(Some(root), Node::button("Back to Plans", Action::BackToPlans));
    t.add(Some(root), Node::heading(&plan.name, 1));
    for tab in PlanTab::ALL {
        t.add(
            Some(root),
            Node {
                selected: Some(tab == view.tab),
                text: tab.label().to_string(),
                action: Some(Action::SelectTab(tab)),
                ..Node::role(AriaRole::Tab, tab.label())
            },
        );
    }
    let panel = t.add(Some(root), Node::role(AriaRole::TabPanel, view.tab.label()));
    match view.tab {
        PlanTab::Portfolio => render_portfolio(t, panel, plan),
        PlanTab::Accounts => render_accounts(t, panel, plan),
        PlanTab::Optimization => render_optimization(t, panel, view, plan),
        PlanTab::Playground => render_playground(t, panel, view),
    }
}

fn header_row(t: &mut Tree, parent: usize, headers: &[&str]) {
    let row = t.add(Some(parent), Node::role(AriaRole::Row, headers.join(" ")));
    for header in headers {
        t.add(Some(row), Node::cell(AriaRole::ColumnHeader, header));
    }
}

fn data_row(t: &mut Tree, parent: usize, cells: &[String]) -> usize {
    let row = t.add(Some(parent), Node::role(AriaRole::Row, cells.join(" ")));
    for cell in cells {
        t.add(Some(row), Node::cell(AriaRole::Cell, cell));
    }
    row
}

fn render_portfolio(t: &mut Tree, panel: usize, plan: &Plan) {
    t.add(Some(panel), Node::button("Add Asset", Action::OpenAddAsset));
    if plan.holdings.is_empty() {
        t.add(Some(panel), Node::text("No holdings yet"));
        return;
    }
    header_row(t, panel, &["Ticker", "Quantity"]);
    for holding in &plan.holdings {
        let row = data_row(t, panel, &[holding.ticker.clone(), quantity(holding.quantity)]);
        t.add(Some(row), Node::icon("Edit holding", Action::EditAsset(holding.ticker.clone())));
        t.add(Some(row), Node::icon("Remove holding", Action::RemoveAsset(holding.ticker.clone())));
    }
}

fn render_accounts(t: &mut Tree, panel: usize, plan: &Plan) {
    t.add(Some(panel), Node::button("Add Account", Action::OpenAddAccount));
    header_row(t, panel, &["Account Name", "Account Type", "Annual Limit"]);
    for account in &plan.accounts {
        let row = data_row(
            t,
            panel,
            &[account.name.clone(), account.kind.clone(), quantity(account.limit)],
        );
        t.add(Some(row), Node::icon("Delete account", Action::RequestDeleteAccount(account.id)));
    }
}

fn render_optimization(t: &mut Tree, panel: usize, view: &View, plan: &Plan) {
    t.add(Some(panel), Node::input("Max Asset Weight", "opt.max_weight"));
    t.add(Some(panel), Node::button("Run Optimization", Action::RunOptimization));
    let Some(job) = &view.optimization else {
        return;
    };
    t.add(
        Some(panel),
        Node::labelled("Optimization status", format!("Status: {}", job.status())),
    );
    if job.failed() {
        let reason = job.failure.as_deref().unwrap_or("unknown error");
        t.add(Some(panel), Node::alert(&format!("Optimization failed: {}", reason)));
    }
    if job.completed() {
        t.add(Some(panel), Node::heading("Optimized Allocation", 2));
        header_row(t, panel, &["Ticker", "Weight"]);
        let weight = 100.0 / plan.holdings.len() as f64;
        for holding in &plan.holdings {
            data_row(t, panel, &[holding.ticker.clone(), format!("{:.1}%", weight)]);
        }
    }
}

fn render_playground(t: &mut Tree, panel: usize, view: &View) {
    t.add(Some(panel), Node::input("Tickers", "pg.tickers"));
    t.add(Some(panel), Node::input("Start Date", "pg.start"));
    t.add(Some(panel), Node::button("Run Backtest", Action::RunBacktest));
    for (currency, label) in [(Currency::Jpy, "JPY"), (Currency::Usd, "USD")] {
        t.add(
            Some(panel),
            Node {
                selected: Some(view.currency == currency),
                text: label.to_string(),
                action: Some(Action::SelectCurrency(currency)),
                ..Node::role(AriaRole::Tab, label)
            },
        );
    }
    if let Some(error) = &view.playground_error {
        t.add(Some(panel), Node::alert(error));
    }
    let Some(job) = &view.backtest else {
        return;
    };
    t.add(
        Some(panel),
        Node::labelled("Backtest status", format!("Status: {}", job.status())),
    );
    if job.completed() {
        t.add(Some(panel), Node::heading("Backtest Results", 2));
        let value = match view.currency {
            Currency::Jpy => "¥1,234,567",
            Currency::Usd => "$8,230.45",
        };
        t.add(Some(panel), Node::text(format!("Final value {}", value)));
    }
}

fn render_modal(t: &mut Tree, root: usize, modal: &Modal) {
    match modal {
        Modal::Auth { register, error } => {
            let d = t.add(Some(root), Node::role(AriaRole::Dialog, "Welcome"));
            t.add(Some(d), Node::heading("Welcome", 2));
            t.add(Some(d), Node::input("Username", "auth.username"));
            t.add(Some(d), Node::input("Password", "auth.password"));
            if *register {
                t.add(Some(d), Node::input("Confirm Password", "auth.confirm"));
                t.add(Some(d), Node::button("Create Account", Action::SubmitRegister));
                t.add(Some(d), Node::button("Back to Sign In", Action::ShowRegister(false)));
            } else {
                t.add(Some(d), Node::button("Sign In", Action::SubmitLogin));
                t.add(Some(d), Node::button("Register", Action::ShowRegister(true)));
            }
            if let Some(error) = error {
                t.add(Some(d), Node::alert(error));
            }
        }
        Modal::CreatePlan { error } => {
            let d = t.add(Some(root), Node::role(AriaRole::Dialog, "Create New Plan"));
            t.add(Some(d), Node::heading("Create New Plan", 2));
            t.add(Some(d), Node::input("Plan Name", "plan.name"));
            t.add(Some(d), Node::select("Risk Preference", "plan.risk", RISK_LEVELS));
            t.add(Some(d), Node::button("Create Plan", Action::SubmitCreatePlan));
            t.add(Some(d), Node::button("Cancel", Action::CloseModal));
            if let Some(error) = error {
                t.add(Some(d), Node::alert(error));
            }
        }
        Modal::AddAccount { error } => {
            let d = t.add(Some(root), Node::role(AriaRole::Dialog, "Add Tax Account"));
            t.add(Some(d), Node::input("Account Name", "acct.name"));
            t.add(Some(d), Node::select("Account Type", "acct.type", ACCOUNT_TYPES));
            t.add(Some(d), Node::input("Annual Limit", "acct.limit"));
            t.add(Some(d), Node::input("Current Balance", "acct.balance"));
            t.add(Some(d), Node::button("Save Account", Action::SubmitAccount));
            t.add(Some(d), Node::button("Cancel", Action::CloseModal));
            if let Some(error) = error {
                t.add(Some(d), Node::alert(error));
            }
        }
        Modal::DeleteAccount { name, .. } => {
            let d = t.add(Some(root), Node::role(AriaRole::Dialog, "Delete Account"));
            t.add(Some(d), Node::text(format!("Delete {}? This cannot be undone.", name)));
            t.add(Some(d), Node::button("Cancel", Action::CloseModal));
            t.add(Some(d), Node::button("Delete", Action::ConfirmDeleteAccount));
        }
        Modal::AddAsset { error } => {
            let d = t.add(Some(root), Node::role(AriaRole::Dialog, "Add Asset"));
            t.add(Some(d), Node::input("Ticker", "asset.ticker"));
            t.add(Some(d), Node::input("Quantity", "asset.quantity"));
            t.add(Some(d), Node::button("Save", Action::SubmitAsset));
            t.add(Some(d), Node::button("Cancel", Action::CloseModal));
            if let Some(error) = error {
                t.add(Some(d), Node::alert(error));
            }
        }
        Modal::EditAsset { ticker, error } => {
            let d = t.add(Some(root), Node::role(AriaRole::Dialog, "Edit Asset"));
            t.add(Some(d), Node::text(ticker.clone()));
            t.add(Some(d), Node::input("Quantity", "edit.quantity"));
            t.add(Some(d), Node::button("Save", Action::SubmitEditAsset));
            t.add(Some(d), Node::button("Cancel", Action::CloseModal));
            if let Some(error) = error {
                t.add(Some(d), Node::alert(error));
            }
        }
    }
}

fn render_assistant(t: &mut Tree, root: usize, assistant: &Assistant) {
    let d = t.add(Some(root), Node::role(AriaRole::Dialog, "Research Assistant"));
    t.add(Some(d), Node::heading("Research Assistant", 2));
    t.add(Some(d), Node::input("Research query", "research.query"));
    t.add(Some(d), Node::button("Ask", Action::AskAssistant));
    t.add(Some(d), Node::button("Close", Action::CloseAssistant));
    if let Some(error) = &assistant.error {
        t.add(Some(d), Node::alert(error));
    }
    let Some(job) = &assistant.job else {
        return;
    };
    t.add(
        Some(d),
        Node::labelled("Research status", format!("Status: {}", job.status())),
    );
    if job.completed() {
        t.add(Some(d), Node::heading("Summary", 3));
        t.add(
            Some(d),
            Node::text("Broad index ETFs with low expense ratios dominate the shortlist."),
        );
        let group = t.add(Some(d), Node::role(AriaRole::Group, "Suggested follow-ups"));
        t.add(Some(group), Node::heading("Suggested follow-ups", 3));
        for (i, question) in FOLLOW_UPS.iter().enumerate() {
            t.add(Some(group), Node::button(question, Action::FollowUp(i)));
        }
    }
}

/// One browser context of the fake application.
pub struct FakePage {
    backend: Arc<Mutex<Backend>>,
    options: FakeOptions,
    view: Mutex<View>,
    closed: Arc<AtomicUsize>,
    screenshots: Mutex<Vec<String>>,
}

impl FakePage {
    pub fn screenshots(&self) -> Vec<String> {
        self.screenshots.lock().clone()
    }

    pub fn logged_in_as(&self) -> Option<String> {
        self.view.lock().user.clone()
    }

    /// Advance jobs, then run `f` against a fresh render.
    fn with_tree<T>(&self, f: impl FnOnce(&Tree, &View) -> E2eResult<T>) -> E2eResult<T> {
        let mut view = self.view.lock();
        if view.closed {
            return Err(E2eError::Driver("Target page, context or browser has been closed".into()));
        }
        let per_phase = self.options.ticks_per_phase;
        let state = &mut *view;
        let assistant_job = state.assistant.as_mut().and_then(|a| a.job.as_mut());
        for job in [state.optimization.as_mut(), state.backtest.as_mut(), assistant_job]
            .into_iter()
            .flatten()
        {
            job.advance(per_phase);
        }
        let backend = self.backend.lock();
        let tree = render(&view, &backend);
        view.loading = view.loading.saturating_sub(1);
        f(&tree, &view)
    }

    fn resolve_one(tree: &Tree, locator: &Locator) -> E2eResult<usize> {
        let found = tree.resolve(locator);
        match found.len() {
            0 => Err(E2eError::Driver(format!("waiting for {}: no matching element", locator))),
            1 => Ok(found[0]),
            n => Err(E2eError::Driver(format!(
                "strict mode violation: {} resolved to {} elements",
                locator, n
            ))),
        }
    }

    fn set_field(&self, locator: &Locator, value: &str, select: bool) -> E2eResult<()> {
        let field = self.with_tree(|tree, _| {
            let node = &tree.nodes[Self::resolve_one(tree, locator)?];
            let field = node
                .field
                .ok_or_else(|| E2eError::Driver(format!("{} is not a form control", locator)))?;
            if select && !node.options.contains(&value) {
                return Err(E2eError::Driver(format!("{} has no option '{}'", locator, value)));
            }
            Ok(field)
        })?;
        self.view.lock().inputs.insert(field, value.to_string());
        Ok(())
    }

    fn apply(&self, action: Action) {
        let mut view = self.view.lock();
        let mut backend = self.backend.lock();
        let view = &mut *view;
        let backend = &mut *backend;
        let plan_id = match view.route {
            Route::Plan(id) => Some(id),
            Route::Home => None,
        };

        match action {
            Action::OpenAuth => {
                view.inputs.retain(|k, _| !k.starts_with("auth."));
                view.modal = Some(Modal::Auth { register: false, error: None });
            }
            Action::ShowRegister(register) => {
                view.modal = Some(Modal::Auth { register, error: None });
            }
            Action::SubmitLogin => {
                let (user, password) = (view.input("auth.username"), view.input("auth.password"));
                if backend.users.iter().any(|(u, p)| *u == user && *p == password) {
                    view.user = Some(user);
                    view.modal = None;
                } else {
                    view.modal = Some(Modal::Auth {
                        register: false,
                        error: Some("Invalid username or password".into()),
                    });
                }
            }
            Action::SubmitRegister => {
                let user = view.input("auth.username");
                let password = view.input("auth.password");
                let error = if user.is_empty() || password.is_empty() {
                    Some("Username and password are required")
                } else if password != view.input("auth.confirm") {
                    Some("Passwords do not match")
                } else if self.options.reject_registration || backend.users.iter().any(|(u, _)| *u == user) {
                    Some("Username already exists")
                } else {
                    None
                };
                match error {
                    Some(error) => {
                        view.modal = Some(Modal::Auth {
                            register: true,
                            error: Some(error.into()),
                        })
                    }
                    None => {
                        backend.users.push((user.clone(), password));
                        view.user = Some(user);
                        view.modal = None;
                    }
                }
            }
            Action::CloseModal => view.modal = None,
            Action::OpenCreatePlan => {
                view.inputs.insert("plan.name", String::new());
                view.inputs.insert("plan.risk", "moderate".into());
                view.modal = Some(Modal::CreatePlan { error: None });
            }
            Action::SubmitCreatePlan => {
                let name = view.input("plan.name");
                let Some(owner) = view.user.clone() else {
                    return;
                };
                if name.is_empty() {
                    view.modal = Some(Modal::CreatePlan {
                        error: Some("Plan name is required".into()),
                    });
                    return;
                }
                let id = backend.next_id();
                backend.plans.push(Plan {
                    id,
                    owner,
                    name,
                    risk: view.input("plan.risk"),
                    accounts: Vec::new(),
                    holdings: Vec::new(),
                });
                view.modal = None;
                view.route = Route::Plan(id);
                view.leave_plan_view();
            }
            Action::BackToPlans => {
                view.route = Route::Home;
                view.leave_plan_view();
            }
            Action::OpenPlan(id) => {
                view.route = Route::Plan(id);
                view.leave_plan_view();
            }
            Action::DeletePlan(id) => {
                // Unhandled native confirm() prompts are dismissed.
                if view.dialog_armed {
                    view.dialog_armed = false;
                    backend.plans.retain(|p| p.id != id);
                }
            }
            Action::SelectTab(tab) => view.tab = tab,
            Action::OpenAddAccount => {
                view.inputs.retain(|k, _| !k.starts_with("acct."));
                view.inputs.insert("acct.type", ACCOUNT_TYPES[0].into());
                view.modal = Some(Modal::AddAccount { error: None });
            }
            Action::SubmitAccount => {
                let name = view.input("acct.name");
                let limit = view.input("acct.limit").parse::<f64>().ok().filter(|l| *l >= 0.0);
                let raw_balance = view.input("acct.balance");
                let balance = if raw_balance.is_empty() {
                    Some(0.0)
                } else {
                    raw_balance.parse::<f64>().ok().filter(|b| *b >= 0.0)
                };
                let error = match (name.is_empty(), limit, balance) {
                    (true, _, _) => Some("Account name is required"),
                    (false, None, _) => Some("Annual limit must be a positive number"),
                    (false, Some(_), None) => Some("Current balance must be a positive number"),
                    (false, Some(l), Some(b)) if b > l => Some("Current balance exceeds the annual limit"),
                    (false, Some(_), Some(_)) => None,
                };
                if let Some(error) = error {
                    view.modal = Some(Modal::AddAccount { error: Some(error.into()) });
                    return;
                }
                let id = backend.next_id();
                let kind = view.input("acct.type");
                if let Some(plan) = plan_id.and_then(|p| backend.plan_mut(p)) {
                    plan.accounts.push(Account {
                        id,
                        name,
                        kind,
                        limit: limit.unwrap_or_default(),
                        balance: balance.unwrap_or_default(),
                    });
                }
                view.modal = None;
            }
            Action::RequestDeleteAccount(id) => {
                let name = plan_id
                    .and_then(|p| backend.plan_mut(p))
                    .and_then(|p| p.accounts.iter().find(|a| a.id == id))
                    .map(|a| a.name.clone())
                    .unwrap_or_default();
                view.modal = Some(Modal::DeleteAccount { id, name });
            }
            Action::ConfirmDeleteAccount => {
                if let Some(Modal::DeleteAccount { id, .. }) = view.modal.take() {
                    if let Some(plan) = plan_id.and_then(|p| backend.plan_mut(p)) {
                        plan.accounts.retain(|a| a.id != id);
                    }
                }
            }
            Action::OpenAddAsset => {
                view.inputs.retain(|k, _| !k.starts_with("asset."));
                view.modal = Some(Modal::AddAsset { error: None });
            }
            Action::SubmitAsset => {
                let ticker = view.input("asset.ticker").to_uppercase();
                let qty = view.input("asset.quantity").parse::<f64>().ok().filter(|q| *q > 0.0);
                let (ticker, qty) = match (ticker.is_empty(), qty) {
                    (false, Some(qty)) => (ticker, qty),
                    (true, _) => {
                        view.modal = Some(Modal::AddAsset { error: Some("Ticker is required".into()) });
                        return;
                    }
                    (false, None) => {
                        view.modal = Some(Modal::AddAsset {
                            error: Some("Quantity must be greater than zero".into()),
                        });
                        return;
                    }
                };
                if let Some(plan) = plan_id.and_then(|p| backend.plan_mut(p)) {
                    match plan.holdings.iter_mut().find(|h| h.ticker == ticker) {
                        Some(holding) => holding.quantity += qty,
                        None => plan.holdings.push(Holding { ticker, quantity: qty }),
                    }
                }
                view.modal = None;
            }
            Action::EditAsset(ticker) => {
                let current = plan_id
                    .and_then(|p| backend.plan_mut(p))
                    .and_then(|p| p.holdings.iter().find(|h| h.ticker == ticker))
                    .map(|h| quantity(h.quantity))
                    .unwrap_or_default();
                view.inputs.insert("edit.quantity", current);
                view.modal = Some(Modal::EditAsset { ticker, error: None });
            }
            Action::SubmitEditAsset => {
                let Some(Modal::EditAsset { ticker, .. }) = view.modal.clone() else {
                    return;
                };
                let Some(qty) = view.input("edit.quantity").parse::<f64>().ok().filter(|q| *q > 0.0) else {
                    view.modal = Some(Modal::EditAsset {
                        ticker,
                        error: Some("Quantity must be greater than zero".into()),
                    });
                    return;
                };
                if let Some(plan) = plan_id.and_then(|p| backend.plan_mut(p)) {
                    if let Some(holding) = plan.holdings.iter_mut().find(|h| h.ticker == ticker) {
                        holding.quantity = qty;
                    }
                }
                view.modal = None;
            }
            Action::RemoveAsset(ticker) => {
                if let Some(plan) = plan_id.and_then(|p| backend.plan_mut(p)) {
                    plan.holdings.retain(|h| h.ticker != ticker);
                }
            }
            Action::RunOptimization => {
                let raw = view.input("opt.max_weight");
                let weight = if raw.is_empty() { Some(100.0) } else { raw.parse::<f64>().ok() };
                let holdings = plan_id
                    .and_then(|p| backend.plan_mut(p))
                    .map(|p| p.holdings.len())
                    .unwrap_or(0);
                view.optimization = Some(match weight {
                    Some(w) if w <= 0.0 || w > 100.0 => {
                        Job::failing("max asset weight must be between 0 and 100")
                    }
                    None => Job::failing("max asset weight is not a number"),
                    Some(_) if holdings == 0 => Job::failing("the portfolio has no holdings"),
                    Some(_) => Job::new(OPTIMIZE_OK, self.options.stall_jobs),
                });
            }
            Action::RunBacktest => {
                if view.input("pg.tickers").is_empty() {
                    view.playground_error = Some("Enter at least one ticker".into());
                    view.backtest = None;
                } else {
                    view.playground_error = None;
                    view.backtest = Some(Job::new(RUN, self.options.stall_jobs));
                }
            }
            Action::SelectCurrency(currency) => view.currency = currency,
            Action::OpenAssistant => {
                if view.assistant.is_none() {
                    view.assistant = Some(Assistant::default());
                }
            }
            Action::CloseAssistant => view.assistant = None,
            Action::AskAssistant => {
                let query = view.input("research.query");
                let stalled = self.options.stall_jobs;
                if let Some(assistant) = view.assistant.as_mut() {
                    if query.is_empty() {
                        assistant.error = Some("Enter a question first".into());
                    } else {
                        assistant.error = None;
                        assistant.job = Some(Job::new(RUN, stalled));
                    }
                }
            }
            Action::FollowUp(i) => {
                view.inputs.insert("research.query", FOLLOW_UPS[i].to_string());
            }
        }
    }
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, _path: &str) -> E2eResult<()> {
        let mut view = self.view.lock();
        if view.closed {
            return Err(E2eError::Driver("Target page, context or browser has been closed".into()));
        }
        view.route = Route::Home;
        view.modal = None;
        view.assistant = None;
        view.inputs.clear();
        view.currency = Currency::default();
        view.loading = self.options.loading_calls;
        view.leave_plan_view();
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> E2eResult<()> {
        let action = self.with_tree(|tree, _| {
            let node = Self::resolve_one(tree, locator)?;
            Ok(tree.nodes[node].action.clone())
        })?;
        if let Some(action) = action {
            self.apply(action);
        }
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        self.set_field(locator, value, false)
    }

    async fn select_option(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        self.set_field(locator, value, true)
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        self.with_tree(|tree, _| Ok(!tree.resolve(locator).is_empty()))
    }

    async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        self.with_tree(|tree, _| Ok(tree.resolve(locator).len()))
    }

    async fn text_content(&self, locator: &Locator) -> E2eResult<Option<String>> {
        self.with_tree(|tree, _| {
            if tree.resolve(locator).is_empty() {
                return Ok(None);
            }
            let node = Self::resolve_one(tree, locator)?;
            Ok(Some(tree.text_content(node)))
        })
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> E2eResult<Option<String>> {
        self.with_tree(|tree, _| {
            if tree.resolve(locator).is_empty() {
                return Ok(None);
            }
            let node = &tree.nodes[Self::resolve_one(tree, locator)?];
            Ok(match name {
                "aria-selected" => node.selected.map(|s| s.to_string()),
                "title" => node.title.clone(),
                "aria-label" => node.label.clone(),
                _ => None,
            })
        })
    }

    async fn input_value(&self, locator: &Locator) -> E2eResult<String> {
        self.with_tree(|tree, view| {
            let node = &tree.nodes[Self::resolve_one(tree, locator)?];
            let field = node
                .field
                .ok_or_else(|| E2eError::Driver(format!("{} is not a form control", locator)))?;
            Ok(view.inputs.get(field).cloned().unwrap_or_default())
        })
    }

    async fn accept_next_dialog(&self) -> E2eResult<()> {
        self.view.lock().dialog_armed = true;
        Ok(())
    }

    async fn clear_dialog_handler(&self) -> E2eResult<()> {
        self.view.lock().dialog_armed = false;
        Ok(())
    }

    async fn screenshot(&self, name: &str) -> E2eResult<Option<PathBuf>> {
        self.screenshots.lock().push(name.to_string());
        Ok(Some(PathBuf::from(format!("test-results/screenshots/{}.png", name))))
    }

    async fn close(&self) -> E2eResult<()> {
        let mut view = self.view.lock();
        if !view.closed {
            view.closed = true;
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
