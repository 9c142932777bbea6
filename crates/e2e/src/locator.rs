//! Accessibility-first element locators
//!
//! A [`Locator`] is a chain of [`Selector`]s, each one resolved inside the
//! elements matched by the previous one. Selectors prefer ARIA role plus
//! accessible name; `title` is only for icon-only controls that have no
//! accessible name.

use std::fmt;

use serde::{Deserialize, Serialize};

/// ARIA roles the suite queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AriaRole {
    Alert,
    Button,
    Cell,
    ColumnHeader,
    Combobox,
    Dialog,
    Group,
    Heading,
    Link,
    Row,
    Tab,
    TabPanel,
    Textbox,
}

impl AriaRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AriaRole::Alert => "alert",
            AriaRole::Button => "button",
            AriaRole::Cell => "cell",
            AriaRole::ColumnHeader => "columnheader",
            AriaRole::Combobox => "combobox",
            AriaRole::Dialog => "dialog",
            AriaRole::Group => "group",
            AriaRole::Heading => "heading",
            AriaRole::Link => "link",
            AriaRole::Row => "row",
            AriaRole::Tab => "tab",
            AriaRole::TabPanel => "tabpanel",
            AriaRole::Textbox => "textbox",
        }
    }
}

/// Text matcher with Playwright semantics: exact matches compare the whole
/// whitespace-normalised string, loose matches are case-insensitive
/// substrings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMatch {
    pub text: String,
    pub exact: bool,
}

impl TextMatch {
    pub fn exact(text: impl Into<String>) -> Self {
        Self { text: text.into(), exact: true }
    }

    pub fn loose(text: impl Into<String>) -> Self {
        Self { text: text.into(), exact: false }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        let candidate = normalize_whitespace(candidate);
        let wanted = normalize_whitespace(&self.text);
        if self.exact {
            candidate == wanted
        } else {
            candidate.to_lowercase().contains(&wanted.to_lowercase())
        }
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One step of a locator chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selector {
    Role {
        role: AriaRole,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<TextMatch>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        level: Option<u8>,
    },
    Text(TextMatch),
    Label(TextMatch),
    Placeholder(TextMatch),
    /// `title` attribute, the fallback for icon-only controls
    Title(TextMatch),
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn quoted(m: &TextMatch) -> String {
            if m.exact {
                format!("\"{}\"", m.text)
            } else {
                format!("~\"{}\"", m.text)
            }
        }

        match self {
            Selector::Role { role, name, level } => {
                write!(f, "role={}", role.as_str())?;
                if let Some(name) = name {
                    write!(f, "[name={}]", quoted(name))?;
                }
                if let Some(level) = level {
                    write!(f, "[level={}]", level)?;
                }
                Ok(())
            }
            Selector::Text(m) => write!(f, "text={}", quoted(m)),
            Selector::Label(m) => write!(f, "label={}", quoted(m)),
            Selector::Placeholder(m) => write!(f, "placeholder={}", quoted(m)),
            Selector::Title(m) => write!(f, "title={}", quoted(m)),
        }
    }
}

/// A scoped chain of selectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub chain: Vec<Selector>,
    /// Resolve to the first match instead of requiring a unique one
    #[serde(default)]
    pub first: bool,
}

impl Locator {
    fn single(selector: Selector) -> Self {
        Self { chain: vec![selector], first: false }
    }

    pub fn role(role: AriaRole) -> Self {
        Self::single(Selector::Role { role, name: None, level: None })
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::single(Selector::Text(TextMatch::loose(text)))
    }

    pub fn text_exact(text: impl Into<String>) -> Self {
        Self::single(Selector::Text(TextMatch::exact(text)))
    }

    pub fn label(text: impl Into<String>) -> Self {
        Self::single(Selector::Label(TextMatch::exact(text)))
    }

    pub fn placeholder(text: impl Into<String>) -> Self {
        Self::single(Selector::Placeholder(TextMatch::exact(text)))
    }

    pub fn title(text: impl Into<String>) -> Self {
        Self::single(Selector::Title(TextMatch::exact(text)))
    }

    pub fn button(name: impl Into<String>) -> Self {
        Self::role(AriaRole::Button).named_exactly(name)
    }

    pub fn dialog(name: impl Into<String>) -> Self {
        Self::role(AriaRole::Dialog).named_exactly(name)
    }

    pub fn tab(name: impl Into<String>) -> Self {
        Self::role(AriaRole::Tab).named_exactly(name)
    }

    pub fn heading(name: impl Into<String>) -> Self {
        Self::role(AriaRole::Heading).named_exactly(name)
    }

    /// Top-level (`h1`) heading with exactly this text
    pub fn page_heading(name: impl Into<String>) -> Self {
        Self::heading(name).level(1)
    }

    /// Filter the last role selector by a substring of its accessible name.
    pub fn named(self, name: impl Into<String>) -> Self {
        self.with_name(TextMatch::loose(name))
    }

    /// Filter the last role selector by its full accessible name.
    pub fn named_exactly(self, name: impl Into<String>) -> Self {
        self.with_name(TextMatch::exact(name))
    }

    fn with_name(mut self, m: TextMatch) -> Self {
        if let Some(Selector::Role { name, .. }) = self.chain.last_mut() {
            *name = Some(m);
        }
        self
    }

    pub fn level(mut self, level: u8) -> Self {
        if let Some(Selector::Role { level: l, .. }) = self.chain.last_mut() {
            *l = Some(level);
        }
        self
    }

    pub fn first(mut self) -> Self {
        self.first = true;
        self
    }

    /// Resolve `child` inside the elements this locator matches.
    pub fn child(&self, child: Locator) -> Locator {
        let mut chain = self.chain.clone();
        chain.extend(child.chain);
        Locator { chain, first: child.first }
    }

    /// Accessible name of the last selector, if it carries one.
    pub fn target_name(&self) -> Option<&TextMatch> {
        match self.chain.last()? {
            Selector::Role { name, .. } => name.as_ref(),
            Selector::Text(m)
            | Selector::Label(m)
            | Selector::Placeholder(m)
            | Selector::Title(m) => Some(m),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.chain.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", parts.join(" >> "))?;
        if self.first {
            write!(f, " >> first")?;
        }
        Ok(())
    }
}
