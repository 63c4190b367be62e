//! Capability surface of the browser-automation runtime
//!
//! Page rendering, DOM queries and network transport belong to the browser.
//! The harvesting core only talks to it through `WorkspaceSurface`, which keeps
//! the core testable against scripted pages and confines chromiumoxide to
//! `chromium.rs`.

pub mod chromium;
mod js_scripts;

use serde::{Deserialize, Serialize};

use crate::auth::AuthSession;

pub use chromium::ChromiumSurface;

/// One way of locating a clickable control
///
/// Controls are found through ranked lists of matchers tried in order, so a
/// relabelled or restyled control still has a chance of being found.
/// Disabled elements (`disabled` or `aria-disabled="true"`) never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMatcher {
    /// First element matching a CSS selector
    Css(String),
    /// First element matching `selector` whose trimmed text equals `text`
    /// (case-insensitive)
    Text { selector: String, text: String },
    /// First element matching `selector` whose text contains `text`
    /// (case-insensitive)
    TextContains { selector: String, text: String },
}

impl ControlMatcher {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn text(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Text {
            selector: selector.into(),
            text: text.into(),
        }
    }

    pub fn text_contains(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self::TextContains {
            selector: selector.into(),
            text: text.into(),
        }
    }

    /// Whether an element with this visible text satisfies the matcher
    #[must_use]
    pub fn accepts_text(&self, element_text: &str) -> bool {
        let element_text = element_text.trim().to_lowercase();
        match self {
            Self::Css(_) => true,
            Self::Text { text, .. } => element_text == text.trim().to_lowercase(),
            Self::TextContains { text, .. } => element_text.contains(&text.trim().to_lowercase()),
        }
    }

    #[must_use]
    pub fn selector(&self) -> &str {
        match self {
            Self::Css(selector)
            | Self::Text { selector, .. }
            | Self::TextContains { selector, .. } => selector,
        }
    }
}

/// Raw fields of one rendered search hit, as read from the DOM
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderedMessage {
    /// `data-ts` of the timestamp link
    pub ts: Option<String>,
    /// `datetime` attribute of a `<time>` element
    pub datetime: Option<String>,
    pub permalink: Option<String>,
    pub sender: Option<String>,
    pub channel: Option<String>,
    pub body_html: String,
    /// The UI shows a "show more" affordance for this body
    pub truncated: bool,
}

impl RenderedMessage {
    /// Key identifying this message within one rendered list: permalink,
    /// else `data-ts`, else the raw body
    #[must_use]
    pub fn merge_key(&self) -> &str {
        self.permalink
            .as_deref()
            .or(self.ts.as_deref())
            .unwrap_or(&self.body_html)
    }
}

/// Browser operations the harvesting core depends on
///
/// Every method is a suspension point. Implementations must not block
/// indefinitely; callers add their own timeouts on top.
#[allow(async_fn_in_trait)]
pub trait WorkspaceSurface {
    async fn goto(&self, url: &str) -> anyhow::Result<()>;

    /// Current page URL, `"about:blank"` when unknown
    async fn current_url(&self) -> String;

    async fn is_present(&self, selector: &str) -> bool;

    /// Trimmed text of the first element matching `selector`
    async fn read_text(&self, selector: &str) -> Option<String>;

    /// Click the first element accepted by `matcher`
    ///
    /// Returns `Ok(false)` when nothing matches.
    async fn activate(&self, matcher: &ControlMatcher) -> anyhow::Result<bool>;

    /// Focus the element accepted by `matcher`, type `text` and optionally
    /// press Enter. Returns `Ok(false)` when nothing matches.
    async fn type_into(
        &self,
        matcher: &ControlMatcher,
        text: &str,
        submit: bool,
    ) -> anyhow::Result<bool>;

    /// Whether the result list finished rendering (results or an empty state
    /// are shown and no loading indicator is visible)
    async fn results_settled(&self) -> anyhow::Result<bool>;

    /// Page number the pager marks as current, `None` when it shows none
    async fn active_page(&self) -> Option<u32>;

    /// Every message currently rendered in the result list, in display order
    ///
    /// Implementations should expand "show more" bodies while the message is
    /// still rendered; `expand_message` is the fallback for the rest.
    async fn collect_messages(&self) -> anyhow::Result<Vec<RenderedMessage>>;

    /// Trigger the "show more" affordance of message `index` (as returned by
    /// the last `collect_messages`) and read it back
    async fn expand_message(&self, index: usize) -> anyhow::Result<Option<RenderedMessage>>;

    /// Snapshot cookies and local storage
    async fn capture_session(&self) -> anyhow::Result<AuthSession>;

    /// Install a previously captured session before navigation
    async fn restore_session(&self, session: &AuthSession) -> anyhow::Result<()>;
}
