//! Test utilities for the slack_search_export test suite
//!
//! `FakeSurface` is a scripted, in-memory workspace: a list of result pages,
//! a pager, a sort menu, a login flow and optional session expiry.

#![allow(dead_code)]

use anyhow::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use slack_search_export::auth::{AuthSession, StoredCookie};
use slack_search_export::export::ExportFormat;
use slack_search_export::interrupt::CancelFlag;
use slack_search_export::surface::{ControlMatcher, RenderedMessage, WorkspaceSurface};
use slack_search_export::workspace_search::selectors::{
    EFFECTIVE_QUERY_SELECTORS, RESULT_COUNT_SELECTORS, SEARCH_INPUT_SELECTORS, SIGNED_IN_MARKER,
    SORT_LABEL_SELECTORS,
};
use slack_search_export::HarvestConfig;

pub const SIGNIN_URL: &str = "https://acme.slack.com/signin";
pub const CLIENT_URL: &str = "https://app.slack.com/client/T0ACME/C0GENERAL";

/// Base timestamp of generated messages (2024-01-01T10:00:00Z)
pub const BASE_TS: i64 = 1_704_103_200;

/// Rendered message number `n`, one minute after message `n - 1`
pub fn message(n: usize) -> RenderedMessage {
    let secs = BASE_TS + n as i64 * 60;
    RenderedMessage {
        ts: Some(format!("{secs}.000100")),
        datetime: None,
        permalink: Some(format!(
            "https://acme.slack.com/archives/C0GENERAL/p{secs}000100"
        )),
        sender: Some(format!("user{}", n % 3)),
        channel: Some("general".to_string()),
        body_html: format!("<p>message <b>{n}</b></p>"),
        truncated: false,
    }
}

#[derive(Debug, Clone)]
pub struct FakePage {
    pub messages: Vec<RenderedMessage>,
    /// Whether the page ever finishes loading
    pub settles: bool,
}

impl FakePage {
    pub fn new(messages: Vec<RenderedMessage>) -> Self {
        Self {
            messages,
            settles: true,
        }
    }

    pub fn stalled(messages: Vec<RenderedMessage>) -> Self {
        Self {
            messages,
            settles: false,
        }
    }
}

/// Consecutive pages holding `sizes[i]` sequentially numbered messages
pub fn pages_of(sizes: &[usize]) -> Vec<FakePage> {
    let mut next = 0;
    sizes
        .iter()
        .map(|&size| {
            let messages = (next..next + size).map(message).collect();
            next += size;
            FakePage::new(messages)
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub pages: Vec<FakePage>,
    pub url: String,
    pub signed_in: bool,
    pub session_restored: bool,
    pub session_accepted: bool,
    /// Signed-in checks before the human finishes logging in; `None` = never
    pub human_login_after: Option<u32>,
    pub login_polls: u32,
    pub unreachable: bool,
    pub search_open: bool,
    /// 1-based; 0 before the query was submitted
    pub current_page: usize,
    pub sort_control_present: bool,
    pub sort_menu_open: bool,
    pub sort_label: String,
    pub result_count: Option<String>,
    pub effective_query: Option<String>,
    /// Pages whose pager click lands on the sign-in page, consumed in order
    pub expire_on_pages: Vec<usize>,
    pub cancel_on_page: Option<(usize, CancelFlag)>,
    /// Reads that still show the previous page after each pager click
    pub stale_reads_after_click: u32,
    pub stale_remaining: u32,
    pub stale_from: usize,
    /// (page, index) -> expanded message
    pub expansions: HashMap<(usize, usize), RenderedMessage>,
    pub typed_queries: Vec<String>,
    pub clicks: Vec<String>,
    pub captures: u32,
    pub logins: u32,
}

pub struct FakeSurface {
    pub state: Mutex<FakeState>,
}

impl FakeSurface {
    /// A workspace with a working sort menu and a human who logs in promptly
    pub fn new(pages: Vec<FakePage>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                pages,
                url: "about:blank".to_string(),
                session_accepted: true,
                human_login_after: Some(2),
                sort_control_present: true,
                sort_label: "Most relevant".to_string(),
                ..FakeState::default()
            }),
        }
    }

    pub fn with_human_login_after(mut self, polls: Option<u32>) -> Self {
        self.state.get_mut().human_login_after = polls;
        self
    }

    pub fn rejecting_sessions(mut self) -> Self {
        self.state.get_mut().session_accepted = false;
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.state.get_mut().unreachable = true;
        self
    }

    pub fn without_sort_control(mut self) -> Self {
        self.state.get_mut().sort_control_present = false;
        self
    }

    pub fn sorted_oldest(mut self) -> Self {
        self.state.get_mut().sort_label = "Oldest".to_string();
        self
    }

    pub fn with_result_count(mut self, text: &str) -> Self {
        self.state.get_mut().result_count = Some(text.to_string());
        self
    }

    pub fn with_effective_query(mut self, text: &str) -> Self {
        self.state.get_mut().effective_query = Some(text.to_string());
        self
    }

    pub fn expiring_on(mut self, pages: &[usize]) -> Self {
        self.state.get_mut().expire_on_pages = pages.to_vec();
        self
    }

    pub fn cancelling_on(mut self, page: usize, flag: CancelFlag) -> Self {
        self.state.get_mut().cancel_on_page = Some((page, flag));
        self
    }

    /// After each pager click, the next `reads` collections (and the pager)
    /// still show the previous page
    pub fn lagging_after_click(mut self, reads: u32) -> Self {
        self.state.get_mut().stale_reads_after_click = reads;
        self
    }

    pub fn with_expansion(mut self, page: usize, index: usize, full: RenderedMessage) -> Self {
        self.state.get_mut().expansions.insert((page, index), full);
        self
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().clicks.clone()
    }

    pub fn typed_queries(&self) -> Vec<String> {
        self.state.lock().typed_queries.clone()
    }

    pub fn captures(&self) -> u32 {
        self.state.lock().captures
    }

    pub fn logins(&self) -> u32 {
        self.state.lock().logins
    }

    fn go_to_page(state: &mut FakeState, page: usize) -> bool {
        if page != state.current_page + 1 || page > state.pages.len() {
            return false;
        }
        if let Some(pos) = state.expire_on_pages.iter().position(|&p| p == page) {
            state.expire_on_pages.remove(pos);
            state.signed_in = false;
            state.session_restored = false;
            state.search_open = false;
            state.current_page = 0;
            state.url = SIGNIN_URL.to_string();
            return true;
        }
        state.stale_from = state.current_page;
        state.stale_remaining = state.stale_reads_after_click;
        state.current_page = page;
        true
    }
}

fn page_number(matcher: &ControlMatcher) -> Option<usize> {
    match matcher {
        ControlMatcher::Css(selector) => selector
            .strip_prefix(r#"[aria-label="Page "#)
            .and_then(|rest| rest.strip_suffix(r#""]"#))
            .and_then(|n| n.parse().ok()),
        _ => None,
    }
}

impl WorkspaceSurface for FakeSurface {
    async fn goto(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.unreachable {
            anyhow::bail!("net::ERR_NAME_NOT_RESOLVED at {url}");
        }
        state.search_open = false;
        state.current_page = 0;
        state.sort_menu_open = false;
        if state.session_restored && state.session_accepted {
            state.signed_in = true;
        }
        state.url = if state.signed_in {
            CLIENT_URL.to_string()
        } else {
            SIGNIN_URL.to_string()
        };
        Ok(())
    }

    async fn current_url(&self) -> String {
        self.state.lock().url.clone()
    }

    async fn is_present(&self, selector: &str) -> bool {
        let mut state = self.state.lock();
        if selector == SIGNED_IN_MARKER {
            if !state.signed_in
                && let Some(after) = state.human_login_after
            {
                state.login_polls += 1;
                if state.login_polls >= after {
                    state.signed_in = true;
                    state.login_polls = 0;
                    state.logins += 1;
                    state.url = CLIENT_URL.to_string();
                }
            }
            return state.signed_in;
        }
        if selector == SEARCH_INPUT_SELECTORS[0] {
            return state.signed_in && state.search_open;
        }
        if RESULT_COUNT_SELECTORS.contains(&selector) {
            return state.current_page > 0 && state.result_count.is_some();
        }
        false
    }

    async fn read_text(&self, selector: &str) -> Option<String> {
        let state = self.state.lock();
        if selector == SORT_LABEL_SELECTORS[0] && state.sort_control_present {
            return Some(state.sort_label.clone());
        }
        if selector == RESULT_COUNT_SELECTORS[1] && state.current_page > 0 {
            return state.result_count.clone();
        }
        if selector == EFFECTIVE_QUERY_SELECTORS[0] && state.current_page > 0 {
            return state
                .effective_query
                .clone()
                .or_else(|| state.typed_queries.last().cloned());
        }
        None
    }

    async fn activate(&self, matcher: &ControlMatcher) -> Result<bool> {
        let mut state = self.state.lock();
        if !state.signed_in {
            return Ok(false);
        }
        let selector = matcher.selector().to_string();
        let activated = if selector == SIGNED_IN_MARKER {
            state.search_open = true;
            true
        } else if selector == r#"[data-qa="search_sort_button"]"# {
            if state.sort_control_present && state.current_page > 0 {
                state.sort_menu_open = true;
            }
            state.sort_menu_open
        } else if selector.contains("menuitem") || selector == r#"[data-qa="search_sort_oldest"]"# {
            if state.sort_menu_open && matcher.accepts_text("Oldest") {
                state.sort_menu_open = false;
                state.sort_label = "Oldest".to_string();
                true
            } else {
                false
            }
        } else if let Some(page) = page_number(matcher) {
            Self::go_to_page(&mut state, page)
        } else {
            false
        };
        if activated {
            state.clicks.push(selector);
        }
        Ok(activated)
    }

    async fn type_into(&self, matcher: &ControlMatcher, text: &str, submit: bool) -> Result<bool> {
        let mut state = self.state.lock();
        if !(state.signed_in && state.search_open && matcher.selector() == SEARCH_INPUT_SELECTORS[0])
        {
            return Ok(false);
        }
        state.typed_queries.push(text.to_string());
        if submit {
            state.current_page = 1;
        }
        Ok(true)
    }

    async fn results_settled(&self) -> Result<bool> {
        let state = self.state.lock();
        if state.current_page == 0 {
            return Ok(false);
        }
        Ok(state
            .pages
            .get(state.current_page - 1)
            .is_none_or(|page| page.settles))
    }

    async fn active_page(&self) -> Option<u32> {
        let state = self.state.lock();
        let shown = if state.stale_remaining > 0 {
            state.stale_from
        } else {
            state.current_page
        };
        (shown > 0).then_some(shown as u32)
    }

    async fn collect_messages(&self) -> Result<Vec<RenderedMessage>> {
        let mut state = self.state.lock();
        if state.stale_remaining > 0 && state.stale_from > 0 {
            state.stale_remaining -= 1;
            return Ok(state.pages[state.stale_from - 1].messages.clone());
        }
        if let Some((page, flag)) = &state.cancel_on_page
            && *page == state.current_page
        {
            flag.cancel();
        }
        Ok(state
            .pages
            .get(state.current_page.saturating_sub(1))
            .filter(|_| state.current_page > 0)
            .map(|page| page.messages.clone())
            .unwrap_or_default())
    }

    async fn expand_message(&self, index: usize) -> Result<Option<RenderedMessage>> {
        let state = self.state.lock();
        Ok(state.expansions.get(&(state.current_page, index)).cloned())
    }

    async fn capture_session(&self) -> Result<AuthSession> {
        let mut state = self.state.lock();
        state.captures += 1;
        Ok(AuthSession::new(
            vec![StoredCookie {
                name: "d".to_string(),
                value: format!("xoxd-{}", state.captures),
                domain: ".slack.com".to_string(),
                path: "/".to_string(),
                expires: Some(1_900_000_000.0),
                http_only: true,
                secure: true,
                same_site: Some("Lax".to_string()),
            }],
            Vec::new(),
        ))
    }

    async fn restore_session(&self, _session: &AuthSession) -> Result<()> {
        self.state.lock().session_restored = true;
        Ok(())
    }
}

/// Configuration with timeouts short enough for tests
pub fn test_config(dir: &Path, format: ExportFormat) -> HarvestConfig {
    test_config_builder(dir, format)
        .build()
        .expect("test config should be valid")
}

pub fn test_config_builder(
    dir: &Path,
    format: ExportFormat,
) -> slack_search_export::config::HarvestConfigBuilder<slack_search_export::config::WithQuery> {
    HarvestConfig::builder()
        .query("from:@alice after:2024-01-01")
        .format(format)
        .output_path(Some(dir.join(format!("export.{}", format.extension()))))
        .auth_file(dir.join("auth.json"))
        .page_timeout(Duration::from_millis(200))
        .login_timeout(Duration::from_secs(2))
        .navigation_timeout(Duration::from_secs(1))
        .signed_in_probe(Duration::from_millis(20))
        .poll_interval(Duration::from_millis(2))
        .expand_timeout(Duration::from_millis(100))
        .login_settle(Duration::from_millis(5))
        .sort_retries(1)
}
