//! `WorkspaceSurface` backed by a chromiumoxide page

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::network::{
    Cookie, CookieParam, CookieSameSite, TimeSinceEpoch,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::js_scripts::{
    ACTIVE_PAGE_SCRIPT, CAPTURE_LOCAL_STORAGE_SCRIPT, RESULTS_SETTLED_SCRIPT, SCROLL_STEP_SCRIPT,
    SCROLL_TO_TOP_SCRIPT, collect_messages_script, expand_message_script,
    message_present_script, read_message_script, restore_local_storage_script,
};
use super::{ControlMatcher, RenderedMessage, WorkspaceSurface};
use crate::auth::{AuthSession, OriginStorage, StoredCookie};

/// Upper bound on scroll steps while scanning one result page
const MAX_SCROLL_STEPS: usize = 200;

/// Pause after each scroll step so the virtualised list can render
const SCROLL_SETTLE: Duration = Duration::from_millis(100);

/// Re-reads after clicking "show more" before giving up on the expansion
const EXPAND_POLLS: usize = 10;
const EXPAND_POLL_INTERVAL: Duration = Duration::from_millis(150);

pub struct ChromiumSurface {
    page: Page,
    /// Messages from the last `collect_messages`, so `expand_message` can map
    /// an index back to a DOM element after the list was re-rendered
    last_collected: Mutex<Vec<RenderedMessage>>,
}

impl ChromiumSurface {
    #[must_use]
    pub fn new(page: Page) -> Self {
        Self {
            page,
            last_collected: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// First enabled element accepted by `matcher`
    async fn find_control(&self, matcher: &ControlMatcher) -> Result<Option<Element>> {
        let elements = match self.page.find_elements(matcher.selector()).await {
            Ok(elements) => elements,
            Err(e) => {
                trace!("No elements for '{}': {}", matcher.selector(), e);
                return Ok(None);
            }
        };

        for element in elements {
            if is_disabled(&element).await {
                continue;
            }
            if !matches!(matcher, ControlMatcher::Css(_)) {
                let text = element.inner_text().await.ok().flatten().unwrap_or_default();
                if !matcher.accepts_text(&text) {
                    continue;
                }
            }
            return Ok(Some(element));
        }
        Ok(None)
    }

    async fn evaluate_bool(&self, script: &str) -> Result<bool> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("Failed to evaluate script")?;
        Ok(result.into_value::<bool>().unwrap_or(false))
    }

    async fn snapshot_messages(&self) -> Result<Vec<RenderedMessage>> {
        let result = self
            .page
            .evaluate(collect_messages_script())
            .await
            .context("Failed to execute message collection script")?;
        let value: serde_json::Value = result
            .into_value()
            .map_err(|e| anyhow::anyhow!("Failed to get message collection value: {e}"))?;
        serde_json::from_value(value).context("Failed to parse rendered messages")
    }

    /// Click "show more" on a message that is currently rendered and read it
    /// back once the body is no longer truncated
    async fn expand_in_place(&self, target: &RenderedMessage) -> Result<Option<RenderedMessage>> {
        let ts = target.ts.as_deref();
        let permalink = target.permalink.as_deref();

        if !self.evaluate_bool(&expand_message_script(ts, permalink)).await? {
            return Ok(None);
        }

        for _ in 0..EXPAND_POLLS {
            tokio::time::sleep(EXPAND_POLL_INTERVAL).await;
            let result = self
                .page
                .evaluate(read_message_script(ts, permalink))
                .await
                .context("Failed to re-read expanded message")?;
            let value: serde_json::Value = result.into_value().unwrap_or(serde_json::Value::Null);
            if value.is_null() {
                return Ok(None);
            }
            let message: RenderedMessage =
                serde_json::from_value(value).context("Failed to parse expanded message")?;
            if !message.truncated {
                return Ok(Some(message));
            }
        }
        Ok(None)
    }

    /// Scroll the result list until `target` is rendered again
    async fn scroll_to_message(&self, target: &RenderedMessage) -> Result<bool> {
        let script = message_present_script(target.ts.as_deref(), target.permalink.as_deref());
        if self.evaluate_bool(&script).await? {
            return Ok(true);
        }
        self.page
            .evaluate(SCROLL_TO_TOP_SCRIPT)
            .await
            .context("Failed to reset result list scroll")?;
        for _ in 0..MAX_SCROLL_STEPS {
            if self.evaluate_bool(&script).await? {
                return Ok(true);
            }
            if !self.evaluate_bool(SCROLL_STEP_SCRIPT).await.unwrap_or(false) {
                break;
            }
            tokio::time::sleep(SCROLL_SETTLE).await;
        }
        Ok(false)
    }
}

async fn is_disabled(element: &Element) -> bool {
    if let Ok(Some(_)) = element.attribute("disabled").await {
        return true;
    }
    matches!(
        element.attribute("aria-disabled").await,
        Ok(Some(value)) if value.eq_ignore_ascii_case("true")
    )
}

/// Merge one scroll snapshot into the messages collected so far
///
/// New messages are appended in display order. A message seen again without
/// its "show more" affordance replaces a truncated copy. Returns the indices
/// (into `merged`) of newly added messages that are still truncated.
fn merge_snapshot(
    merged: &mut Vec<RenderedMessage>,
    positions: &mut HashMap<String, usize>,
    snapshot: Vec<RenderedMessage>,
) -> Vec<usize> {
    let mut truncated = Vec::new();
    for message in snapshot {
        match positions.get(message.merge_key()) {
            Some(&index) => {
                if merged[index].truncated && !message.truncated {
                    merged[index] = message;
                }
            }
            None => {
                let index = merged.len();
                positions.insert(message.merge_key().to_string(), index);
                if message.truncated {
                    truncated.push(index);
                }
                merged.push(message);
            }
        }
    }
    truncated
}

impl WorkspaceSurface for ChromiumSurface {
    async fn goto(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .with_context(|| format!("Failed to navigate to {url}"))?;
        Ok(())
    }

    async fn current_url(&self) -> String {
        match self.page.url().await {
            Ok(Some(url)) => url,
            Ok(None) => "about:blank".to_string(),
            Err(e) => {
                trace!("Failed to get page URL (browser communication error): {}", e);
                "about:blank".to_string()
            }
        }
    }

    async fn is_present(&self, selector: &str) -> bool {
        self.page.find_element(selector).await.is_ok()
    }

    async fn read_text(&self, selector: &str) -> Option<String> {
        let element = self.page.find_element(selector).await.ok()?;
        element
            .inner_text()
            .await
            .ok()
            .flatten()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    }

    async fn activate(&self, matcher: &ControlMatcher) -> Result<bool> {
        let Some(element) = self.find_control(matcher).await? else {
            return Ok(false);
        };
        element
            .click()
            .await
            .with_context(|| format!("Failed to click control '{}'", matcher.selector()))?;
        Ok(true)
    }

    async fn type_into(&self, matcher: &ControlMatcher, text: &str, submit: bool) -> Result<bool> {
        let Some(element) = self.find_control(matcher).await? else {
            return Ok(false);
        };
        element
            .click()
            .await
            .with_context(|| format!("Failed to focus '{}'", matcher.selector()))?;
        element
            .type_str(text)
            .await
            .context("Failed to type search query")?;
        if submit {
            element
                .press_key("Enter")
                .await
                .context("Failed to submit search query")?;
        }
        Ok(true)
    }

    async fn results_settled(&self) -> Result<bool> {
        self.evaluate_bool(RESULTS_SETTLED_SCRIPT).await
    }

    async fn active_page(&self) -> Option<u32> {
        match self.page.evaluate(ACTIVE_PAGE_SCRIPT).await {
            Ok(result) => result.into_value::<Option<u32>>().ok().flatten(),
            Err(e) => {
                trace!("Failed to read active page: {}", e);
                None
            }
        }
    }

    async fn collect_messages(&self) -> Result<Vec<RenderedMessage>> {
        // The result list is virtualised: scan while scrolling, merge in
        // first-seen order and expand truncated bodies while they are rendered.
        if let Err(e) = self.page.evaluate(SCROLL_TO_TOP_SCRIPT).await {
            debug!("Could not reset result list scroll: {}", e);
        }

        let mut positions = HashMap::new();
        let mut merged = Vec::new();
        let mut expanded = 0;
        for step in 0..MAX_SCROLL_STEPS {
            let snapshot = self.snapshot_messages().await?;
            for index in merge_snapshot(&mut merged, &mut positions, snapshot) {
                match self.expand_in_place(&merged[index]).await {
                    Ok(Some(full)) => {
                        merged[index] = full;
                        expanded += 1;
                    }
                    Ok(None) => trace!("Message {} could not be expanded during scan", index),
                    Err(e) => debug!("Expanding message {} failed: {:#}", index, e),
                }
            }
            if !self.evaluate_bool(SCROLL_STEP_SCRIPT).await.unwrap_or(false) {
                trace!("Result list fully scanned after {} scroll steps", step);
                break;
            }
            tokio::time::sleep(SCROLL_SETTLE).await;
        }

        debug!(
            "Collected {} rendered messages ({} expanded while scanning)",
            merged.len(),
            expanded
        );
        *self.last_collected.lock() = merged.clone();
        Ok(merged)
    }

    async fn expand_message(&self, index: usize) -> Result<Option<RenderedMessage>> {
        let Some(target) = self.last_collected.lock().get(index).cloned() else {
            return Ok(None);
        };
        // The scan ends at the bottom of the list, where earlier messages are
        // no longer rendered
        if !self.scroll_to_message(&target).await? {
            debug!("Message {} is no longer rendered; cannot expand it", index);
            return Ok(None);
        }
        self.expand_in_place(&target).await
    }

    async fn capture_session(&self) -> Result<AuthSession> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .context("Failed to read browser cookies")?
            .into_iter()
            .map(stored_cookie)
            .collect();

        let origins = match self.page.evaluate(CAPTURE_LOCAL_STORAGE_SCRIPT).await {
            Ok(result) => result
                .into_value::<OriginStorage>()
                .map(|origin| vec![origin])
                .unwrap_or_default(),
            Err(e) => {
                warn!("Could not capture local storage: {}", e);
                Vec::new()
            }
        };

        Ok(AuthSession::new(cookies, origins))
    }

    async fn restore_session(&self, session: &AuthSession) -> Result<()> {
        let params: Vec<CookieParam> = session
            .cookies
            .iter()
            .filter_map(|cookie| match cookie_param(cookie) {
                Ok(param) => Some(param),
                Err(e) => {
                    warn!("Skipping stored cookie '{}': {}", cookie.name, e);
                    None
                }
            })
            .collect();

        if !params.is_empty() {
            self.page
                .set_cookies(params)
                .await
                .context("Failed to install stored cookies")?;
        }

        if !session.origins.is_empty() {
            let origins_json = serde_json::to_string(&session.origins)
                .context("Failed to serialize stored local storage")?;
            self.page
                .execute(AddScriptToEvaluateOnNewDocumentParams {
                    source: restore_local_storage_script(&origins_json),
                    include_command_line_api: None,
                    world_name: None,
                    run_immediately: None,
                })
                .await
                .context("Failed to install local storage seed script")?;
        }

        debug!("Restored session with {} cookies", session.cookies.len());
        Ok(())
    }
}

fn stored_cookie(cookie: Cookie) -> StoredCookie {
    let same_site = cookie
        .same_site
        .as_ref()
        .and_then(|s| serde_json::to_value(s).ok())
        .and_then(|v| v.as_str().map(str::to_string));
    StoredCookie {
        expires: (!cookie.session && cookie.expires > 0.0).then_some(cookie.expires),
        name: cookie.name,
        value: cookie.value,
        domain: cookie.domain,
        path: cookie.path,
        http_only: cookie.http_only,
        secure: cookie.secure,
        same_site,
    }
}

fn cookie_param(cookie: &StoredCookie) -> Result<CookieParam> {
    let mut builder = CookieParam::builder()
        .name(cookie.name.clone())
        .value(cookie.value.clone())
        .domain(cookie.domain.clone())
        .path(cookie.path.clone())
        .secure(cookie.secure)
        .http_only(cookie.http_only);

    if let Some(expires) = cookie.expires {
        builder = builder.expires(TimeSinceEpoch::new(expires));
    }
    if let Some(same_site) = &cookie.same_site
        && let Ok(same_site) =
            serde_json::from_value::<CookieSameSite>(serde_json::Value::String(same_site.clone()))
    {
        builder = builder.same_site(same_site);
    }

    builder.build().map_err(anyhow::Error::msg)
}
