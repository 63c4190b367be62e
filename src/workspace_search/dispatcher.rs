//! Navigation, authentication and query submission

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::controls::{activate_first, is_login_redirect, read_first_text};
use super::selectors::{
    EFFECTIVE_QUERY_SELECTORS, RESULT_COUNT_SELECTORS, SEARCH_INPUT_SELECTORS, SIGNED_IN_MARKER,
    search_input_matchers, search_open_matchers,
};
use super::wait::{WaitOutcome, wait_for_condition, with_timeout};
use super::SearchRequest;
use crate::auth::AuthSessionStore;
use crate::config::HarvestConfig;
use crate::error::{HarvestError, HarvestResult};
use crate::interrupt::CancelFlag;
use crate::surface::WorkspaceSurface;

static RESULT_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d[\d,\.\s]*)").expect("Invalid result count regex"));

/// How the dispatcher obtains a signed-in workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMode {
    /// Try the stored session first, fall back to an interactive login
    ReuseSession,
    /// Ignore any stored session, used after the workspace expired it mid-run
    ForceInteractive,
}

/// What the dispatcher learned while getting the search on screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Query as echoed by the client, which may have rewritten it
    pub effective_query: Option<String>,
    /// Total hit count shown by the client, if it showed one
    pub reported_total: Option<u64>,
    pub interactive_login: bool,
}

pub struct QueryDispatcher<'a, S> {
    surface: &'a S,
    store: &'a AuthSessionStore,
    config: &'a HarvestConfig,
    cancel: CancelFlag,
}

impl<'a, S: WorkspaceSurface> QueryDispatcher<'a, S> {
    pub fn new(
        surface: &'a S,
        store: &'a AuthSessionStore,
        config: &'a HarvestConfig,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            surface,
            store,
            config,
            cancel,
        }
    }

    /// Reach a signed-in workspace and submit the search
    ///
    /// # Errors
    ///
    /// `Navigation` when the workspace cannot be reached or has no search
    /// input, `AuthTimeout` when the interactive login is not completed in
    /// time, `Cancelled` when interrupted while waiting for the login.
    pub async fn dispatch(
        &self,
        request: &SearchRequest,
        mode: LoginMode,
    ) -> HarvestResult<DispatchOutcome> {
        let interactive_login = self.authenticate(request, mode).await?;
        let mut outcome = self.submit_query(request).await?;
        outcome.interactive_login = interactive_login;
        Ok(outcome)
    }

    /// Returns whether an interactive login was needed
    pub async fn authenticate(&self, request: &SearchRequest, mode: LoginMode) -> HarvestResult<bool> {
        let session = match mode {
            LoginMode::ReuseSession => self.store.load().await?,
            LoginMode::ForceInteractive => None,
        };

        let mut restored = false;
        if let Some(session) = &session {
            match self.surface.restore_session(session).await {
                Ok(()) => restored = true,
                Err(e) => warn!("Could not restore stored session: {:#}", e),
            }
        }

        self.navigate(request.workspace_url()).await?;

        if restored {
            match self.wait_signed_in(self.config.signed_in_probe()).await {
                WaitOutcome::Satisfied => {
                    info!("Reused stored session from {}", self.store.path().display());
                    return Ok(false);
                }
                WaitOutcome::Cancelled => return Err(HarvestError::Cancelled),
                WaitOutcome::TimedOut => {
                    warn!("Stored session was rejected by the workspace");
                    self.store.invalidate().await?;
                }
            }
        }

        self.interactive_login().await?;
        Ok(true)
    }

    async fn navigate(&self, url: &str) -> HarvestResult<()> {
        with_timeout(
            self.surface.goto(url),
            self.config.navigation_timeout(),
            "Workspace navigation",
        )
        .await
        .map_err(|e| HarvestError::Navigation(format!("{url}: {e:#}")))?;
        debug!("Navigated to {}", url);
        Ok(())
    }

    async fn interactive_login(&self) -> HarvestResult<()> {
        let waited = self.config.login_timeout();
        info!(
            "Please complete the login in the browser window (waiting up to {}s)",
            waited.as_secs()
        );

        match self.wait_signed_in(waited).await {
            WaitOutcome::Satisfied => {}
            WaitOutcome::TimedOut => return Err(HarvestError::AuthTimeout { waited }),
            WaitOutcome::Cancelled => return Err(HarvestError::Cancelled),
        }

        // Let the client finish writing its own storage before capturing it
        tokio::time::sleep(self.config.login_settle()).await;

        match self.surface.capture_session().await {
            Ok(session) if session.is_empty() => {
                warn!("Login completed but the browser holds no session state to save");
            }
            Ok(session) => {
                if let Err(e) = self.store.save(&session).await {
                    warn!("Login completed but the session could not be saved: {}", e);
                }
            }
            Err(e) => warn!("Login completed but the session could not be captured: {:#}", e),
        }
        info!("Login successful");
        Ok(())
    }

    async fn wait_signed_in(&self, timeout: Duration) -> WaitOutcome {
        let this = self;
        wait_for_condition(
            move || this.is_signed_in(),
            timeout,
            self.config.poll_interval(),
            &self.cancel,
        )
        .await
    }

    async fn is_signed_in(&self) -> bool {
        if self.surface.is_present(SIGNED_IN_MARKER).await {
            return true;
        }
        let url = self.surface.current_url().await;
        url.contains("/client/") && !is_login_redirect(self.surface).await
    }

    async fn submit_query(&self, request: &SearchRequest) -> HarvestResult<DispatchOutcome> {
        match activate_first(self.surface, &search_open_matchers()).await? {
            Some(_) => debug!("Opened search"),
            None => warn!("Search control not found; trying the search input directly"),
        }

        let surface = self.surface;
        let input_ready = wait_for_condition(
            move || async move {
                for selector in SEARCH_INPUT_SELECTORS {
                    if surface.is_present(selector).await {
                        return true;
                    }
                }
                false
            },
            self.config.navigation_timeout(),
            self.config.poll_interval(),
            &self.cancel,
        )
        .await;
        match input_ready {
            WaitOutcome::Satisfied => {}
            WaitOutcome::Cancelled => return Err(HarvestError::Cancelled),
            WaitOutcome::TimedOut => {
                return Err(HarvestError::Navigation(
                    "Search input did not appear".to_string(),
                ));
            }
        }

        let mut submitted = false;
        for matcher in search_input_matchers() {
            if self.surface.type_into(&matcher, request.query(), true).await? {
                submitted = true;
                break;
            }
        }
        if !submitted {
            return Err(HarvestError::Navigation(
                "Search input could not be focused".to_string(),
            ));
        }

        // Autocomplete may rewrite the query; log what actually ran
        let effective_query = read_first_text(self.surface, EFFECTIVE_QUERY_SELECTORS).await;
        match &effective_query {
            Some(effective) if effective != request.query() => info!(
                "Submitted query '{}' (client shows '{}')",
                request.query(),
                effective
            ),
            _ => info!("Submitted query '{}'", request.query()),
        }

        let reported_total = self.read_reported_total().await;
        if let Some(total) = reported_total {
            info!("Workspace reports {} results", total);
        }

        Ok(DispatchOutcome {
            effective_query,
            reported_total,
            interactive_login: false,
        })
    }

    /// Best-effort read of the result counter shown above the list
    async fn read_reported_total(&self) -> Option<u64> {
        let surface = self.surface;
        let outcome = wait_for_condition(
            move || async move {
                for selector in RESULT_COUNT_SELECTORS {
                    if surface.is_present(selector).await {
                        return true;
                    }
                }
                false
            },
            self.config.signed_in_probe(),
            self.config.poll_interval(),
            &self.cancel,
        )
        .await;
        if outcome != WaitOutcome::Satisfied {
            debug!("No result counter shown");
            return None;
        }
        let text = read_first_text(self.surface, RESULT_COUNT_SELECTORS).await?;
        parse_result_count(&text)
    }
}

/// First number in a counter label such as `"1,234 results"`
#[must_use]
pub fn parse_result_count(text: &str) -> Option<u64> {
    let digits: String = RESULT_COUNT
        .captures(text)?
        .get(1)?
        .as_str()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
