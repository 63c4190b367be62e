//! The pagination state machine
//!
//! ```text
//! Init -> Searching -> Sorting -> ExtractingPage(1)
//! ExtractingPage(n) -> NextPage(n) | PartialPage(n) | EndOfResults | AuthExpired | FatalError
//! NextPage(n) -> ExtractingPage(n + 1) | EndOfResults | AuthExpired | FatalError
//! PartialPage | EndOfResults | FatalError -> Terminal
//! AuthExpired -> Init (once, with a forced login) | FatalError
//! ```
//!
//! Exactly one page is in flight at a time. Cancellation is only observed at
//! page boundaries, and every path out goes through `Terminal`, which
//! finalizes the export.
//!
//! After a pager click the client may keep showing the previous page for a
//! while. A page is only extracted once its list differs from the one shown
//! before the click, or the pager confirms the new page number; otherwise it
//! is kept as partial.

use std::time::Instant;
use tracing::{debug, info, trace, warn};

use super::report::{RunReport, StopReason};
use super::run_state::RunState;
use crate::auth::AuthSessionStore;
use crate::config::HarvestConfig;
use crate::error::HarvestError;
use crate::export::ExportSink;
use crate::extract::{HtmdFormatter, MessageExtractor, PageCompleteness, ResultPage, TextFormatter};
use crate::interrupt::CancelFlag;
use crate::surface::{RenderedMessage, WorkspaceSurface};
use crate::workspace_search::selectors::page_control_matchers;
use crate::workspace_search::{
    LoginMode, QueryDispatcher, SearchRequest, SortEnforcer, WaitOutcome, activate_first,
    is_login_redirect, wait_for_condition,
};

#[derive(Debug)]
enum WalkState {
    Init,
    Searching,
    Sorting,
    ExtractingPage(u32),
    NextPage(u32),
    PartialPage(u32),
    EndOfResults(StopReason),
    /// Login redirect seen; traversal should resume at `resume_at`
    AuthExpired { resume_at: u32 },
    FatalError(HarvestError),
    Terminal(StopReason),
}

pub struct PaginationWalker<'a, S, F = HtmdFormatter> {
    surface: &'a S,
    store: &'a AuthSessionStore,
    config: &'a HarvestConfig,
    sink: &'a mut ExportSink,
    extractor: MessageExtractor<F>,
    /// Keys of the list as last collected
    shown: Option<Vec<String>>,
    /// Keys of the list shown before the last pager click
    swap_from: Option<Vec<String>>,
}

impl<'a, S: WorkspaceSurface> PaginationWalker<'a, S, HtmdFormatter> {
    pub fn new(
        surface: &'a S,
        store: &'a AuthSessionStore,
        config: &'a HarvestConfig,
        sink: &'a mut ExportSink,
    ) -> Self {
        let extractor = MessageExtractor::with_default_formatter(config.expand_timeout());
        Self::with_extractor(surface, store, config, sink, extractor)
    }
}

impl<'a, S: WorkspaceSurface, F: TextFormatter> PaginationWalker<'a, S, F> {
    pub fn with_extractor(
        surface: &'a S,
        store: &'a AuthSessionStore,
        config: &'a HarvestConfig,
        sink: &'a mut ExportSink,
        extractor: MessageExtractor<F>,
    ) -> Self {
        Self {
            surface,
            store,
            config,
            sink,
            extractor,
            shown: None,
            swap_from: None,
        }
    }

    /// Drive the run to `Terminal` and report what happened
    ///
    /// Never returns early: fatal conditions end up in the report's stop
    /// reason after the export was finalized.
    pub async fn run(&mut self, request: &SearchRequest, state: &mut RunState) -> RunReport {
        let started = Instant::now();
        let mut login_mode = LoginMode::ReuseSession;
        let mut relogged = false;
        let mut resume_from: Option<u32> = None;
        let mut effective_query = None;
        let mut reported_total = None;
        let mut sort_applied = false;
        let mut pages_visited = 0;

        let mut walk = WalkState::Init;
        let stop_reason = loop {
            debug!("Walker state: {:?}", walk);
            walk = match walk {
                WalkState::Init => WalkState::Searching,

                WalkState::Searching => {
                    let dispatcher = QueryDispatcher::new(
                        self.surface,
                        self.store,
                        self.config,
                        state.cancel_flag().clone(),
                    );
                    match dispatcher.dispatch(request, login_mode).await {
                        Ok(outcome) => {
                            self.shown = None;
                            self.swap_from = None;
                            effective_query = outcome.effective_query.or(effective_query);
                            reported_total = outcome.reported_total.or(reported_total);
                            WalkState::Sorting
                        }
                        Err(HarvestError::Cancelled) => {
                            WalkState::EndOfResults(StopReason::Interrupted)
                        }
                        Err(e) => WalkState::FatalError(e),
                    }
                }

                WalkState::Sorting => {
                    let enforcer = SortEnforcer::new(
                        self.surface,
                        self.config.sort_retries(),
                        self.config.poll_interval(),
                    );
                    match enforcer.enforce().await {
                        Ok(()) => {
                            sort_applied = true;
                            WalkState::ExtractingPage(1)
                        }
                        Err(e) if !e.is_fatal() => {
                            sort_applied = false;
                            warn!("{}; continuing with the default ordering", e);
                            WalkState::ExtractingPage(1)
                        }
                        Err(e) => WalkState::FatalError(e),
                    }
                }

                WalkState::ExtractingPage(n) => {
                    state.set_page(n);
                    pages_visited = pages_visited.max(n);
                    match resume_from {
                        Some(resume) if n < resume => self.fast_forward(n).await,
                        _ => {
                            resume_from = None;
                            self.extract_page(n, state).await
                        }
                    }
                }

                WalkState::NextPage(n) => self.advance(n, state).await,

                WalkState::PartialPage(n) => {
                    warn!("{}; keeping its partial content", HarvestError::PageTimeout { page: n });
                    WalkState::EndOfResults(StopReason::PartialTimeout)
                }

                WalkState::AuthExpired { resume_at } => {
                    if relogged {
                        WalkState::FatalError(HarvestError::AuthExpired)
                    } else {
                        warn!(
                            "Session expired at page {}; logging in again and resuming there",
                            resume_at
                        );
                        relogged = true;
                        login_mode = LoginMode::ForceInteractive;
                        resume_from = Some(resume_at);
                        WalkState::Init
                    }
                }

                WalkState::EndOfResults(reason) => WalkState::Terminal(reason),

                WalkState::FatalError(e) => {
                    warn!("Stopping run: {}", e);
                    WalkState::Terminal(StopReason::Fatal(e.to_string()))
                }

                WalkState::Terminal(reason) => break reason,
            };
        };

        let stop_reason = match self.sink.finalize().await {
            Ok(()) => stop_reason,
            Err(e) => {
                warn!("Failed to finalize export: {}", e);
                match stop_reason {
                    StopReason::Fatal(reason) => StopReason::Fatal(reason),
                    _ => StopReason::Fatal(e.to_string()),
                }
            }
        };

        let report = RunReport {
            pages_visited,
            records_written: state.records_written(),
            stop_reason,
            effective_query,
            reported_total,
            sort_applied,
            output: self.sink.path().to_path_buf(),
            elapsed: started.elapsed(),
        };
        info!(
            pages = report.pages_visited,
            records = report.records_written,
            "Run finished: {}",
            report.stop_reason
        );
        report
    }

    async fn wait_until_settled(&self) -> WaitOutcome {
        let surface = self.surface;
        // In-flight pages are never cut short by an interrupt
        let never = CancelFlag::new();
        wait_for_condition(
            move || async move { surface.results_settled().await.unwrap_or(false) },
            self.config.page_timeout(),
            self.config.poll_interval(),
            &never,
        )
        .await
    }

    /// Wait for page `n` and collect its rendered messages
    ///
    /// `Err` carries the next state when the page cannot be read at all.
    async fn load_page(
        &mut self,
        n: u32,
    ) -> Result<(Vec<RenderedMessage>, PageCompleteness), WalkState> {
        if is_login_redirect(self.surface).await {
            return Err(WalkState::AuthExpired { resume_at: n });
        }

        let started = Instant::now();
        let mut completeness = match self.wait_until_settled().await {
            WaitOutcome::Satisfied => PageCompleteness::Complete,
            _ => {
                if is_login_redirect(self.surface).await {
                    return Err(WalkState::AuthExpired { resume_at: n });
                }
                PageCompleteness::Partial
            }
        };

        let mut messages = self.collect().await?;

        if let Some(previous) = self.swap_from.take() {
            while list_keys(&messages) == previous {
                if started.elapsed() >= self.config.page_timeout() {
                    if self.surface.active_page().await == Some(n) {
                        debug!("Page {} renders the same messages as page {}", n, n - 1);
                    } else {
                        warn!(
                            "Page {} still shows page {} after {:?}",
                            n,
                            n - 1,
                            self.config.page_timeout()
                        );
                        completeness = PageCompleteness::Partial;
                    }
                    break;
                }
                trace!("Page {} not swapped in yet", n);
                tokio::time::sleep(self.config.poll_interval()).await;
                messages = self.collect().await?;
            }
        }

        self.shown = Some(list_keys(&messages));
        Ok((messages, completeness))
    }

    async fn collect(&self) -> Result<Vec<RenderedMessage>, WalkState> {
        self.surface
            .collect_messages()
            .await
            .map_err(|e| WalkState::FatalError(e.into()))
    }

    async fn extract_page(&mut self, n: u32, state: &mut RunState) -> WalkState {
        let (messages, completeness) = match self.load_page(n).await {
            Ok(loaded) => loaded,
            Err(next) => return next,
        };

        let mut page = ResultPage::new(n, messages, completeness);
        let expanded = self.extractor.expand_truncated(self.surface, &mut page).await;
        let records = self.extractor.extract(&page);
        let extracted = records.len();
        let fresh = state.admit(records);

        let written = match self.sink.append(&fresh).await {
            Ok(written) => written,
            Err(e) => return WalkState::FatalError(e),
        };
        state.add_written(written);

        info!(
            page = n,
            rendered = page.messages.len(),
            extracted,
            expanded,
            records = written,
            total = state.records_written(),
            "Processed page {}{}",
            n,
            if page.is_partial() { " (partial)" } else { "" }
        );

        if state.is_cancelled() {
            info!("Interrupt observed after page {}", n);
            return WalkState::EndOfResults(StopReason::Interrupted);
        }
        if page.is_partial() {
            return WalkState::PartialPage(n);
        }
        if written == 0 {
            info!("Page {} produced no new records; treating it as the end", n);
            return WalkState::EndOfResults(StopReason::EndOfResults);
        }
        if n >= self.config.page_cap() {
            info!("Reached the page cap of {}", self.config.page_cap());
            return WalkState::EndOfResults(StopReason::PageCap);
        }
        WalkState::NextPage(n)
    }

    /// Pass over a page already exported before a re-login
    async fn fast_forward(&mut self, n: u32) -> WalkState {
        match self.load_page(n).await {
            Ok((_, PageCompleteness::Complete)) => {
                debug!("Skipping already exported page {}", n);
                WalkState::NextPage(n)
            }
            Ok((_, PageCompleteness::Partial)) => WalkState::PartialPage(n),
            Err(next) => next,
        }
    }

    async fn advance(&mut self, n: u32, state: &RunState) -> WalkState {
        if state.is_cancelled() {
            return WalkState::EndOfResults(StopReason::Interrupted);
        }
        if is_login_redirect(self.surface).await {
            return WalkState::AuthExpired { resume_at: n + 1 };
        }

        match activate_first(self.surface, &page_control_matchers(n + 1)).await {
            Ok(Some(_)) => {
                debug!("Moving to page {}", n + 1);
                self.swap_from = self.shown.take();
                WalkState::ExtractingPage(n + 1)
            }
            Ok(None) => {
                info!("No control for page {}; end of results", n + 1);
                WalkState::EndOfResults(StopReason::EndOfResults)
            }
            Err(e) => WalkState::FatalError(e.into()),
        }
    }
}

fn list_keys(messages: &[RenderedMessage]) -> Vec<String> {
    messages
        .iter()
        .map(|message| message.merge_key().to_string())
        .collect()
}
