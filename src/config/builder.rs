//! Type-safe builder for `HarvestConfig` using the typestate pattern
//!
//! The query is the only required field; `build()` only exists once it has
//! been set.

use chrono::Local;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use super::types::HarvestConfig;
use crate::error::{HarvestError, HarvestResult};
use crate::export::ExportFormat;
use crate::utils::{
    DEFAULT_AUTH_FILE, DEFAULT_EXPAND_TIMEOUT_MS, DEFAULT_LOGIN_TIMEOUT_SECS,
    DEFAULT_NAVIGATION_TIMEOUT_SECS, DEFAULT_PAGE_CAP, DEFAULT_PAGE_TIMEOUT_SECS,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_SIGNED_IN_PROBE_SECS, DEFAULT_SORT_RETRIES,
    DEFAULT_WORKSPACE_URL, LOGIN_SETTLE_MS, MAX_QUERY_LENGTH, MAX_SORT_RETRIES,
    OUTPUT_FILE_PREFIX,
};

// Type states for the builder
pub struct WithQuery;

pub struct HarvestConfigBuilder<State = ()> {
    pub(crate) query: Option<String>,
    pub(crate) workspace_url: String,
    pub(crate) format: ExportFormat,
    pub(crate) output_path: Option<PathBuf>,
    pub(crate) auth_file: PathBuf,
    pub(crate) page_cap: u32,
    pub(crate) page_timeout: Duration,
    pub(crate) login_timeout: Duration,
    pub(crate) navigation_timeout: Duration,
    pub(crate) signed_in_probe: Duration,
    pub(crate) poll_interval: Duration,
    pub(crate) expand_timeout: Duration,
    pub(crate) login_settle: Duration,
    pub(crate) sort_retries: u32,
    pub(crate) headless: bool,
    pub(crate) verbose: bool,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for HarvestConfigBuilder<()> {
    fn default() -> Self {
        Self {
            query: None,
            workspace_url: DEFAULT_WORKSPACE_URL.to_string(),
            format: ExportFormat::Text,
            output_path: None,
            auth_file: PathBuf::from(DEFAULT_AUTH_FILE),
            page_cap: DEFAULT_PAGE_CAP,
            page_timeout: Duration::from_secs(DEFAULT_PAGE_TIMEOUT_SECS),
            login_timeout: Duration::from_secs(DEFAULT_LOGIN_TIMEOUT_SECS),
            navigation_timeout: Duration::from_secs(DEFAULT_NAVIGATION_TIMEOUT_SECS),
            signed_in_probe: Duration::from_secs(DEFAULT_SIGNED_IN_PROBE_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            expand_timeout: Duration::from_millis(DEFAULT_EXPAND_TIMEOUT_MS),
            login_settle: Duration::from_millis(LOGIN_SETTLE_MS),
            sort_retries: DEFAULT_SORT_RETRIES,
            headless: false,
            verbose: false,
            _phantom: PhantomData,
        }
    }
}

impl HarvestConfig {
    /// Create a builder for configuring a `HarvestConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> HarvestConfigBuilder<()> {
        HarvestConfigBuilder::default()
    }
}

impl HarvestConfigBuilder<()> {
    pub fn query(self, query: impl Into<String>) -> HarvestConfigBuilder<WithQuery> {
        HarvestConfigBuilder {
            query: Some(query.into()),
            workspace_url: self.workspace_url,
            format: self.format,
            output_path: self.output_path,
            auth_file: self.auth_file,
            page_cap: self.page_cap,
            page_timeout: self.page_timeout,
            login_timeout: self.login_timeout,
            navigation_timeout: self.navigation_timeout,
            signed_in_probe: self.signed_in_probe,
            poll_interval: self.poll_interval,
            expand_timeout: self.expand_timeout,
            login_settle: self.login_settle,
            sort_retries: self.sort_retries,
            headless: self.headless,
            verbose: self.verbose,
            _phantom: PhantomData,
        }
    }
}

impl<State> HarvestConfigBuilder<State> {
    #[must_use]
    pub fn workspace_url(mut self, url: impl Into<String>) -> Self {
        self.workspace_url = url.into();
        self
    }

    #[must_use]
    pub fn format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    /// `None` keeps the generated timestamped file name
    #[must_use]
    pub fn output_path(mut self, path: Option<PathBuf>) -> Self {
        self.output_path = path;
        self
    }

    #[must_use]
    pub fn auth_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.auth_file = path.into();
        self
    }

    #[must_use]
    pub fn page_cap(mut self, cap: u32) -> Self {
        self.page_cap = cap;
        self
    }

    #[must_use]
    pub fn page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    #[must_use]
    pub fn login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    #[must_use]
    pub fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    #[must_use]
    pub fn signed_in_probe(mut self, timeout: Duration) -> Self {
        self.signed_in_probe = timeout;
        self
    }

    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn expand_timeout(mut self, timeout: Duration) -> Self {
        self.expand_timeout = timeout;
        self
    }

    #[must_use]
    pub fn login_settle(mut self, pause: Duration) -> Self {
        self.login_settle = pause;
        self
    }

    #[must_use]
    pub fn sort_retries(mut self, retries: u32) -> Self {
        self.sort_retries = retries;
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl HarvestConfigBuilder<WithQuery> {
    /// Validate and build the configuration
    ///
    /// # Errors
    ///
    /// Returns `HarvestError::Config` when the query is empty or too long, the
    /// workspace URL is not an http(s) URL, the page cap or a timeout is zero,
    /// or more than `MAX_SORT_RETRIES` sort retries are requested.
    pub fn build(self) -> HarvestResult<HarvestConfig> {
        let query = self
            .query
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        if query.is_empty() {
            return Err(HarvestError::Config(
                "Search query cannot be empty or whitespace-only".to_string(),
            ));
        }

        let query_chars = query.chars().count();
        if query_chars > MAX_QUERY_LENGTH {
            return Err(HarvestError::Config(format!(
                "Search query is too long ({query_chars} characters). Maximum allowed: {MAX_QUERY_LENGTH}"
            )));
        }

        let url = Url::parse(&self.workspace_url).map_err(|e| {
            HarvestError::Config(format!("Invalid workspace URL '{}': {e}", self.workspace_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(HarvestError::Config(format!(
                "Workspace URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.page_cap == 0 {
            return Err(HarvestError::Config("Page cap must be at least 1".to_string()));
        }

        if self.sort_retries > MAX_SORT_RETRIES {
            return Err(HarvestError::Config(format!(
                "Sort retries must be at most {MAX_SORT_RETRIES}, got {}",
                self.sort_retries
            )));
        }

        for (name, value) in [
            ("page timeout", self.page_timeout),
            ("login timeout", self.login_timeout),
            ("navigation timeout", self.navigation_timeout),
            ("poll interval", self.poll_interval),
        ] {
            if value.is_zero() {
                return Err(HarvestError::Config(format!("{name} must be greater than zero")));
            }
        }

        let output_path = self
            .output_path
            .unwrap_or_else(|| default_output_path(self.format));

        Ok(HarvestConfig {
            query,
            workspace_url: self.workspace_url,
            format: self.format,
            output_path,
            auth_file: self.auth_file,
            page_cap: self.page_cap,
            page_timeout: self.page_timeout,
            login_timeout: self.login_timeout,
            navigation_timeout: self.navigation_timeout,
            signed_in_probe: self.signed_in_probe,
            poll_interval: self.poll_interval,
            expand_timeout: self.expand_timeout,
            login_settle: self.login_settle,
            sort_retries: self.sort_retries,
            headless: self.headless,
            verbose: self.verbose,
        })
    }
}

/// `slack_export_<YYYYmmdd_HHMMSS>.<ext>` in the working directory
#[must_use]
pub fn default_output_path(format: ExportFormat) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("{OUTPUT_FILE_PREFIX}_{stamp}.{}", format.extension()))
}
