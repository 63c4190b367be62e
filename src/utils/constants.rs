//! Shared configuration constants for slack_search_export
//!
//! Default values for the harvesting run. The page cap and the timeouts are
//! imposed by the workspace UI and may drift, so every one of them can be
//! overridden through `HarvestConfig`.

/// Default workspace entry point
///
/// The web client redirects to the sign-in flow when no session is present,
/// and to the last visited workspace otherwise.
pub const DEFAULT_WORKSPACE_URL: &str = "https://app.slack.com/client";

/// Default location of the persisted browser session
pub const DEFAULT_AUTH_FILE: &str = "slack_auth.json";

/// Prefix used for generated output file names
pub const OUTPUT_FILE_PREFIX: &str = "slack_export";

/// Default maximum number of result pages: 100
///
/// Slack search stops serving correct results past page 100 even though the
/// pager keeps rendering numbered controls.
pub const DEFAULT_PAGE_CAP: u32 = 100;

/// Time a single result page may take to finish loading (seconds)
pub const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 120;

/// Time allowed for a human to finish the interactive login (seconds)
pub const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 120;

/// Timeout for `page.goto()` against the workspace (seconds)
pub const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 30;

/// How long to look for the signed-in marker before assuming a login is needed
pub const DEFAULT_SIGNED_IN_PROBE_SECS: u64 = 5;

/// Poll interval for every wait-for-condition loop (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Upper bound on a single "show more" expansion (milliseconds)
pub const DEFAULT_EXPAND_TIMEOUT_MS: u64 = 3_000;

/// Extra attempts made by the sort enforcer after the first one fails
pub const DEFAULT_SORT_RETRIES: u32 = 3;

/// Upper bound accepted for `sort_retries`
pub const MAX_SORT_RETRIES: u32 = 10;

/// Maximum accepted query length in characters
pub const MAX_QUERY_LENGTH: usize = 1_000;

/// Pause after a successful login before the storage state is captured
///
/// The client writes part of its state into local storage only after the
/// first render of the workspace.
pub const LOGIN_SETTLE_MS: u64 = 2_000;

/// Chrome user agent string
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
