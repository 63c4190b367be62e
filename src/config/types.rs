//! Core configuration type for a harvesting run

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::export::ExportFormat;

/// Main configuration struct for a harvesting run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Raw query text, trimmed. Never empty.
    pub(crate) query: String,
    pub(crate) workspace_url: String,
    pub(crate) format: ExportFormat,

    /// Destination of the export.
    ///
    /// Defaults to `slack_export_<timestamp>.<ext>` in the working directory,
    /// resolved when the config is built.
    pub(crate) output_path: PathBuf,
    pub(crate) auth_file: PathBuf,

    /// Highest page number the walker will visit
    ///
    /// Default: 100
    pub(crate) page_cap: u32,

    /// Time a result page may take to settle before it is treated as partial
    ///
    /// Default: 120 seconds
    pub(crate) page_timeout: Duration,

    /// Time allowed for the human to complete an interactive login
    ///
    /// Default: 120 seconds
    pub(crate) login_timeout: Duration,

    /// Timeout for navigating to the workspace
    ///
    /// Default: 30 seconds
    pub(crate) navigation_timeout: Duration,

    /// How long to look for the signed-in marker after navigation
    ///
    /// Default: 5 seconds
    pub(crate) signed_in_probe: Duration,

    pub(crate) poll_interval: Duration,
    pub(crate) expand_timeout: Duration,

    /// Pause between a completed login and capturing the session
    ///
    /// Default: 2 seconds
    pub(crate) login_settle: Duration,
    pub(crate) sort_retries: u32,

    /// Run Chrome without a window. Interactive login is impossible when set,
    /// so this only makes sense with a valid persisted session.
    pub(crate) headless: bool,
    pub(crate) verbose: bool,
}
