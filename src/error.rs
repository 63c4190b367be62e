//! Error taxonomy for a harvesting run
//!
//! Component-local, recoverable conditions (`SortControlNotFound`,
//! `PageTimeout`, `Extraction`) are absorbed by the caller and logged.
//! Everything else ends the run, after the export has been finalized.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for harvesting operations
pub type HarvestResult<T> = Result<T, HarvestError>;

#[derive(Debug, Error)]
pub enum HarvestError {
    /// Interactive login was not completed in time
    #[error("Login was not completed within {}s", waited.as_secs())]
    AuthTimeout { waited: Duration },

    /// Workspace could not be reached
    #[error("Failed to reach workspace: {0}")]
    Navigation(String),

    /// No candidate sort control could be activated
    #[error("Sort control not found after {attempts} attempt(s)")]
    SortControlNotFound { attempts: u32 },

    /// A result page did not finish loading in time
    #[error("Result page {page} did not finish loading in time")]
    PageTimeout { page: u32 },

    /// The workspace redirected to the login flow mid-run
    #[error("Workspace session expired (redirected to sign-in)")]
    AuthExpired,

    /// A single rendered message could not be mapped to a record
    #[error("Failed to extract message {index}: {reason}")]
    Extraction { index: usize, reason: String },

    /// Output file could not be written
    #[error("Export failed: {0}")]
    Export(#[from] std::io::Error),

    /// Persisted session could not be read or written
    #[error("Session store error: {0}")]
    Session(String),

    /// Browser communication failure
    #[error("Browser error: {0}")]
    Browser(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Run was cancelled by the user
    #[error("Harvest was cancelled")]
    Cancelled,
}

impl From<anyhow::Error> for HarvestError {
    fn from(err: anyhow::Error) -> Self {
        // {:#} keeps the whole context chain
        Self::Browser(format!("{err:#}"))
    }
}

impl HarvestError {
    /// Whether this error ends the run when it reaches the walker
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::SortControlNotFound { .. } | Self::PageTimeout { .. } | Self::Extraction { .. }
        )
    }
}
