//! Throwaway Chrome profile directory for one run
//!
//! Login state lives in the session file, not in the profile, so the profile
//! is created fresh under the temp dir and removed when the run ends.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

const PROFILE_PREFIX: &str = "slack_search_export_profile";

/// Profile directory removed on drop
#[derive(Debug)]
pub struct BrowserProfile {
    path: PathBuf,
}

impl BrowserProfile {
    /// Create a uniquely named profile directory under the temp dir
    pub fn create() -> Result<Self> {
        Self::create_in(&std::env::temp_dir())
    }

    pub fn create_in(parent: &Path) -> Result<Self> {
        let path = parent.join(format!("{PROFILE_PREFIX}_{}", Uuid::new_v4()));
        // create_dir fails if the directory already exists
        std::fs::create_dir(&path)
            .with_context(|| format!("Failed to create profile directory: {}", path.display()))?;
        debug!("Created browser profile {}", path.display());
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BrowserProfile {
    fn drop(&mut self) {
        if self.path.exists() {
            debug!("Removing browser profile {}", self.path.display());
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!("Failed to remove profile directory {}: {}", self.path.display(), e);
            }
        }
    }
}
