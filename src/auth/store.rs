//! File-backed session store with atomic replacement

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::session::AuthSession;
use crate::error::{HarvestError, HarvestResult};

/// Upper bound on the blocking write of the session file
const BLOCKING_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Loads and saves the persisted `AuthSession`
///
/// The store is the only writer of its file. Saves go through a temporary file
/// in the same directory followed by a rename, so a reader never observes a
/// half-written session and a crash mid-save leaves the previous one intact.
#[derive(Debug, Clone)]
pub struct AuthSessionStore {
    path: PathBuf,
}

impl AuthSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted session
    ///
    /// Returns `Ok(None)` when no file exists, when the file cannot be parsed,
    /// or when the stored session was invalidated. The caller then has to
    /// drive an interactive login and `save` the result.
    pub async fn load(&self) -> HarvestResult<Option<AuthSession>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No session file at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(HarvestError::Session(format!(
                    "Failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        let session: AuthSession = match serde_json::from_slice(&bytes) {
            Ok(session) => session,
            Err(e) => {
                warn!(
                    "Ignoring unreadable session file {}: {}",
                    self.path.display(),
                    e
                );
                return Ok(None);
            }
        };

        if !session.is_valid() {
            info!("Stored session at {} was invalidated", self.path.display());
            return Ok(None);
        }

        info!(
            "Loaded session from {} ({} cookies, saved {})",
            self.path.display(),
            session.cookies.len(),
            session.saved_at
        );
        Ok(Some(session))
    }

    /// Persist `session`, atomically replacing any previous one
    pub async fn save(&self, session: &AuthSession) -> HarvestResult<()> {
        let json = serde_json::to_vec_pretty(session)
            .map_err(|e| HarvestError::Session(format!("Failed to serialize session: {e}")))?;
        let path = self.path.clone();

        let blocking_task = tokio::task::spawn_blocking(move || write_atomically(&path, &json));

        match timeout(BLOCKING_WRITE_TIMEOUT, blocking_task).await {
            Ok(Ok(result)) => result.map_err(|e| {
                HarvestError::Session(format!("Failed to write {}: {e}", self.path.display()))
            })?,
            Ok(Err(e)) => {
                return Err(HarvestError::Session(format!("Session write task panicked: {e}")));
            }
            Err(_) => {
                return Err(HarvestError::Session(format!(
                    "Session write timed out after {BLOCKING_WRITE_TIMEOUT:?}"
                )));
            }
        }

        info!("Saved session to {}", self.path.display());
        Ok(())
    }

    /// Mark the stored session as rejected by the workspace
    ///
    /// The file is kept (cookies may still be useful for inspection) but
    /// `load` will report it absent from now on.
    pub async fn invalidate(&self) -> HarvestResult<()> {
        let Some(mut session) = self.load().await? else {
            return Ok(());
        };
        session.valid = false;
        self.save(&session).await?;
        warn!("Invalidated stored session at {}", self.path.display());
        Ok(())
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
