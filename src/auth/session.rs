//! Serializable browser storage state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One browser cookie, independent of the CDP wire types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,

    /// Seconds since the Unix epoch. `None` for session cookies.
    #[serde(default)]
    pub expires: Option<f64>,

    #[serde(default)]
    pub http_only: bool,

    #[serde(default)]
    pub secure: bool,

    /// CDP `sameSite` value ("Strict", "Lax", "None")
    #[serde(default)]
    pub same_site: Option<String>,
}

/// Local storage entries captured for one origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginStorage {
    pub origin: String,
    pub local_storage: BTreeMap<String, String>,
}

/// Opaque persisted login state plus a validity flag
///
/// Created after the first successful interactive login, read on every later
/// run, and invalidated when the workspace rejects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub cookies: Vec<StoredCookie>,

    #[serde(default)]
    pub origins: Vec<OriginStorage>,

    #[serde(default = "default_valid")]
    pub valid: bool,

    pub saved_at: DateTime<Utc>,
}

fn default_valid() -> bool {
    true
}

impl AuthSession {
    #[must_use]
    pub fn new(cookies: Vec<StoredCookie>, origins: Vec<OriginStorage>) -> Self {
        Self {
            cookies,
            origins,
            valid: true,
            saved_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// True when the session carries nothing a browser could reuse
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.origins.iter().all(|o| o.local_storage.is_empty())
    }
}
