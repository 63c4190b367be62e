//! Getting a search onto the screen: login, query submission, sort order
//!
//! Everything here talks to the browser only through
//! [`WorkspaceSurface`](crate::surface::WorkspaceSurface).

mod controls;
mod dispatcher;
pub mod selectors;
mod sort;
pub mod wait;

use serde::{Deserialize, Serialize};

pub use controls::{activate_first, is_login_redirect, read_first_text};
pub use dispatcher::{DispatchOutcome, LoginMode, QueryDispatcher};
pub use sort::SortEnforcer;
pub use wait::{WaitOutcome, wait_for_condition, with_timeout};

/// Result ordering requested from the workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Oldest message first, the only order the harvester asks for
    #[default]
    OldestFirst,
}

/// Immutable description of one search, created once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    query: String,
    workspace_url: String,
    sort: SortOrder,
}

impl SearchRequest {
    #[must_use]
    pub fn new(query: impl Into<String>, workspace_url: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            workspace_url: workspace_url.into(),
            sort: SortOrder::OldestFirst,
        }
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn workspace_url(&self) -> &str {
        &self.workspace_url
    }

    #[must_use]
    pub fn sort(&self) -> SortOrder {
        self.sort
    }
}
