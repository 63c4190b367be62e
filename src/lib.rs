//! Harvest Slack search results through the web client
//!
//! A run logs into the workspace (reusing a stored session when it can),
//! submits one query, forces oldest-first ordering, then walks the result
//! pages one at a time and appends every new message to a text or JSON
//! export.

pub mod auth;
pub mod browser_profile;
pub mod browser_setup;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod harvest;
pub mod interrupt;
pub mod surface;
pub mod utils;
pub mod workspace_search;

pub use auth::{AuthSession, AuthSessionStore};
pub use browser_profile::BrowserProfile;
pub use browser_setup::{download_managed_browser, find_browser_executable, launch_browser};
pub use config::HarvestConfig;
pub use error::{HarvestError, HarvestResult};
pub use export::{ExportFormat, ExportSink};
pub use extract::{MessageExtractor, MessageRecord, ResultPage};
pub use harvest::{PaginationWalker, RunReport, RunState, RunStatus, StopReason};
pub use interrupt::{CancelFlag, InterruptController};
pub use surface::{ChromiumSurface, ControlMatcher, RenderedMessage, WorkspaceSurface};
pub use workspace_search::{QueryDispatcher, SearchRequest, SortEnforcer};
