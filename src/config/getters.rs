//! Getter methods for `HarvestConfig`

use std::path::Path;
use std::time::Duration;

use super::types::HarvestConfig;
use crate::export::ExportFormat;
use crate::workspace_search::SearchRequest;

impl HarvestConfig {
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn workspace_url(&self) -> &str {
        &self.workspace_url
    }

    #[must_use]
    pub fn format(&self) -> ExportFormat {
        self.format
    }

    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    #[must_use]
    pub fn auth_file(&self) -> &Path {
        &self.auth_file
    }

    #[must_use]
    pub fn page_cap(&self) -> u32 {
        self.page_cap
    }

    #[must_use]
    pub fn page_timeout(&self) -> Duration {
        self.page_timeout
    }

    #[must_use]
    pub fn login_timeout(&self) -> Duration {
        self.login_timeout
    }

    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        self.navigation_timeout
    }

    #[must_use]
    pub fn signed_in_probe(&self) -> Duration {
        self.signed_in_probe
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    #[must_use]
    pub fn expand_timeout(&self) -> Duration {
        self.expand_timeout
    }

    #[must_use]
    pub fn login_settle(&self) -> Duration {
        self.login_settle
    }

    #[must_use]
    pub fn sort_retries(&self) -> u32 {
        self.sort_retries
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// The immutable request value handed to the query dispatcher
    #[must_use]
    pub fn search_request(&self) -> SearchRequest {
        SearchRequest::new(self.query.clone(), self.workspace_url.clone())
    }
}
