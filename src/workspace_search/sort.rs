//! Oldest-first ordering of the result list

use rand::Rng;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::controls::{activate_first, read_first_text};
use super::selectors::{SORT_LABEL_SELECTORS, sort_menu_matchers, sort_option_matchers};
use crate::error::{HarvestError, HarvestResult};
use crate::surface::WorkspaceSurface;

/// Forces oldest-first ordering through the sort menu
///
/// Idempotent: when the sort label already reads "oldest" nothing is clicked.
pub struct SortEnforcer<'a, S> {
    surface: &'a S,
    retries: u32,
    settle: Duration,
}

impl<'a, S: WorkspaceSurface> SortEnforcer<'a, S> {
    /// `retries` extra attempts after the first; `settle` is the pause after
    /// each click and the base of the retry backoff
    pub fn new(surface: &'a S, retries: u32, settle: Duration) -> Self {
        Self {
            surface,
            retries,
            settle,
        }
    }

    /// # Errors
    ///
    /// `SortControlNotFound` after every attempt failed to reach the option.
    /// Callers treat it as a degraded ordering, not a failed run.
    pub async fn enforce(&self) -> HarvestResult<()> {
        let attempts = self.retries + 1;
        for attempt in 0..attempts {
            if self.is_oldest_first().await {
                info!("Results are sorted oldest first");
                return Ok(());
            }

            match self.try_select_oldest().await {
                Ok(true) => {
                    tokio::time::sleep(self.settle).await;
                    info!("Applied oldest-first ordering (attempt {})", attempt + 1);
                    return Ok(());
                }
                Ok(false) => debug!("Sort control not found (attempt {})", attempt + 1),
                Err(e) => warn!("Sort attempt {} failed: {:#}", attempt + 1, e),
            }

            if attempt + 1 < attempts {
                let base = u64::try_from(self.settle.as_millis()).unwrap_or(u64::MAX);
                let jitter = rand::rng().random_range(0..base.max(1));
                let delay = backoff_delay(attempt, base, jitter);
                debug!("Retrying sort in {}ms", delay);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }
        Err(HarvestError::SortControlNotFound { attempts })
    }

    async fn is_oldest_first(&self) -> bool {
        read_first_text(self.surface, SORT_LABEL_SELECTORS)
            .await
            .is_some_and(|label| label.to_lowercase().contains("oldest"))
    }

    /// Open the sort menu and pick the oldest-first entry
    async fn try_select_oldest(&self) -> anyhow::Result<bool> {
        // Some layouts list the options without a menu; try those first
        if activate_first(self.surface, &sort_option_matchers()).await?.is_some() {
            return Ok(true);
        }
        if activate_first(self.surface, &sort_menu_matchers()).await?.is_none() {
            return Ok(false);
        }
        tokio::time::sleep(self.settle).await;
        Ok(activate_first(self.surface, &sort_option_matchers())
            .await?
            .is_some())
    }
}

/// `2^attempt * base + jitter` milliseconds, saturating instead of overflowing
fn backoff_delay(attempt: u32, base: u64, jitter: u64) -> u64 {
    2u64.saturating_pow(attempt)
        .saturating_mul(base)
        .saturating_add(jitter)
}
