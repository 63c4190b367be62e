use std::collections::HashSet;

use crate::extract::MessageRecord;
use crate::interrupt::CancelFlag;

/// Mutable state of the single active run
///
/// Owned by the walker for the whole invocation and never shared, apart from
/// the cancellation flag which the interrupt listener sets.
#[derive(Debug, Default)]
pub struct RunState {
    page: u32,
    seen: HashSet<String>,
    records_written: usize,
    cancel: CancelFlag,
}

impl RunState {
    #[must_use]
    pub fn new(cancel: CancelFlag) -> Self {
        Self {
            cancel,
            ..Self::default()
        }
    }

    /// Keep only records whose key was never admitted before
    ///
    /// Order is preserved and duplicates within `records` are dropped too.
    pub fn admit(&mut self, records: Vec<MessageRecord>) -> Vec<MessageRecord> {
        records
            .into_iter()
            .filter(|record| self.seen.insert(record.key.clone()))
            .collect()
    }

    pub(crate) fn set_page(&mut self, page: u32) {
        self.page = page;
    }

    pub(crate) fn add_written(&mut self, count: usize) {
        self.records_written += count;
    }

    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    #[must_use]
    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }
}
