use crate::surface::RenderedMessage;

/// Whether a result page finished loading before its timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCompleteness {
    Complete,
    Partial,
}

/// Rendered content of one result page, alive only while it is extracted
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage {
    /// 1-based page number
    pub index: u32,
    pub messages: Vec<RenderedMessage>,
    pub completeness: PageCompleteness,
}

impl ResultPage {
    #[must_use]
    pub fn new(index: u32, messages: Vec<RenderedMessage>, completeness: PageCompleteness) -> Self {
        Self {
            index,
            messages,
            completeness,
        }
    }

    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.completeness == PageCompleteness::Partial
    }
}
