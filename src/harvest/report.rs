//! Run outcome and summary

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Why traversal stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// No further page control, or a page produced nothing new
    EndOfResults,
    /// The configured page cap was reached
    PageCap,
    /// A page did not finish loading; its partial content was kept
    PartialTimeout,
    /// The user interrupted the run
    Interrupted,
    Fatal(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndOfResults => f.write_str("end of results"),
            Self::PageCap => f.write_str("page cap reached"),
            Self::PartialTimeout => f.write_str("partial page (timeout)"),
            Self::Interrupted => f.write_str("interrupted"),
            Self::Fatal(reason) => write!(f, "fatal error: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Complete,
    Partial,
    Fatal,
}

impl RunStatus {
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Complete => 0,
            Self::Fatal => 1,
            Self::Partial => 2,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => f.write_str("complete"),
            Self::Partial => f.write_str("partial"),
            Self::Fatal => f.write_str("fatal"),
        }
    }
}

/// Statistics of one finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub pages_visited: u32,
    pub records_written: usize,
    pub stop_reason: StopReason,
    pub effective_query: Option<String>,
    pub reported_total: Option<u64>,
    pub sort_applied: bool,
    pub output: PathBuf,
    pub elapsed: Duration,
}

impl RunReport {
    #[must_use]
    pub fn status(&self) -> RunStatus {
        match self.stop_reason {
            StopReason::EndOfResults | StopReason::PageCap => RunStatus::Complete,
            StopReason::PartialTimeout | StopReason::Interrupted => RunStatus::Partial,
            StopReason::Fatal(_) => RunStatus::Fatal,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Status:          {}", self.status())?;
        writeln!(f, "Stopped because: {}", self.stop_reason)?;
        writeln!(f, "Pages visited:   {}", self.pages_visited)?;
        match self.reported_total {
            Some(total) => writeln!(f, "Records written: {} (workspace reported {total})", self.records_written)?,
            None => writeln!(f, "Records written: {}", self.records_written)?,
        }
        if !self.sort_applied {
            writeln!(f, "Ordering:        default (oldest-first could not be applied)")?;
        }
        writeln!(f, "Output:          {}", self.output.display())?;
        write!(f, "Elapsed:         {:.1}s", self.elapsed.as_secs_f64())
    }
}
