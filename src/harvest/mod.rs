//! Page-by-page traversal of the result list

mod report;
mod run_state;
mod walker;

pub use report::{RunReport, RunStatus, StopReason};
pub use run_state::RunState;
pub use walker::PaginationWalker;
