//! Cooperative cancellation of a harvesting run
//!
//! The first Ctrl-C sets a `CancelFlag` that the walker polls between pages,
//! so the in-flight page completes and the export is finalized. A second
//! Ctrl-C while that is happening exits immediately with status 130 without
//! finalizing.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use tracing::{error, warn};

/// Exit status used when the user forces an abort
pub const ABORT_EXIT_CODE: i32 = 130;

/// Shared, cheaply clonable cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What the process should do in response to one interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAction {
    /// Finish the current page, then finalize and stop
    GracefulStop,
    /// Exit now, leaving the export as it is
    Abort,
}

/// Counts interrupts and maps them to actions
#[derive(Debug, Clone, Default)]
pub struct InterruptController {
    flag: CancelFlag,
    signals: Arc<AtomicU8>,
}

impl InterruptController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag handed to the walker's `RunState`
    #[must_use]
    pub fn flag(&self) -> CancelFlag {
        self.flag.clone()
    }

    /// Record one interrupt
    pub fn signal(&self) -> InterruptAction {
        let previous = self.signals.fetch_add(1, Ordering::SeqCst);
        self.flag.cancel();
        if previous == 0 {
            InterruptAction::GracefulStop
        } else {
            InterruptAction::Abort
        }
    }

    /// Spawn a task that turns Ctrl-C into `signal()` calls
    ///
    /// On `Abort` the process exits with `ABORT_EXIT_CODE`.
    pub fn listen_for_ctrl_c(&self) -> tokio::task::JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for Ctrl-C: {}", e);
                    return;
                }
                match controller.signal() {
                    InterruptAction::GracefulStop => {
                        warn!(
                            "Interrupt received; finishing the current page and finalizing the export (press Ctrl-C again to abort)"
                        );
                    }
                    InterruptAction::Abort => {
                        error!("Second interrupt received; aborting without finalizing");
                        std::process::exit(ABORT_EXIT_CODE);
                    }
                }
            }
        })
    }

    /// Run `fut` with the Ctrl-C listener active
    pub async fn supervise<F, T>(&self, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        let listener = self.listen_for_ctrl_c();
        let output = fut.await;
        listener.abort();
        output
    }
}
