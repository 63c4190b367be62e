//! Bounded and cancellable waits for browser operations

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::interrupt::CancelFlag;

/// Wrap a browser operation with an explicit timeout
///
/// Distinguishes a timeout from the operation's own failure in the error
/// message.
pub async fn with_timeout<F, T>(operation: F, timeout: Duration, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "{operation_name} timeout after {}ms",
            timeout.as_millis()
        )),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Satisfied,
    TimedOut,
    Cancelled,
}

/// Poll `condition` every `poll` until it holds, `timeout` elapses, or
/// `cancel` is set
///
/// The condition is always checked at least once, and once more right at the
/// deadline.
pub async fn wait_for_condition<C, Fut>(
    mut condition: C,
    timeout: Duration,
    poll: Duration,
    cancel: &CancelFlag,
) -> WaitOutcome
where
    C: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if cancel.is_cancelled() {
            return WaitOutcome::Cancelled;
        }
        if condition().await {
            return WaitOutcome::Satisfied;
        }
        let now = Instant::now();
        if now >= deadline {
            return WaitOutcome::TimedOut;
        }
        tokio::time::sleep(poll.min(deadline - now)).await;
    }
}
