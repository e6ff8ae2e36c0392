//! Reconcile outcome classification

use latticeflow_config::RequeueConfig;
use latticeflow_core::{ErrorKind, Result};
use std::time::Duration;
use tracing::debug;

/// What the caller's work queue should do with the object next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    Done,
    RequeueAfter(Duration),
}

/// Turn a reconcile result into a queue action
///
/// Retryable errors requeue with backoff for the given 0-based attempt.
/// Fatal and transport errors are handed back unchanged.
pub fn handle_reconcile_error(
    result: Result<()>,
    attempt: u32,
    requeue: &RequeueConfig,
) -> Result<ReconcileAction> {
    match result {
        Ok(()) => Ok(ReconcileAction::Done),
        Err(e) if e.kind() == ErrorKind::Retryable => {
            let delay = requeue.delay_for_attempt(attempt);
            debug!(error = %e, attempt, delay_secs = delay.as_secs_f64(), "requeueing");
            Ok(ReconcileAction::RequeueAfter(delay))
        }
        Err(e) => Err(e),
    }
}
