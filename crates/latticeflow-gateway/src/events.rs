//! Reconcile events
//!
//! Reasons keep the strings users already match on in their tooling.

use latticeflow_core::NamespacedName;
use std::fmt;

pub const REASON_FAILED_BUILD_MODEL: &str = "FailedBuildModel";
pub const REASON_FAILED_DEPLOY_MODEL: &str = "FailedDeployModel";
pub const REASON_DEPLOY_SUCCEED: &str = "DeploySucceed";
pub const REASON_RETRY_RECONCILE: &str = "Retry-Reconcile";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Normal,
    Warning,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "Normal"),
            Self::Warning => write!(f, "Warning"),
        }
    }
}

/// Sink for events about reconciled cluster objects
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
pub trait EventRecorder: Send + Sync {
    fn record(
        &self,
        kind: &str,
        object: &NamespacedName,
        event_type: EventType,
        reason: &str,
        message: &str,
    );
}

/// Logs events through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventRecorder;

impl EventRecorder for TracingEventRecorder {
    fn record(
        &self,
        kind: &str,
        object: &NamespacedName,
        event_type: EventType,
        reason: &str,
        message: &str,
    ) {
        match event_type {
            EventType::Normal => {
                tracing::info!(kind = %kind, object = %object, reason = %reason, "{}", message)
            }
            EventType::Warning => {
                tracing::warn!(kind = %kind, object = %object, reason = %reason, "{}", message)
            }
        }
    }
}
