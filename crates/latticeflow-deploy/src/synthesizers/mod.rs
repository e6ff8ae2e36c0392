//! Synthesizers
//!
//! One per resource kind. `synthesize` applies creates and updates for what
//! the stack declares; `post_synthesize` runs after every stage's forward
//! phase, in reverse stage order, and handles deletion and pruning.

mod access_log;
mod listener;
mod rule;
mod service;
mod target_group;
mod targets;

pub use access_log::AccessLogSubscriptionSynthesizer;
pub use listener::ListenerSynthesizer;
pub use rule::RuleSynthesizer;
pub use service::{ServiceNetworkSynthesizer, ServiceSynthesizer};
pub use target_group::TargetGroupSynthesizer;
pub use targets::TargetsSynthesizer;

use latticeflow_core::{ResourceKind, Result, Stack};
use tokio_util::sync::CancellationToken;

/// The closed set of synthesizers a pipeline can be built from
pub enum Synthesizer {
    ServiceNetwork(ServiceNetworkSynthesizer),
    Service(ServiceSynthesizer),
    TargetGroup(TargetGroupSynthesizer),
    Targets(TargetsSynthesizer),
    Listener(ListenerSynthesizer),
    Rule(RuleSynthesizer),
    AccessLogSubscription(AccessLogSubscriptionSynthesizer),
}

impl Synthesizer {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::ServiceNetwork(_) => ResourceKind::ServiceNetwork,
            Self::Service(_) => ResourceKind::Service,
            Self::TargetGroup(_) => ResourceKind::TargetGroup,
            Self::Targets(_) => ResourceKind::Targets,
            Self::Listener(_) => ResourceKind::Listener,
            Self::Rule(_) => ResourceKind::Rule,
            Self::AccessLogSubscription(_) => ResourceKind::AccessLogSubscription,
        }
    }

    pub async fn synthesize(&self, cancel: &CancellationToken, stack: &Stack) -> Result<()> {
        match self {
            Self::ServiceNetwork(s) => s.synthesize(cancel, stack).await,
            Self::Service(s) => s.synthesize(cancel, stack).await,
            Self::TargetGroup(s) => s.synthesize(cancel, stack).await,
            Self::Targets(s) => s.synthesize(cancel, stack).await,
            Self::Listener(s) => s.synthesize(cancel, stack).await,
            Self::Rule(s) => s.synthesize(cancel, stack).await,
            Self::AccessLogSubscription(s) => s.synthesize(cancel, stack).await,
        }
    }

    pub async fn post_synthesize(&self, cancel: &CancellationToken, stack: &Stack) -> Result<()> {
        match self {
            Self::ServiceNetwork(s) => s.post_synthesize(cancel, stack).await,
            Self::Service(s) => s.post_synthesize(cancel, stack).await,
            Self::TargetGroup(s) => s.post_synthesize(cancel, stack).await,
            // membership is fully converged in the forward phase
            Self::Targets(_) => Ok(()),
            Self::Listener(s) => s.post_synthesize(cancel, stack).await,
            Self::Rule(s) => s.post_synthesize(cancel, stack).await,
            Self::AccessLogSubscription(s) => s.post_synthesize(cancel, stack).await,
        }
    }
}
