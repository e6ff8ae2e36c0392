//! latticeflow deploy
//!
//! Drives the remote control plane toward what a [`Stack`] declares.
//!
//! ```text
//! Stack ──► StackDeployer ──► Pipeline
//!                               │  synthesize (in order)
//!                               │  post_synthesize (reverse order)
//!                               ▼
//!                           Synthesizer ──► ResourceManager ──► LatticeApi
//!                                                 │
//!                                                 ▼
//!                                               Ledger
//! ```
//!
//! [`Stack`]: latticeflow_core::Stack

pub mod deployer;
pub mod managers;
pub mod synthesizers;

pub use deployer::{Pipeline, Stage, StackDeployer};
pub use managers::{
    AccessLogSubscriptionManager, ListenerManager, ListenerScope, ResourceManager, RuleManager,
    ServiceManager, ServiceNetworkManager, TargetGroupManager, TargetGroupWithTags,
    TargetsManager, default_health_check,
};
pub use synthesizers::Synthesizer;
