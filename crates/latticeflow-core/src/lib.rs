//! latticeflow core
//!
//! The resource model, the per-pass [`Stack`], the cross-pass [`Ledger`],
//! error classification, and the cluster objects builders read from.

pub mod cluster;
pub mod error;
pub mod model;
pub mod stack;
pub mod store;

pub use cluster::{ClusterReader, NamespacedName};
#[cfg(any(test, feature = "test-utils"))]
pub use cluster::{InMemoryCluster, MockClusterReader};
pub use error::{Error, ErrorKind, Result};
pub use model::*;
pub use stack::{Stack, StackState};
pub use store::{
    KeyGuard, Ledger, ListenerEntry, ListenerKey, Referrer, ServiceEntry, TargetGroupEntry,
};
