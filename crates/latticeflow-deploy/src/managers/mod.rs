//! Resource managers
//!
//! One manager per remote resource kind. Each encodes that kind's remote
//! lifecycle: list-then-match by derived name, create or update, and
//! classify transitional remote states as retryable.

mod access_log;
mod listener;
mod rule;
mod service;
mod service_network;
mod target_group;
mod targets;

pub use access_log::AccessLogSubscriptionManager;
pub use listener::ListenerManager;
pub use rule::{ListenerScope, RuleManager};
pub use service::ServiceManager;
pub use service_network::ServiceNetworkManager;
pub use target_group::{TargetGroupManager, TargetGroupWithTags, default_health_check};
pub use targets::TargetsManager;

use async_trait::async_trait;
use latticeflow_cloud::Cloud;
use latticeflow_core::{Error, Ledger, Result, ServiceEntry};
use tokio_util::sync::CancellationToken;

/// The contract every resource kind implements
///
/// `Status` is what a successful create reports and what `get` returns for
/// an existing resource; `Summary` is one item of a remote listing, scoped
/// by `Scope` (a parent id, or `()` for top-level kinds).
#[async_trait]
pub trait ResourceManager: Send + Sync {
    type Resource: Send + Sync;
    type Status: Send;
    type Summary: Send;
    type Scope: Send + Sync + ?Sized;

    async fn create(&self, cancel: &CancellationToken, desired: &Self::Resource)
    -> Result<Self::Status>;

    async fn update(&self, cancel: &CancellationToken, desired: &Self::Resource)
    -> Result<Self::Status>;

    async fn delete(&self, cancel: &CancellationToken, existing: &Self::Resource) -> Result<()>;

    async fn get(
        &self,
        cancel: &CancellationToken,
        desired: &Self::Resource,
    ) -> Result<Option<Self::Status>>;

    async fn list(
        &self,
        cancel: &CancellationToken,
        scope: &Self::Scope,
    ) -> Result<Vec<Self::Summary>>;
}

/// Bail out before the next remote call once cancellation is requested
pub(crate) fn checkpoint(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

/// Resolve a service by derived name, ledger first, then a remote listing.
/// The ledger is repaired on a remote hit.
pub(crate) async fn lookup_service(
    cloud: &Cloud,
    ledger: &Ledger,
    cancel: &CancellationToken,
    name: &str,
) -> Result<Option<ServiceEntry>> {
    if let Some(entry) = ledger.service(name) {
        return Ok(Some(entry));
    }
    checkpoint(cancel)?;
    let found = cloud
        .api()
        .list_services()
        .await?
        .into_iter()
        .find(|s| s.name == name);
    Ok(found.map(|s| {
        let entry = ServiceEntry {
            name: s.name,
            arn: s.arn,
            id: s.id,
            dns: s.dns_entry.map(|d| d.domain_name),
        };
        ledger.put_service(entry.clone());
        entry
    }))
}
