use crate::managers::{ListenerManager, ResourceManager, lookup_service};
use latticeflow_cloud::Cloud;
use latticeflow_core::{Ledger, Listener, ListenerKey, Result, Service, Stack};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub(super) fn service_deleted(stack: &Stack, service_name: &str) -> bool {
    stack
        .list::<Service>()
        .iter()
        .any(|s| s.spec.is_deleted && s.spec.remote_name() == service_name)
}

pub struct ListenerSynthesizer {
    cloud: Cloud,
    ledger: Arc<Ledger>,
    manager: ListenerManager,
}

impl ListenerSynthesizer {
    pub fn new(cloud: Cloud, ledger: Arc<Ledger>) -> Self {
        Self {
            manager: ListenerManager::new(cloud.clone(), ledger.clone()),
            cloud,
            ledger,
        }
    }

    pub async fn synthesize(&self, cancel: &CancellationToken, stack: &Stack) -> Result<()> {
        for listener in stack.list::<Listener>() {
            if service_deleted(stack, &listener.spec.service_name()) {
                continue;
            }
            let status = self.manager.create(cancel, listener).await?;
            listener.status.set(status);
        }
        Ok(())
    }

    /// Remove listeners no longer declared for a live service, and every
    /// listener of a deleted one ahead of the service delete
    pub async fn post_synthesize(&self, cancel: &CancellationToken, stack: &Stack) -> Result<()> {
        for svc in stack.list::<Service>() {
            if !svc.spec.is_deleted && stack.is_partial() {
                debug!(service = %svc.spec.remote_name(), "partial stack, not pruning listeners");
                continue;
            }
            let name = svc.spec.remote_name();
            let Some(service) = lookup_service(&self.cloud, &self.ledger, cancel, &name).await? else {
                continue;
            };
            if svc.spec.is_deleted && !self.cloud.is_arn_managed(&service.arn).await {
                continue;
            }

            let declared: BTreeSet<u16> = if svc.spec.is_deleted {
                BTreeSet::new()
            } else {
                stack
                    .list::<Listener>()
                    .iter()
                    .filter(|l| l.spec.service_name() == name)
                    .map(|l| l.spec.port)
                    .collect()
            };

            for remote in self.manager.list(cancel, &service.id).await? {
                if declared.contains(&remote.port) {
                    continue;
                }
                info!(service = %name, listener = %remote.name, "pruning listener");
                self.manager.delete_remote(cancel, &service.id, &remote.id).await?;
                self.ledger.remove_listener(&ListenerKey {
                    service_name: name.clone(),
                    port: remote.port,
                    protocol: remote.protocol.clone(),
                });
            }
        }
        Ok(())
    }
}
