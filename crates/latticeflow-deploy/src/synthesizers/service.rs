use crate::managers::{ResourceManager, ServiceManager, ServiceNetworkManager};
use latticeflow_cloud::Cloud;
use latticeflow_core::{Ledger, Result, Service, ServiceNetwork, Stack};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct ServiceSynthesizer {
    manager: ServiceManager,
}

impl ServiceSynthesizer {
    pub fn new(cloud: Cloud, ledger: Arc<Ledger>) -> Self {
        Self {
            manager: ServiceManager::new(cloud, ledger),
        }
    }

    /// Associations are only pruned when the stack is complete
    pub async fn synthesize(&self, cancel: &CancellationToken, stack: &Stack) -> Result<()> {
        let prune = !stack.is_partial();
        for svc in stack.list::<Service>() {
            if svc.spec.is_deleted {
                continue;
            }
            let status = self.manager.ensure(cancel, svc, prune).await?;
            svc.status.set(status);
        }
        Ok(())
    }

    pub async fn post_synthesize(&self, cancel: &CancellationToken, stack: &Stack) -> Result<()> {
        for svc in stack.list::<Service>() {
            if svc.spec.is_deleted {
                self.manager.delete(cancel, svc).await?;
            }
        }
        Ok(())
    }
}

pub struct ServiceNetworkSynthesizer {
    manager: ServiceNetworkManager,
}

impl ServiceNetworkSynthesizer {
    pub fn new(cloud: Cloud) -> Self {
        Self {
            manager: ServiceNetworkManager::new(cloud),
        }
    }

    pub async fn synthesize(&self, cancel: &CancellationToken, stack: &Stack) -> Result<()> {
        for sn in stack.list::<ServiceNetwork>() {
            if sn.spec.is_deleted {
                continue;
            }
            let identity = self.manager.create(cancel, sn).await?;
            sn.status.set(identity);
        }
        Ok(())
    }

    pub async fn post_synthesize(&self, cancel: &CancellationToken, stack: &Stack) -> Result<()> {
        for sn in stack.list::<ServiceNetwork>() {
            if sn.spec.is_deleted {
                self.manager.delete(cancel, sn).await?;
            }
        }
        Ok(())
    }
}
