use crate::managers::{AccessLogSubscriptionManager, ResourceManager};
use latticeflow_cloud::Cloud;
use latticeflow_core::{AccessLogSubscription, Ledger, Result, Stack};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct AccessLogSubscriptionSynthesizer {
    manager: AccessLogSubscriptionManager,
}

impl AccessLogSubscriptionSynthesizer {
    pub fn new(cloud: Cloud, ledger: Arc<Ledger>) -> Self {
        Self {
            manager: AccessLogSubscriptionManager::new(cloud, ledger),
        }
    }

    pub async fn synthesize(&self, cancel: &CancellationToken, stack: &Stack) -> Result<()> {
        for subscription in stack.list::<AccessLogSubscription>() {
            if subscription.spec.is_deleted {
                continue;
            }
            let identity = self.manager.create(cancel, subscription).await?;
            subscription.status.set(identity);
        }
        Ok(())
    }

    pub async fn post_synthesize(&self, cancel: &CancellationToken, stack: &Stack) -> Result<()> {
        for subscription in stack.list::<AccessLogSubscription>() {
            if subscription.spec.is_deleted {
                self.manager.delete(cancel, subscription).await?;
            }
        }
        Ok(())
    }
}
