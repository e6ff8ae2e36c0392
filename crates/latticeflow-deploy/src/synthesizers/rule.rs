use super::listener::service_deleted;
use crate::managers::{ListenerScope, ResourceManager, RuleManager};
use latticeflow_cloud::Cloud;
use latticeflow_core::{Ledger, Listener, Result, Rule, Stack};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct RuleSynthesizer {
    manager: RuleManager,
}

impl RuleSynthesizer {
    pub fn new(cloud: Cloud, ledger: Arc<Ledger>) -> Self {
        Self {
            manager: RuleManager::new(cloud, ledger),
        }
    }

    pub async fn synthesize(&self, cancel: &CancellationToken, stack: &Stack) -> Result<()> {
        for rule in stack.list::<Rule>() {
            if service_deleted(stack, &rule.spec.service_name()) {
                continue;
            }
            let status = self.manager.create(cancel, rule).await?;
            rule.status.set(status);
        }
        Ok(())
    }

    /// Remove non-default rules the stack no longer declares on each of its
    /// listeners
    pub async fn post_synthesize(&self, cancel: &CancellationToken, stack: &Stack) -> Result<()> {
        if stack.is_partial() {
            return Ok(());
        }
        for listener in stack.list::<Listener>() {
            let Some(status) = listener.status.get() else {
                continue;
            };
            let scope = ListenerScope {
                service_id: status.service_id.clone(),
                listener_id: status.id.clone(),
            };
            let listener_name = listener.spec.remote_name();
            let declared: BTreeSet<String> = stack
                .list::<Rule>()
                .iter()
                .filter(|r| r.spec.listener_name() == listener_name)
                .map(|r| r.spec.remote_name())
                .collect();

            for remote in self.manager.list(cancel, &scope).await? {
                if remote.is_default || declared.contains(&remote.name) {
                    continue;
                }
                info!(listener = %listener_name, rule = %remote.name, "pruning rule");
                self.manager.delete_remote(cancel, &scope, &remote.id).await?;
            }
        }
        Ok(())
    }
}
