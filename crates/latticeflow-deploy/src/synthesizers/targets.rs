use crate::managers::{ResourceManager, TargetsManager};
use latticeflow_cloud::Cloud;
use latticeflow_core::{Ledger, Result, Stack, Targets};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Membership is converged in the forward phase only. An empty desired
/// list drains the group, which is how deletion flows through here.
///
/// Route passes and targets-only passes both write membership of the same
/// group, so each resource is synced under its target group's ledger lock.
pub struct TargetsSynthesizer {
    ledger: Arc<Ledger>,
    manager: TargetsManager,
}

impl TargetsSynthesizer {
    pub fn new(cloud: Cloud, ledger: Arc<Ledger>) -> Self {
        Self {
            manager: TargetsManager::new(cloud, ledger.clone()),
            ledger,
        }
    }

    pub async fn synthesize(&self, cancel: &CancellationToken, stack: &Stack) -> Result<()> {
        for targets in stack.list::<Targets>() {
            let key = targets.spec.target_group_key();
            let _guard = self.ledger.lock(&key.lock_key()).await;
            let members = self.manager.create(cancel, targets).await?;
            debug!(target_group = %key, count = members.len(), "targets in sync");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::test_support::{VPC_ID, test_cloud};
    use latticeflow_cloud::{MockLatticeApi, Target, TargetsOutcome};
    use latticeflow_core::{Referrer, RemoteIdentity, StackId, TargetsSpec};
    use std::time::Duration;

    fn stack(ips: &[&str]) -> Stack {
        let id = StackId::new("store/checkout");
        let mut stack = Stack::new(id.clone());
        stack
            .add(Targets::new(
                id,
                "targets",
                TargetsSpec {
                    service_name: "checkout".into(),
                    service_namespace: "store".into(),
                    route_name: "web".into(),
                    targets: ips
                        .iter()
                        .map(|ip| Target {
                            id: ip.to_string(),
                            port: 8080,
                        })
                        .collect(),
                },
            ))
            .unwrap();
        stack
    }

    #[tokio::test]
    async fn test_waits_for_target_group_lock() {
        let mut api = MockLatticeApi::new();
        api.expect_list_targets().times(1).returning(|_| Ok(vec![]));
        api.expect_register_targets()
            .times(1)
            .returning(|_, _| Ok(TargetsOutcome::default()));

        let ledger = Arc::new(Ledger::new());
        let stack = Arc::new(stack(&["10.0.0.1"]));
        let key = stack.list::<Targets>()[0].spec.target_group_key();
        ledger.record_target_group(&key, RemoteIdentity::new("arn:tg", "tg-1"), VPC_ID, Referrer::BackendRef);
        let synth = Arc::new(TargetsSynthesizer::new(test_cloud(api), ledger.clone()));

        // another pass is working on the same group
        let held = ledger.lock(&key.lock_key()).await;
        let pass = {
            let synth = synth.clone();
            let stack = stack.clone();
            tokio::spawn(async move { synth.synthesize(&CancellationToken::new(), &stack).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pass.is_finished());

        drop(held);
        pass.await.unwrap().unwrap();
        assert_eq!(ledger.target_group(&key).unwrap().targets.len(), 1);
        assert_eq!(ledger.lock_count(), 0);
    }
}
