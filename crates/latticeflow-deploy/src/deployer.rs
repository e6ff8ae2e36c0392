//! Stack deployers
//!
//! A deployer is a fixed pipeline of stages. Every stage runs its forward
//! phase in order, then every stage runs its cleanup phase in reverse
//! order. The first failure aborts the pass; nothing is rolled back, the
//! next pass re-derives desired state and resumes.

use crate::managers::checkpoint;
use crate::synthesizers::{
    AccessLogSubscriptionSynthesizer, ListenerSynthesizer, RuleSynthesizer,
    ServiceNetworkSynthesizer, ServiceSynthesizer, Synthesizer, TargetGroupSynthesizer,
    TargetsSynthesizer,
};
use latticeflow_cloud::Cloud;
use latticeflow_core::{ClusterReader, Ledger, Result, Stack};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One named step of a pipeline
pub struct Stage {
    pub name: &'static str,
    pub synthesizer: Synthesizer,
}

impl Stage {
    pub fn new(name: &'static str, synthesizer: Synthesizer) -> Self {
        Self { name, synthesizer }
    }
}

#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, name: &'static str, synthesizer: Synthesizer) -> Self {
        self.stages.push(Stage::new(name, synthesizer));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name).collect()
    }

    pub async fn run(&self, cancel: &CancellationToken, stack: &Stack) -> Result<()> {
        for stage in &self.stages {
            checkpoint(cancel)?;
            debug!(stage = stage.name, kind = %stage.synthesizer.kind(), "synthesize");
            if let Err(e) = stage.synthesizer.synthesize(cancel, stack).await {
                debug!(stage = stage.name, error = %e, "synthesize failed");
                return Err(e);
            }
        }

        for stage in self.stages.iter().rev() {
            checkpoint(cancel)?;
            debug!(stage = stage.name, kind = %stage.synthesizer.kind(), "post-synthesize");
            if let Err(e) = stage.synthesizer.post_synthesize(cancel, stack).await {
                debug!(stage = stage.name, error = %e, "post-synthesize failed");
                return Err(e);
            }
        }
        Ok(())
    }
}

/// Deploys stacks of one reconciliation kind
pub struct StackDeployer {
    name: &'static str,
    ledger: Arc<Ledger>,
    pipeline: Pipeline,
}

impl StackDeployer {
    pub fn new(name: &'static str, ledger: Arc<Ledger>, pipeline: Pipeline) -> Self {
        Self {
            name,
            ledger,
            pipeline,
        }
    }

    /// Route reconciliation: target groups through rules, with the orphan
    /// target group sweep on the way out
    pub fn service(cloud: Cloud, ledger: Arc<Ledger>, cluster: Arc<dyn ClusterReader>) -> Self {
        let pipeline = Pipeline::new()
            .stage(
                "target-groups",
                Synthesizer::TargetGroup(
                    TargetGroupSynthesizer::new(cloud.clone(), ledger.clone()).with_gc(cluster),
                ),
            )
            .stage(
                "targets",
                Synthesizer::Targets(TargetsSynthesizer::new(cloud.clone(), ledger.clone())),
            )
            .stage(
                "service",
                Synthesizer::Service(ServiceSynthesizer::new(cloud.clone(), ledger.clone())),
            )
            .stage(
                "listeners",
                Synthesizer::Listener(ListenerSynthesizer::new(cloud.clone(), ledger.clone())),
            )
            .stage(
                "rules",
                Synthesizer::Rule(RuleSynthesizer::new(cloud, ledger.clone())),
            );
        Self::new("service", ledger, pipeline)
    }

    /// Service export reconciliation
    pub fn target_group(cloud: Cloud, ledger: Arc<Ledger>) -> Self {
        let pipeline = Pipeline::new()
            .stage(
                "target-groups",
                Synthesizer::TargetGroup(TargetGroupSynthesizer::new(cloud.clone(), ledger.clone())),
            )
            .stage(
                "targets",
                Synthesizer::Targets(TargetsSynthesizer::new(cloud, ledger.clone())),
            );
        Self::new("target-group", ledger, pipeline)
    }

    /// Gateway reconciliation
    pub fn service_network(cloud: Cloud, ledger: Arc<Ledger>) -> Self {
        let pipeline = Pipeline::new().stage(
            "service-network",
            Synthesizer::ServiceNetwork(ServiceNetworkSynthesizer::new(cloud)),
        );
        Self::new("service-network", ledger, pipeline)
    }

    /// Service or endpoints changes
    pub fn targets(cloud: Cloud, ledger: Arc<Ledger>) -> Self {
        let pipeline = Pipeline::new().stage(
            "targets",
            Synthesizer::Targets(TargetsSynthesizer::new(cloud, ledger.clone())),
        );
        Self::new("targets", ledger, pipeline)
    }

    /// Access log policy reconciliation
    pub fn access_log(cloud: Cloud, ledger: Arc<Ledger>) -> Self {
        let pipeline = Pipeline::new().stage(
            "access-log",
            Synthesizer::AccessLogSubscription(AccessLogSubscriptionSynthesizer::new(
                cloud,
                ledger.clone(),
            )),
        );
        Self::new("access-log", ledger, pipeline)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Deploy one stack. Deploys of the same stack through the same
    /// deployer never overlap.
    pub async fn deploy(&self, cancel: &CancellationToken, stack: &Stack) -> Result<()> {
        let _guard = self
            .ledger
            .lock(&format!("{}:{}", self.name, stack.id()))
            .await;

        match stack.to_json() {
            Ok(json) => debug!(deployer = self.name, stack = %json, "deploying stack"),
            Err(e) => warn!(deployer = self.name, error = %e, "failed to marshal stack"),
        }
        if stack.is_partial() {
            info!(deployer = self.name, stack_id = %stack.id(), "deploying partial stack, pruning disabled");
        }

        self.pipeline.run(cancel, stack).await?;
        info!(deployer = self.name, stack_id = %stack.id(), "stack deployed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::test_support::{managed_tags, test_cloud};
    use latticeflow_cloud::{MockLatticeApi, ServiceNetworkSummary};
    use latticeflow_core::{
        Error, InMemoryCluster, ServiceNetwork, ServiceNetworkSpec, StackId,
    };

    fn network_stack(is_deleted: bool) -> Stack {
        let id = StackId::new("default/mesh");
        let mut stack = Stack::new(id.clone());
        stack
            .add(ServiceNetwork::new(
                id,
                "mesh",
                ServiceNetworkSpec {
                    name: "mesh".into(),
                    is_deleted,
                },
            ))
            .unwrap();
        stack
    }

    #[test]
    fn test_service_pipeline_order() {
        let ledger = Arc::new(Ledger::new());
        let deployer = StackDeployer::service(
            test_cloud(MockLatticeApi::new()),
            ledger,
            Arc::new(InMemoryCluster::new()),
        );
        assert_eq!(
            deployer.pipeline().stage_names(),
            vec!["target-groups", "targets", "service", "listeners", "rules"]
        );
    }

    #[tokio::test]
    async fn test_cancelled_deploy_issues_no_remote_calls() {
        // no expectations: any remote call fails the test
        let api = MockLatticeApi::new();
        let deployer = StackDeployer::service_network(test_cloud(api), Arc::new(Ledger::new()));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = deployer.deploy(&cancel, &network_stack(false)).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_service_network_deploy_sets_status() {
        let mut api = MockLatticeApi::new();
        api.expect_list_service_networks().returning(|| Ok(vec![]));
        api.expect_create_service_network()
            .times(1)
            .withf(|input| input.tags == managed_tags())
            .returning(|input| {
                Ok(ServiceNetworkSummary {
                    id: "sn-1".into(),
                    arn: "arn:sn-1".into(),
                    name: input.name.clone(),
                })
            });

        let deployer = StackDeployer::service_network(test_cloud(api), Arc::new(Ledger::new()));
        let stack = network_stack(false);
        deployer.deploy(&CancellationToken::new(), &stack).await.unwrap();

        let sn = stack.list::<ServiceNetwork>()[0];
        assert_eq!(sn.status.get().unwrap().id, "sn-1");
    }

    #[tokio::test]
    async fn test_forward_failure_skips_cleanup() {
        let mut api = MockLatticeApi::new();
        api.expect_list_service_networks()
            .times(1)
            .returning(|| Err(latticeflow_cloud::LatticeError::AccessDenied("nope".into())));
        api.expect_delete_service_network().never();

        let deployer = StackDeployer::service_network(test_cloud(api), Arc::new(Ledger::new()));
        let err = deployer
            .deploy(&CancellationToken::new(), &network_stack(false))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), latticeflow_core::ErrorKind::Transport);
    }
}
