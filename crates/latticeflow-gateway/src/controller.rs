//! Reconcilers
//!
//! One entry point per cluster object kind. Each one reads the object,
//! builds its stack, deploys it through the matching [`StackDeployer`] and
//! records an event for the outcome. A build that fails part-way still
//! deploys what it built, as a partial stack, before the build error is
//! returned.

use crate::builder::{
    AccessLogPolicyBuilder, BuildError, BuildResult, GatewayBuilder, RouteBuilder,
    ServiceExportBuilder, TargetsBuilder,
};
use crate::events::{
    EventRecorder, EventType, REASON_DEPLOY_SUCCEED, REASON_FAILED_BUILD_MODEL,
    REASON_FAILED_DEPLOY_MODEL, REASON_RETRY_RECONCILE,
};
use latticeflow_cloud::Cloud;
use latticeflow_core::cluster::{AccessLogPolicy, RouteKind};
use latticeflow_core::{ClusterReader, Error, Ledger, NamespacedName, Result};
use latticeflow_deploy::StackDeployer;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const KIND_HTTP_ROUTE: &str = "HTTPRoute";
pub const KIND_GRPC_ROUTE: &str = "GRPCRoute";
pub const KIND_SERVICE_EXPORT: &str = "ServiceExport";
pub const KIND_SERVICE: &str = "Service";
pub const KIND_GATEWAY: &str = "Gateway";
pub const KIND_ACCESS_LOG_POLICY: &str = "AccessLogPolicy";

fn route_kind_name(kind: RouteKind) -> &'static str {
    match kind {
        RouteKind::Http => KIND_HTTP_ROUTE,
        RouteKind::Grpc => KIND_GRPC_ROUTE,
    }
}

pub struct Controller {
    cluster: Arc<dyn ClusterReader>,
    ledger: Arc<Ledger>,
    events: Arc<dyn EventRecorder>,
    vpc_id: String,
    service_deployer: StackDeployer,
    target_group_deployer: StackDeployer,
    targets_deployer: StackDeployer,
    network_deployer: StackDeployer,
    access_log_deployer: StackDeployer,
}

impl Controller {
    pub fn new(
        cloud: Cloud,
        cluster: Arc<dyn ClusterReader>,
        ledger: Arc<Ledger>,
        events: Arc<dyn EventRecorder>,
    ) -> Self {
        Self {
            vpc_id: cloud.config().vpc_id.clone(),
            service_deployer: StackDeployer::service(cloud.clone(), ledger.clone(), cluster.clone()),
            target_group_deployer: StackDeployer::target_group(cloud.clone(), ledger.clone()),
            targets_deployer: StackDeployer::targets(cloud.clone(), ledger.clone()),
            network_deployer: StackDeployer::service_network(cloud.clone(), ledger.clone()),
            access_log_deployer: StackDeployer::access_log(cloud, ledger.clone()),
            cluster,
            ledger,
            events,
        }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Converge an HTTP or gRPC route. Backend target groups the ledger
    /// did not know at build time get their targets on a requeued pass.
    pub async fn reconcile_route(
        &self,
        cancel: &CancellationToken,
        kind: RouteKind,
        name: &NamespacedName,
    ) -> Result<()> {
        let kind_name = route_kind_name(kind);
        let Some(route) = self.cluster.get_route(kind, name).await? else {
            debug!(kind = kind_name, route = %name, "route not found, nothing to reconcile");
            return Ok(());
        };

        let builder = RouteBuilder::new(self.cluster.clone(), self.ledger.clone(), &self.vpc_id);
        let built = builder.build(&route).await;
        let model = self
            .deploy_built(cancel, kind_name, name, &self.service_deployer, built)
            .await?;

        if !model.pending_targets.is_empty() {
            let pending: Vec<String> = model.pending_targets.iter().map(|k| k.to_string()).collect();
            let message = format!("targets pending for {}", pending.join(", "));
            self.events
                .record(kind_name, name, EventType::Normal, REASON_RETRY_RECONCILE, &message);
            return Err(Error::retry(message));
        }
        Ok(())
    }

    /// Converge the exported target group of a service. Exports without
    /// the federation annotation are ignored.
    pub async fn reconcile_service_export(
        &self,
        cancel: &CancellationToken,
        name: &NamespacedName,
    ) -> Result<()> {
        let Some(export) = self.cluster.get_service_export(name).await? else {
            debug!(export = %name, "service export not found, nothing to reconcile");
            return Ok(());
        };
        if !export.is_federated() {
            debug!(export = %name, "service export is not federated, skipping");
            return Ok(());
        }

        let builder = ServiceExportBuilder::new(self.cluster.clone(), self.ledger.clone(), &self.vpc_id);
        let built = builder.build(&export).await;
        let model = self
            .deploy_built(cancel, KIND_SERVICE_EXPORT, name, &self.target_group_deployer, built)
            .await?;

        if model.targets_pending {
            let message = format!("targets pending for {}", model.target_group);
            self.events.record(
                KIND_SERVICE_EXPORT,
                name,
                EventType::Normal,
                REASON_RETRY_RECONCILE,
                &message,
            );
            return Err(Error::retry(message));
        }
        Ok(())
    }

    /// Refresh target membership after a service or its endpoints changed
    pub async fn reconcile_service(&self, cancel: &CancellationToken, name: &NamespacedName) -> Result<()> {
        let built = TargetsBuilder::new(self.cluster.clone(), self.ledger.clone())
            .build(name)
            .await;
        let model = self
            .deploy_built(cancel, KIND_SERVICE, name, &self.targets_deployer, built)
            .await?;
        debug!(service = %name, target_groups = model.target_groups.len(), "targets refreshed");
        Ok(())
    }

    pub async fn reconcile_gateway(&self, cancel: &CancellationToken, name: &NamespacedName) -> Result<()> {
        let Some(gateway) = self.cluster.get_gateway(name).await? else {
            debug!(gateway = %name, "gateway not found, nothing to reconcile");
            return Ok(());
        };
        let built = GatewayBuilder::build(&gateway);
        self.deploy_built(cancel, KIND_GATEWAY, name, &self.network_deployer, built)
            .await?;
        Ok(())
    }

    /// Policies are passed in whole; the cluster reader does not serve them
    pub async fn reconcile_access_log_policy(
        &self,
        cancel: &CancellationToken,
        policy: &AccessLogPolicy,
    ) -> Result<()> {
        let name = policy.meta.namespaced_name();
        let built = AccessLogPolicyBuilder::new(self.cluster.clone())
            .build(policy)
            .await;
        self.deploy_built(cancel, KIND_ACCESS_LOG_POLICY, &name, &self.access_log_deployer, built)
            .await?;
        Ok(())
    }

    async fn deploy_built<T>(
        &self,
        cancel: &CancellationToken,
        kind: &str,
        name: &NamespacedName,
        deployer: &StackDeployer,
        built: BuildResult<T>,
    ) -> Result<T> {
        let built = match built {
            Ok(built) => built,
            Err(BuildError { error, stack }) => {
                let message = format!("failed to build model: {}", error);
                self.events
                    .record(kind, name, EventType::Warning, REASON_FAILED_BUILD_MODEL, &message);
                if let Some(mut stack) = stack {
                    stack.mark_partial(error.to_string());
                    if let Err(e) = deployer.deploy(cancel, &stack).await {
                        let message = format!("failed to deploy partial model: {}", e);
                        self.events
                            .record(kind, name, EventType::Warning, REASON_FAILED_DEPLOY_MODEL, &message);
                    }
                }
                return Err(error);
            }
        };

        if let Err(e) = deployer.deploy(cancel, &built.stack).await {
            let message = format!("failed to deploy model: {}", e);
            self.events
                .record(kind, name, EventType::Warning, REASON_FAILED_DEPLOY_MODEL, &message);
            return Err(e);
        }
        info!(kind = kind, object = %name, deployer = deployer.name(), "reconciled");
        self.events.record(
            kind,
            name,
            EventType::Normal,
            REASON_DEPLOY_SUCCEED,
            "Adding/Updating reconcile Done!",
        );
        Ok(built.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MockEventRecorder;
    use latticeflow_cloud::{CloudConfig, MockLatticeApi};
    use latticeflow_core::cluster::{ObjectMeta, ServiceExport};
    use latticeflow_core::InMemoryCluster;

    fn controller(cluster: Arc<InMemoryCluster>, events: MockEventRecorder) -> Controller {
        let cloud = Cloud::new(
            CloudConfig {
                vpc_id: "vpc-1".into(),
                account_id: "111122223333".into(),
                region: "us-west-2".into(),
                cluster_name: "test".into(),
            },
            Arc::new(MockLatticeApi::new()),
        );
        Controller::new(cloud, cluster, Arc::new(Ledger::new()), Arc::new(events))
    }

    #[tokio::test]
    async fn test_unfederated_export_is_ignored() {
        let cluster = Arc::new(InMemoryCluster::new());
        cluster.put_service_export(ServiceExport {
            meta: ObjectMeta::new("store", "checkout"),
        });
        let mut events = MockEventRecorder::new();
        events.expect_record().never();

        controller(cluster, events)
            .reconcile_service_export(&CancellationToken::new(), &NamespacedName::new("store", "checkout"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_route_is_done() {
        let mut events = MockEventRecorder::new();
        events.expect_record().never();

        controller(Arc::new(InMemoryCluster::new()), events)
            .reconcile_route(
                &CancellationToken::new(),
                RouteKind::Http,
                &NamespacedName::new("store", "web"),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_build_failure_without_stack_records_event() {
        let cluster = Arc::new(InMemoryCluster::new());
        let mut meta = ObjectMeta::new("store", "checkout");
        meta.annotations.insert(
            latticeflow_core::cluster::FEDERATION_ANNOTATION.into(),
            latticeflow_core::cluster::FEDERATION_VALUE.into(),
        );
        cluster.put_service_export(ServiceExport { meta });

        let mut events = MockEventRecorder::new();
        events
            .expect_record()
            .times(1)
            .withf(|kind, _, event_type, reason, _| {
                kind == KIND_SERVICE_EXPORT
                    && *event_type == EventType::Warning
                    && reason == REASON_FAILED_BUILD_MODEL
            })
            .return_const(());

        let err = controller(cluster, events)
            .reconcile_service_export(&CancellationToken::new(), &NamespacedName::new("store", "checkout"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingObject(_)));
    }
}
