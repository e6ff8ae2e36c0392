use super::{Built, BuildResult};
use latticeflow_core::cluster::{AccessLogPolicy, PolicyTargetKind, RouteKind};
use latticeflow_core::naming::service_name;
use latticeflow_core::{
    AccessLogSource, AccessLogSubscription, AccessLogSubscriptionSpec, ClusterReader,
    DestinationType, Error, NamespacedName, Stack, StackId,
};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct AccessLogPolicyModel {
    pub source_type: AccessLogSource,
    pub source_name: String,
}

/// Builds the access log subscription an access log policy asks for
pub struct AccessLogPolicyBuilder {
    cluster: Arc<dyn ClusterReader>,
}

impl AccessLogPolicyBuilder {
    pub fn new(cluster: Arc<dyn ClusterReader>) -> Self {
        Self { cluster }
    }

    pub async fn build(&self, policy: &AccessLogPolicy) -> BuildResult<AccessLogPolicyModel> {
        let policy_nn = policy.meta.namespaced_name();
        let deleting = policy.meta.deleting;
        if !deleting && DestinationType::from_arn(&policy.destination_arn).is_none() {
            return Err(Error::InvalidConfig(format!(
                "access log policy {}: unsupported destination {}",
                policy_nn, policy.destination_arn
            ))
            .into());
        }

        let target = &policy.target;
        let target_nn = NamespacedName::new(
            target
                .namespace
                .clone()
                .unwrap_or_else(|| policy.meta.namespace.clone()),
            target.name.clone(),
        );

        // a deleted policy only needs the source name, which is derivable
        let model = match target.kind {
            PolicyTargetKind::Gateway => {
                if !deleting && self.cluster.get_gateway(&target_nn).await?.is_none() {
                    return Err(Error::MissingObject(format!("gateway {}", target_nn)).into());
                }
                AccessLogPolicyModel {
                    source_type: AccessLogSource::ServiceNetwork,
                    source_name: target_nn.name.clone(),
                }
            }
            PolicyTargetKind::HttpRoute | PolicyTargetKind::GrpcRoute => {
                let kind = if target.kind == PolicyTargetKind::HttpRoute {
                    RouteKind::Http
                } else {
                    RouteKind::Grpc
                };
                if !deleting && self.cluster.get_route(kind, &target_nn).await?.is_none() {
                    return Err(Error::MissingObject(format!("route {}", target_nn)).into());
                }
                AccessLogPolicyModel {
                    source_type: AccessLogSource::Service,
                    source_name: service_name(&target_nn.name, &target_nn.namespace),
                }
            }
        };

        let stack_id = StackId::from(&policy_nn);
        let mut stack = Stack::new(stack_id.clone());
        stack.add(AccessLogSubscription::new(
            stack_id,
            "access-log-subscription",
            AccessLogSubscriptionSpec {
                source_type: model.source_type,
                source_name: model.source_name.clone(),
                destination_arn: policy.destination_arn.clone(),
                is_deleted: deleting,
            },
        ))?;
        Ok(Built { stack, model })
    }
}
