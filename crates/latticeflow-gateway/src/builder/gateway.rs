use super::{Built, BuildResult};
use latticeflow_core::cluster::Gateway;
use latticeflow_core::{ServiceNetwork, ServiceNetworkSpec, Stack, StackId};

/// A gateway maps to exactly one service network named after it
pub struct GatewayBuilder;

impl GatewayBuilder {
    pub fn build(gateway: &Gateway) -> BuildResult<String> {
        let stack_id = StackId::from(&gateway.meta.namespaced_name());
        let mut stack = Stack::new(stack_id.clone());
        stack.add(ServiceNetwork::new(
            stack_id,
            "service-network",
            ServiceNetworkSpec {
                name: gateway.meta.name.clone(),
                is_deleted: gateway.meta.deleting,
            },
        ))?;
        Ok(Built {
            stack,
            model: gateway.meta.name.clone(),
        })
    }
}
