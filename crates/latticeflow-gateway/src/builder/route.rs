use super::{BuildError, Built, BuildResult, TargetsBuilder};
use latticeflow_cloud::RuleAction;
use latticeflow_core::cluster::{BackendKind, BackendRef, GatewayListener, Route};
use latticeflow_core::naming::{backend_ref_target_group_name, service_name, target_group_name};
use latticeflow_core::{
    ClusterReader, Error, Ledger, Listener, ListenerSpec, NamespacedName, Result, Rule,
    RuleSpec, RuleSpecAction, RuleTarget, Service, ServiceSpec, Stack, StackId, TargetGroup,
    TargetGroupKey, TargetGroupReference, TargetGroupSpec,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteModel {
    /// Remote name of the route's service
    pub service_name: String,
    /// Backend-ref groups the ledger does not know yet; their targets
    /// are built on a later pass
    pub pending_targets: Vec<TargetGroupKey>,
}

/// Builds the service, listener, rule and target group graph of a route
pub struct RouteBuilder {
    cluster: Arc<dyn ClusterReader>,
    ledger: Arc<Ledger>,
    vpc_id: String,
    targets: TargetsBuilder,
}

impl RouteBuilder {
    pub fn new(cluster: Arc<dyn ClusterReader>, ledger: Arc<Ledger>, vpc_id: impl Into<String>) -> Self {
        Self {
            targets: TargetsBuilder::new(cluster.clone(), ledger.clone()),
            cluster,
            ledger,
            vpc_id: vpc_id.into(),
        }
    }

    pub async fn build(&self, route: &Route) -> BuildResult<RouteModel> {
        let route_nn = route.meta.namespaced_name();
        let stack_id = StackId::from(&route_nn);
        let mut stack = Stack::new(stack_id.clone());
        let deleting = route.meta.deleting;

        stack.add(self.service(&stack_id, route))?;

        let mut model = RouteModel {
            service_name: service_name(&route.meta.name, &route.meta.namespace),
            pending_targets: Vec::new(),
        };

        if let Err(e) = self.add_target_groups(&mut stack, route, &mut model).await {
            return Err(BuildError::partial(e, stack));
        }
        if deleting {
            debug!(route = %route_nn, "route is being deleted, skipping listeners and rules");
            return Ok(Built { stack, model });
        }

        let listeners = match self.gateway_listeners(route).await {
            Ok(listeners) => listeners,
            Err(e) => return Err(BuildError::partial(e, stack)),
        };
        for gw_listener in &listeners {
            let protocol = gw_listener.protocol.to_uppercase();
            stack.add(Listener::new(
                stack_id.clone(),
                format!("listener-{}", gw_listener.port),
                ListenerSpec {
                    route_name: route.meta.name.clone(),
                    route_namespace: route.meta.namespace.clone(),
                    port: gw_listener.port,
                    protocol: protocol.clone(),
                    default_action: RuleAction::not_found(),
                },
            ))?;

            for (idx, rule) in route.rules.iter().enumerate() {
                let priority = idx as u32 + 1;
                stack.add(Rule::new(
                    stack_id.clone(),
                    format!("rule-{}-{}", gw_listener.port, priority),
                    RuleSpec {
                        route_name: route.meta.name.clone(),
                        route_namespace: route.meta.namespace.clone(),
                        listener_port: gw_listener.port,
                        listener_protocol: protocol.clone(),
                        priority,
                        http_match: rule.matches.clone().unwrap_or_default(),
                        action: Self::action(route, &rule.backend_refs),
                    },
                ))?;
            }
        }

        debug!(
            route = %route_nn,
            listeners = listeners.len(),
            pending = model.pending_targets.len(),
            "built route model"
        );
        Ok(Built { stack, model })
    }

    fn service(&self, stack_id: &StackId, route: &Route) -> Service {
        let mut networks: Vec<String> = Vec::new();
        for parent in &route.parent_refs {
            if !networks.contains(&parent.name) {
                networks.push(parent.name.clone());
            }
        }
        Service::new(
            stack_id.clone(),
            "service",
            ServiceSpec {
                route_name: route.meta.name.clone(),
                route_namespace: route.meta.namespace.clone(),
                route_kind: route.kind,
                service_networks: networks,
                custom_domain_name: route.hostnames.first().cloned(),
                is_deleted: route.meta.deleting,
            },
        )
    }

    /// Gateway listeners the route attaches to, one per port
    async fn gateway_listeners(&self, route: &Route) -> Result<Vec<GatewayListener>> {
        let mut seen = BTreeSet::new();
        let mut listeners = Vec::new();
        for parent in &route.parent_refs {
            let gw_name = NamespacedName::new(
                parent
                    .namespace
                    .clone()
                    .unwrap_or_else(|| route.meta.namespace.clone()),
                parent.name.clone(),
            );
            let Some(gateway) = self.cluster.get_gateway(&gw_name).await? else {
                return Err(Error::MissingObject(format!("gateway {}", gw_name)));
            };
            for listener in gateway.listeners {
                if parent.section_name.as_ref().is_some_and(|s| *s != listener.name) {
                    continue;
                }
                if parent.port.is_some_and(|p| p != listener.port) {
                    continue;
                }
                if seen.insert(listener.port) {
                    listeners.push(listener);
                }
            }
        }
        Ok(listeners)
    }

    fn backend_key(route: &Route, backend: &BackendRef) -> TargetGroupKey {
        let namespace = route.backend_namespace(backend);
        match backend.kind {
            BackendKind::Service => {
                TargetGroupKey::backend_ref(&backend.name, namespace, &route.meta.name)
            }
            BackendKind::ServiceImport => TargetGroupKey::import(&backend.name, namespace),
        }
    }

    fn action(route: &Route, backends: &[BackendRef]) -> RuleSpecAction {
        if backends.is_empty() {
            return RuleSpecAction::FixedResponse(404);
        }
        RuleSpecAction::Forward(
            backends
                .iter()
                .map(|b| RuleTarget {
                    target_group: Self::backend_key(route, b),
                    weight: b.weight,
                })
                .collect(),
        )
    }

    /// One target group per distinct backend, plus Targets for the ones
    /// the ledger already knows, or empty Targets for every one while deleting
    async fn add_target_groups(
        &self,
        stack: &mut Stack,
        route: &Route,
        model: &mut RouteModel,
    ) -> Result<()> {
        let stack_id = stack.id().clone();
        let deleting = route.meta.deleting;
        let mut seen = BTreeSet::new();

        for backend in route.rules.iter().flat_map(|r| &r.backend_refs) {
            let key = Self::backend_key(route, backend);
            if !seen.insert(key.clone()) {
                continue;
            }
            let service = NamespacedName::new(route.backend_namespace(backend), backend.name.clone());

            let (name, port) = match backend.kind {
                BackendKind::ServiceImport => {
                    (target_group_name(&service.name, &service.namespace), backend.port.unwrap_or(0))
                }
                BackendKind::Service => {
                    let port = match backend.port {
                        Some(port) => port,
                        None => self.first_port(&service, deleting).await?,
                    };
                    (
                        backend_ref_target_group_name(&service.name, &service.namespace, &route.meta.name),
                        port,
                    )
                }
            };

            stack.add(TargetGroup::new(
                stack_id.clone(),
                key.to_string(),
                TargetGroupSpec {
                    name,
                    service_name: service.name.clone(),
                    service_namespace: service.namespace.clone(),
                    port,
                    protocol: "HTTP".to_string(),
                    protocol_version: route.kind.protocol_version().to_string(),
                    vpc_id: self.vpc_id.clone(),
                    reference: TargetGroupReference::BackendRef {
                        route_name: route.meta.name.clone(),
                        route_namespace: route.meta.namespace.clone(),
                    },
                    is_service_import: backend.kind == BackendKind::ServiceImport,
                    health_check: None,
                    is_deleted: deleting,
                },
            ))?;

            if backend.kind == BackendKind::ServiceImport {
                continue;
            }
            // a deleting route drains even when the ledger lost the group;
            // the target group stage recovers the entry first
            if !deleting && self.ledger.target_group(&key).is_none() {
                model.pending_targets.push(key);
                continue;
            }
            let targets = self
                .targets
                .targets(&stack_id, &service, &route.meta.name, backend.port, deleting)
                .await?;
            stack.add(targets)?;
        }
        Ok(())
    }

    async fn first_port(&self, service: &NamespacedName, deleting: bool) -> Result<u16> {
        let found = self.cluster.get_service(service).await?;
        match found.and_then(|svc| svc.ports.first().map(|p| p.port)) {
            Some(port) => Ok(port),
            // the port is not part of the remote name, any value finds the group
            None if deleting => Ok(0),
            None => Err(Error::MissingObject(format!("service {} or its ports", service))),
        }
    }
}
