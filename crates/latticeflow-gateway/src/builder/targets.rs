use super::{Built, BuildResult};
use latticeflow_cloud::Target;
use latticeflow_core::naming::target_group_name;
use latticeflow_core::{
    ClusterReader, Error, Ledger, NamespacedName, Result, Stack, StackId, TargetGroupKey, Targets,
    TargetsSpec,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Which target groups a targets-only pass covered
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetsModel {
    pub target_groups: Vec<TargetGroupKey>,
}

/// Builds desired target membership from a service's endpoints
pub struct TargetsBuilder {
    cluster: Arc<dyn ClusterReader>,
    ledger: Arc<Ledger>,
}

impl TargetsBuilder {
    pub fn new(cluster: Arc<dyn ClusterReader>, ledger: Arc<Ledger>) -> Self {
        Self { cluster, ledger }
    }

    /// One Targets resource for every target group the ledger knows for
    /// this service, across all routes and the export. Groups nothing
    /// references any more are left to the pass deleting them.
    pub async fn build(&self, service: &NamespacedName) -> BuildResult<TargetsModel> {
        let stack_id = StackId::from(service);
        let mut stack = Stack::new(stack_id.clone());
        let name = target_group_name(&service.name, &service.namespace);

        let mut keys: Vec<TargetGroupKey> = self
            .ledger
            .target_groups()
            .into_iter()
            .filter(|e| e.key.name == name && !e.key.is_import && !e.is_unreferenced())
            .map(|e| e.key)
            .collect();
        keys.sort();

        let mut model = TargetsModel::default();
        for key in keys {
            let built = self
                .targets(&stack_id, service, &key.route_name, None, false)
                .await;
            let targets = match built {
                Ok(targets) => targets,
                Err(e) => return Err(super::BuildError::partial(e, stack)),
            };
            stack.add(targets)?;
            model.target_groups.push(key);
        }
        Ok(Built { stack, model })
    }

    /// Desired members of one (service, route) target group.
    ///
    /// With several named service ports, only endpoint ports whose name
    /// matches a selected service port are kept. A single unnamed port, or
    /// no port selection at all, keeps every endpoint. `draining` forces an
    /// empty list so deletion flows through the normal path, whether or not
    /// the ledger knows the group.
    pub(crate) async fn targets(
        &self,
        stack_id: &StackId,
        service: &NamespacedName,
        route_name: &str,
        backend_port: Option<u16>,
        draining: bool,
    ) -> Result<Targets> {
        let key = TargetGroupKey {
            name: target_group_name(&service.name, &service.namespace),
            route_name: route_name.to_string(),
            is_import: false,
        };
        if draining {
            debug!(target_group = %key, "draining targets");
            return Ok(Self::resource(stack_id, service, route_name, Vec::new()));
        }
        let Some(entry) = self.ledger.target_group(&key) else {
            return Err(Error::Integrity(format!(
                "target group {} for service {} is not known yet",
                key, service
            )));
        };
        if entry.is_unreferenced() {
            return Err(Error::Integrity(format!(
                "target group {} for service {} is no longer referenced",
                key, service
            )));
        }

        let Some(svc) = self.cluster.get_service(service).await? else {
            return Err(Error::MissingObject(format!("service {}", service)));
        };

        let mut selected: BTreeSet<u16> = BTreeSet::new();
        if entry.by_service_export {
            match self.cluster.get_service_export(service).await? {
                Some(export) => selected.extend(export.annotated_ports()),
                None => warn!(service = %service, "service export not found, not filtering ports"),
            }
        } else if let Some(port) = backend_port {
            selected.insert(port);
        }

        let mut port_names: BTreeSet<&str> = BTreeSet::new();
        let mut match_all = selected.is_empty();
        for port in svc.ports.iter().filter(|p| selected.contains(&p.port)) {
            if port.name.is_empty() {
                match_all = true;
            } else {
                port_names.insert(port.name.as_str());
            }
        }

        let mut members = Vec::new();
        if !svc.meta.deleting {
            let Some(endpoints) = self.cluster.get_endpoints(service).await? else {
                return Err(Error::MissingObject(format!("endpoints {}", service)));
            };
            for subset in &endpoints.subsets {
                for address in &subset.addresses {
                    for port in &subset.ports {
                        // endpoint port names come from the service port
                        if match_all || port_names.contains(port.name.as_str()) {
                            members.push(Target {
                                id: address.clone(),
                                port: port.port,
                            });
                        }
                    }
                }
            }
        }
        debug!(target_group = %key, count = members.len(), "built targets");

        Ok(Self::resource(stack_id, service, route_name, members))
    }

    fn resource(
        stack_id: &StackId,
        service: &NamespacedName,
        route_name: &str,
        targets: Vec<Target>,
    ) -> Targets {
        let spec = TargetsSpec {
            service_name: service.name.clone(),
            service_namespace: service.namespace.clone(),
            route_name: route_name.to_string(),
            targets,
        };
        Targets::new(stack_id.clone(), spec.target_group_key().to_string(), spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latticeflow_core::cluster::{
        ClusterService, EndpointPort, EndpointSubset, Endpoints, ObjectMeta, ServiceExport,
        ServicePort, PORT_ANNOTATION,
    };
    use latticeflow_core::{InMemoryCluster, Referrer, RemoteIdentity};

    fn svc_name() -> NamespacedName {
        NamespacedName::new("store", "checkout")
    }

    fn cluster(ports: &[(&str, u16)]) -> Arc<InMemoryCluster> {
        let cluster = Arc::new(InMemoryCluster::new());
        cluster.put_service(ClusterService {
            meta: ObjectMeta::new("store", "checkout"),
            ports: ports
                .iter()
                .map(|(name, port)| ServicePort {
                    name: name.to_string(),
                    port: *port,
                    target_port: port + 8000,
                })
                .collect(),
        });
        cluster.put_endpoints(Endpoints {
            meta: ObjectMeta::new("store", "checkout"),
            subsets: vec![EndpointSubset {
                addresses: vec!["10.0.0.1".into(), "10.0.0.2".into()],
                ports: ports
                    .iter()
                    .map(|(name, port)| EndpointPort {
                        name: name.to_string(),
                        port: port + 8000,
                    })
                    .collect(),
            }],
        });
        cluster
    }

    fn ledger(route: &str, referrer: Referrer) -> Arc<Ledger> {
        let ledger = Arc::new(Ledger::new());
        let key = if route.is_empty() {
            TargetGroupKey::export("checkout", "store")
        } else {
            TargetGroupKey::backend_ref("checkout", "store", route)
        };
        ledger.record_target_group(&key, RemoteIdentity::new("arn:tg", "tg-1"), "vpc-1", referrer);
        ledger
    }

    fn ids(targets: &Targets) -> Vec<(String, u16)> {
        targets.spec.targets.iter().map(|t| (t.id.clone(), t.port)).collect()
    }

    #[tokio::test]
    async fn test_backend_port_selects_named_port() {
        let builder = TargetsBuilder::new(
            cluster(&[("http", 80), ("admin", 9000)]),
            ledger("web", Referrer::BackendRef),
        );
        let targets = builder
            .targets(&StackId::new("store/web"), &svc_name(), "web", Some(80), false)
            .await
            .unwrap();
        assert_eq!(
            ids(&targets),
            vec![("10.0.0.1".to_string(), 8080), ("10.0.0.2".to_string(), 8080)]
        );
    }

    #[tokio::test]
    async fn test_no_port_selection_keeps_everything() {
        let builder = TargetsBuilder::new(
            cluster(&[("http", 80), ("admin", 9000)]),
            ledger("web", Referrer::BackendRef),
        );
        let targets = builder
            .targets(&StackId::new("store/web"), &svc_name(), "web", None, false)
            .await
            .unwrap();
        assert_eq!(targets.spec.targets.len(), 4);
    }

    #[tokio::test]
    async fn test_single_unnamed_port_keeps_everything() {
        let builder = TargetsBuilder::new(cluster(&[("", 80)]), ledger("web", Referrer::BackendRef));
        let targets = builder
            .targets(&StackId::new("store/web"), &svc_name(), "web", Some(80), false)
            .await
            .unwrap();
        assert_eq!(targets.spec.targets.len(), 2);
    }

    #[tokio::test]
    async fn test_export_annotation_selects_ports() {
        let cluster = cluster(&[("http", 80), ("admin", 9000)]);
        let mut meta = ObjectMeta::new("store", "checkout");
        meta.annotations.insert(PORT_ANNOTATION.into(), "9000".into());
        cluster.put_service_export(ServiceExport { meta });

        let builder = TargetsBuilder::new(cluster, ledger("", Referrer::ServiceExport));
        let targets = builder
            .targets(&StackId::new("store/checkout"), &svc_name(), "", None, false)
            .await
            .unwrap();
        assert!(targets.spec.targets.iter().all(|t| t.port == 17000));
        assert_eq!(targets.spec.targets.len(), 2);
    }

    #[tokio::test]
    async fn test_draining_builds_empty_list() {
        let builder = TargetsBuilder::new(cluster(&[("", 80)]), ledger("web", Referrer::BackendRef));
        let targets = builder
            .targets(&StackId::new("store/web"), &svc_name(), "web", None, true)
            .await
            .unwrap();
        assert!(targets.spec.targets.is_empty());

        let empty = TargetsBuilder::new(cluster(&[("", 80)]), Arc::new(Ledger::new()));
        let targets = empty
            .targets(&StackId::new("store/web"), &svc_name(), "web", None, true)
            .await
            .unwrap();
        assert!(targets.spec.targets.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_target_group_is_integrity_error() {
        let builder = TargetsBuilder::new(cluster(&[("", 80)]), Arc::new(Ledger::new()));
        let err = builder
            .targets(&StackId::new("store/web"), &svc_name(), "web", None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
    }

    #[tokio::test]
    async fn test_build_covers_every_known_route() {
        let ledger = ledger("web", Referrer::BackendRef);
        ledger.record_target_group(
            &TargetGroupKey::backend_ref("checkout", "store", "api"),
            RemoteIdentity::new("arn:tg-2", "tg-2"),
            "vpc-1",
            Referrer::BackendRef,
        );
        let builder = TargetsBuilder::new(cluster(&[("", 80)]), ledger);
        let built = builder.build(&svc_name()).await.unwrap();
        assert_eq!(built.stack.list::<Targets>().len(), 2);
        assert_eq!(built.model.target_groups[0].route_name, "api");
    }

    #[tokio::test]
    async fn test_build_skips_released_groups() {
        let ledger = ledger("web", Referrer::BackendRef);
        let api_key = TargetGroupKey::backend_ref("checkout", "store", "api");
        ledger.record_target_group(&api_key, RemoteIdentity::new("arn:tg-2", "tg-2"), "vpc-1", Referrer::BackendRef);
        ledger.release_target_group(&api_key, Referrer::BackendRef);

        let built = TargetsBuilder::new(cluster(&[("", 80)]), ledger)
            .build(&svc_name())
            .await
            .unwrap();
        assert_eq!(built.model.target_groups, vec![TargetGroupKey::backend_ref("checkout", "store", "web")]);
    }
}
