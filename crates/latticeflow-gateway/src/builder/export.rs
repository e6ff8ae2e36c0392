use super::{BuildError, Built, BuildResult, TargetsBuilder};
use latticeflow_core::cluster::ServiceExport;
use latticeflow_core::naming::target_group_name;
use latticeflow_core::{
    ClusterReader, Error, Ledger, Stack, StackId, TargetGroup, TargetGroupKey,
    TargetGroupReference, TargetGroupSpec,
};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct ExportModel {
    pub target_group: TargetGroupKey,
    /// The ledger did not know the group yet, so no Targets were built
    pub targets_pending: bool,
}

/// Builds the exported target group of a service
pub struct ServiceExportBuilder {
    cluster: Arc<dyn ClusterReader>,
    ledger: Arc<Ledger>,
    vpc_id: String,
    targets: TargetsBuilder,
}

impl ServiceExportBuilder {
    pub fn new(cluster: Arc<dyn ClusterReader>, ledger: Arc<Ledger>, vpc_id: impl Into<String>) -> Self {
        Self {
            targets: TargetsBuilder::new(cluster.clone(), ledger.clone()),
            cluster,
            ledger,
            vpc_id: vpc_id.into(),
        }
    }

    pub async fn build(&self, export: &ServiceExport) -> BuildResult<ExportModel> {
        let service = export.meta.namespaced_name();
        let stack_id = StackId::from(&service);
        let mut stack = Stack::new(stack_id.clone());
        let deleting = export.meta.deleting;
        let key = TargetGroupKey::export(&service.name, &service.namespace);

        let port = match export.annotated_ports().first() {
            Some(port) => *port,
            None => {
                let found = self.cluster.get_service(&service).await?;
                match found.and_then(|svc| svc.ports.first().map(|p| p.port)) {
                    Some(port) => port,
                    None if deleting => 0,
                    None => {
                        return Err(Error::MissingObject(format!("service {} or its ports", service)).into());
                    }
                }
            }
        };

        stack.add(TargetGroup::new(
            stack_id.clone(),
            key.to_string(),
            TargetGroupSpec {
                name: target_group_name(&service.name, &service.namespace),
                service_name: service.name.clone(),
                service_namespace: service.namespace.clone(),
                port,
                protocol: "HTTP".to_string(),
                protocol_version: "HTTP1".to_string(),
                vpc_id: self.vpc_id.clone(),
                reference: TargetGroupReference::ServiceExport,
                is_service_import: false,
                health_check: None,
                is_deleted: deleting,
            },
        ))?;

        let mut model = ExportModel {
            target_group: key.clone(),
            targets_pending: false,
        };
        if !deleting && self.ledger.target_group(&key).is_none() {
            model.targets_pending = true;
            debug!(service = %service, "target group not in ledger yet");
            return Ok(Built { stack, model });
        }

        match self.targets.targets(&stack_id, &service, "", None, deleting).await {
            Ok(targets) => stack.add(targets)?,
            Err(e) => return Err(BuildError::partial(e, stack)),
        }
        Ok(Built { stack, model })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latticeflow_core::cluster::{
        ClusterService, EndpointPort, EndpointSubset, Endpoints, ObjectMeta, PORT_ANNOTATION,
        ServicePort,
    };
    use latticeflow_core::{InMemoryCluster, Referrer, RemoteIdentity, Targets};

    fn cluster() -> Arc<InMemoryCluster> {
        let cluster = Arc::new(InMemoryCluster::new());
        cluster.put_service(ClusterService {
            meta: ObjectMeta::new("store", "checkout"),
            ports: vec![ServicePort {
                name: "http".into(),
                port: 80,
                target_port: 8080,
            }],
        });
        cluster.put_endpoints(Endpoints {
            meta: ObjectMeta::new("store", "checkout"),
            subsets: vec![EndpointSubset {
                addresses: vec!["10.0.0.7".into()],
                ports: vec![EndpointPort {
                    name: "http".into(),
                    port: 8080,
                }],
            }],
        });
        cluster
    }

    fn export(port: Option<&str>) -> ServiceExport {
        let mut meta = ObjectMeta::new("store", "checkout");
        if let Some(port) = port {
            meta.annotations.insert(PORT_ANNOTATION.into(), port.into());
        }
        ServiceExport { meta }
    }

    #[tokio::test]
    async fn test_port_falls_back_to_first_service_port() {
        let built = ServiceExportBuilder::new(cluster(), Arc::new(Ledger::new()), "vpc-1")
            .build(&export(None))
            .await
            .unwrap();
        let tg = built.stack.list::<TargetGroup>()[0];
        assert_eq!(tg.spec.port, 80);
        assert_eq!(tg.spec.name, "k8s-checkout-store");
        assert!(built.model.targets_pending);
    }

    #[tokio::test]
    async fn test_annotation_port_wins() {
        let built = ServiceExportBuilder::new(cluster(), Arc::new(Ledger::new()), "vpc-1")
            .build(&export(Some("8443")))
            .await
            .unwrap();
        assert_eq!(built.stack.list::<TargetGroup>()[0].spec.port, 8443);
    }

    #[tokio::test]
    async fn test_known_group_gets_targets() {
        let ledger = Arc::new(Ledger::new());
        ledger.record_target_group(
            &TargetGroupKey::export("checkout", "store"),
            RemoteIdentity::new("arn:tg", "tg-1"),
            "vpc-1",
            Referrer::ServiceExport,
        );
        let built = ServiceExportBuilder::new(cluster(), ledger, "vpc-1")
            .build(&export(Some("80")))
            .await
            .unwrap();
        let targets = built.stack.list::<Targets>();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].spec.targets[0].id, "10.0.0.7");
        assert!(!built.model.targets_pending);
    }

    #[tokio::test]
    async fn test_deleting_export_drains_without_ledger_entry() {
        let mut deleting = export(Some("80"));
        deleting.meta.deleting = true;
        let built = ServiceExportBuilder::new(cluster(), Arc::new(Ledger::new()), "vpc-1")
            .build(&deleting)
            .await
            .unwrap();
        assert!(built.stack.list::<TargetGroup>()[0].spec.is_deleted);
        let targets = built.stack.list::<Targets>();
        assert_eq!(targets.len(), 1);
        assert!(targets[0].spec.targets.is_empty());
        assert!(!built.model.targets_pending);
    }

    #[tokio::test]
    async fn test_missing_service_fails_without_stack() {
        let err = ServiceExportBuilder::new(
            Arc::new(InMemoryCluster::new()),
            Arc::new(Ledger::new()),
            "vpc-1",
        )
        .build(&export(None))
        .await
        .unwrap_err();
        assert!(matches!(err.error, Error::MissingObject(_)));
        assert!(err.stack.is_none());
    }
}
