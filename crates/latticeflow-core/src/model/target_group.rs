use super::meta::{RemoteIdentity, ResourceKind, ResourceMeta, StackId, Status};
use super::naming;
use latticeflow_cloud::cloud::{
    K8S_PARENT_REF_TYPE_KEY, K8S_ROUTE_NAMESPACE_KEY, K8S_ROUTE_NAME_KEY,
    K8S_SERVICE_NAMESPACE_KEY, K8S_SERVICE_NAME_KEY, PARENT_REF_HTTP_ROUTE,
    PARENT_REF_SERVICE_EXPORT,
};
use latticeflow_cloud::{HealthCheckConfig, Tags, Target};
use serde::{Deserialize, Serialize};

/// Ledger key for a target group
///
/// `name` is always the service-derived name; backend-ref groups are told
/// apart by `route_name` so one service can back several routes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetGroupKey {
    pub name: String,
    pub route_name: String,
    pub is_import: bool,
}

impl TargetGroupKey {
    pub fn export(service: &str, namespace: &str) -> Self {
        Self {
            name: naming::target_group_name(service, namespace),
            route_name: String::new(),
            is_import: false,
        }
    }

    pub fn import(service: &str, namespace: &str) -> Self {
        Self {
            name: naming::target_group_name(service, namespace),
            route_name: String::new(),
            is_import: true,
        }
    }

    pub fn backend_ref(service: &str, namespace: &str, route: &str) -> Self {
        Self {
            name: naming::target_group_name(service, namespace),
            route_name: route.to_string(),
            is_import: false,
        }
    }

    /// Ledger lock key shared by every pass that touches this group
    pub fn lock_key(&self) -> String {
        format!("target-group:{}", self)
    }
}

impl std::fmt::Display for TargetGroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.route_name.is_empty() {
            write!(f, "@{}", self.route_name)?;
        }
        if self.is_import {
            write!(f, " (import)")?;
        }
        Ok(())
    }
}

/// How the target group came to be wanted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetGroupReference {
    BackendRef {
        route_name: String,
        route_namespace: String,
    },
    ServiceExport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetGroupSpec {
    /// Logical name, see [`naming::target_group_name`]
    pub name: String,
    pub service_name: String,
    pub service_namespace: String,
    pub port: u16,
    pub protocol: String,
    /// `HTTP1`, `HTTP2`, `GRPC`, or empty for the remote default
    pub protocol_version: String,
    pub vpc_id: String,
    pub reference: TargetGroupReference,
    /// Imports live in another cluster; they are looked up, never created
    pub is_service_import: bool,
    pub health_check: Option<HealthCheckConfig>,
    pub is_deleted: bool,
}

impl TargetGroupSpec {
    pub fn remote_name(&self) -> String {
        naming::target_group_remote_name(&self.name, &self.protocol, &self.protocol_version)
    }

    pub fn ledger_key(&self) -> TargetGroupKey {
        if self.is_service_import {
            return TargetGroupKey::import(&self.service_name, &self.service_namespace);
        }
        match &self.reference {
            TargetGroupReference::BackendRef { route_name, .. } => {
                TargetGroupKey::backend_ref(&self.service_name, &self.service_namespace, route_name)
            }
            TargetGroupReference::ServiceExport => {
                TargetGroupKey::export(&self.service_name, &self.service_namespace)
            }
        }
    }

    pub fn is_backend_ref(&self) -> bool {
        matches!(self.reference, TargetGroupReference::BackendRef { .. })
    }

    /// Cluster identity tags written on create; GC rebuilds ledger keys from them
    pub fn identity_tags(&self) -> Tags {
        let mut tags = Tags::new();
        tags.insert(K8S_SERVICE_NAME_KEY.to_string(), self.service_name.clone());
        tags.insert(
            K8S_SERVICE_NAMESPACE_KEY.to_string(),
            self.service_namespace.clone(),
        );
        match &self.reference {
            TargetGroupReference::ServiceExport => {
                tags.insert(
                    K8S_PARENT_REF_TYPE_KEY.to_string(),
                    PARENT_REF_SERVICE_EXPORT.to_string(),
                );
            }
            TargetGroupReference::BackendRef {
                route_name,
                route_namespace,
            } => {
                tags.insert(
                    K8S_PARENT_REF_TYPE_KEY.to_string(),
                    PARENT_REF_HTTP_ROUTE.to_string(),
                );
                tags.insert(K8S_ROUTE_NAME_KEY.to_string(), route_name.clone());
                tags.insert(K8S_ROUTE_NAMESPACE_KEY.to_string(), route_namespace.clone());
            }
        }
        tags
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetGroup {
    pub meta: ResourceMeta,
    pub spec: TargetGroupSpec,
    pub status: Status<RemoteIdentity>,
}

impl TargetGroup {
    pub fn new(stack_id: StackId, id: impl Into<String>, spec: TargetGroupSpec) -> Self {
        Self {
            meta: ResourceMeta::new(stack_id, ResourceKind::TargetGroup, id),
            spec,
            status: Status::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetsSpec {
    pub service_name: String,
    pub service_namespace: String,
    /// Empty for export-owned groups
    pub route_name: String,
    pub targets: Vec<Target>,
}

impl TargetsSpec {
    pub fn target_group_key(&self) -> TargetGroupKey {
        TargetGroupKey {
            name: naming::target_group_name(&self.service_name, &self.service_namespace),
            route_name: self.route_name.clone(),
            is_import: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Targets {
    pub meta: ResourceMeta,
    pub spec: TargetsSpec,
}

impl Targets {
    pub fn new(stack_id: StackId, id: impl Into<String>, spec: TargetsSpec) -> Self {
        Self {
            meta: ResourceMeta::new(stack_id, ResourceKind::Targets, id),
            spec,
        }
    }
}
