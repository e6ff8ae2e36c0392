//! Cluster object shapes and the read-only accessor used by builders
//!
//! Only the fields the reconciler consumes are modelled; translating raw
//! API objects into these shapes happens at the edge.

use crate::error::Result;
use async_trait::async_trait;
use latticeflow_cloud::HttpMatch;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Annotation selecting which service ports an export publishes
pub const PORT_ANNOTATION: &str = "multicluster.x-k8s.io/port";
/// Annotation opting an export into this controller
pub const FEDERATION_ANNOTATION: &str = "multicluster.x-k8s.io/federation";
pub const FEDERATION_VALUE: &str = "amazon-vpc-lattice";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Set once a deletion timestamp is present
    #[serde(default)]
    pub deleting: bool,
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    pub fn namespaced_name(&self) -> NamespacedName {
        NamespacedName::new(&self.namespace, &self.name)
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePort {
    /// Empty when the service exposes a single unnamed port
    #[serde(default)]
    pub name: String,
    pub port: u16,
    pub target_port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterService {
    pub meta: ObjectMeta,
    pub ports: Vec<ServicePort>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointPort {
    #[serde(default)]
    pub name: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSubset {
    pub addresses: Vec<String>,
    pub ports: Vec<EndpointPort>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoints {
    pub meta: ObjectMeta,
    pub subsets: Vec<EndpointSubset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceExport {
    pub meta: ObjectMeta,
}

impl ServiceExport {
    pub fn is_federated(&self) -> bool {
        self.meta.annotation(FEDERATION_ANNOTATION) == Some(FEDERATION_VALUE)
    }

    /// Ports listed in the port annotation; unparsable entries are skipped
    pub fn annotated_ports(&self) -> Vec<u16> {
        let Some(raw) = self.meta.annotation(PORT_ANNOTATION) else {
            return Vec::new();
        };
        raw.split(',')
            .filter_map(|p| match p.trim().parse::<u16>() {
                Ok(port) => Some(port),
                Err(e) => {
                    tracing::warn!(export = %self.meta.namespaced_name(), value = %p, "bad port annotation: {}", e);
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteKind {
    Http,
    Grpc,
}

impl RouteKind {
    pub fn protocol_version(&self) -> &'static str {
        match self {
            Self::Http => "HTTP1",
            Self::Grpc => "GRPC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    Service,
    ServiceImport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendRef {
    pub name: String,
    /// Defaults to the route's namespace
    pub namespace: Option<String>,
    pub kind: BackendKind,
    pub port: Option<u16>,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentRef {
    pub name: String,
    pub namespace: Option<String>,
    pub section_name: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteRule {
    #[serde(default)]
    pub matches: Option<HttpMatch>,
    #[serde(default)]
    pub backend_refs: Vec<BackendRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub meta: ObjectMeta,
    pub kind: RouteKind,
    pub parent_refs: Vec<ParentRef>,
    #[serde(default)]
    pub hostnames: Vec<String>,
    pub rules: Vec<RouteRule>,
}

impl Route {
    pub fn backend_namespace<'a>(&'a self, backend: &'a BackendRef) -> &'a str {
        backend.namespace.as_deref().unwrap_or(&self.meta.namespace)
    }

    /// Whether any rule forwards to the given service
    pub fn references_service(&self, service: &NamespacedName) -> bool {
        self.rules.iter().flat_map(|r| &r.backend_refs).any(|b| {
            b.kind == BackendKind::Service
                && b.name == service.name
                && self.backend_namespace(b) == service.namespace
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayListener {
    pub name: String,
    pub port: u16,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gateway {
    pub meta: ObjectMeta,
    pub listeners: Vec<GatewayListener>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyTargetKind {
    Gateway,
    HttpRoute,
    GrpcRoute,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyTarget {
    pub kind: PolicyTargetKind,
    pub name: String,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessLogPolicy {
    pub meta: ObjectMeta,
    pub target: PolicyTarget,
    pub destination_arn: String,
}

/// Read-only view of cluster objects
///
/// `Ok(None)` means the object does not exist; errors are transport failures.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait ClusterReader: Send + Sync {
    async fn get_service(&self, name: &NamespacedName) -> Result<Option<ClusterService>>;
    async fn get_endpoints(&self, name: &NamespacedName) -> Result<Option<Endpoints>>;
    async fn get_service_export(&self, name: &NamespacedName) -> Result<Option<ServiceExport>>;
    async fn get_route(&self, kind: RouteKind, name: &NamespacedName) -> Result<Option<Route>>;
    async fn get_gateway(&self, name: &NamespacedName) -> Result<Option<Gateway>>;
}

#[cfg(any(test, feature = "test-utils"))]
pub use in_memory::InMemoryCluster;

#[cfg(any(test, feature = "test-utils"))]
mod in_memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::RwLock;

    /// Hash-map backed [`ClusterReader`] for tests
    #[derive(Default)]
    pub struct InMemoryCluster {
        services: RwLock<HashMap<NamespacedName, ClusterService>>,
        endpoints: RwLock<HashMap<NamespacedName, Endpoints>>,
        exports: RwLock<HashMap<NamespacedName, ServiceExport>>,
        routes: RwLock<HashMap<(RouteKind, NamespacedName), Route>>,
        gateways: RwLock<HashMap<NamespacedName, Gateway>>,
    }

    fn read<K: std::hash::Hash + Eq, V: Clone>(map: &RwLock<HashMap<K, V>>, key: &K) -> Option<V> {
        map.read().ok().and_then(|m| m.get(key).cloned())
    }

    fn write<K: std::hash::Hash + Eq, V>(map: &RwLock<HashMap<K, V>>, key: K, value: V) {
        if let Ok(mut m) = map.write() {
            m.insert(key, value);
        }
    }

    impl InMemoryCluster {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn put_service(&self, svc: ClusterService) {
            write(&self.services, svc.meta.namespaced_name(), svc);
        }

        pub fn put_endpoints(&self, eps: Endpoints) {
            write(&self.endpoints, eps.meta.namespaced_name(), eps);
        }

        pub fn put_service_export(&self, export: ServiceExport) {
            write(&self.exports, export.meta.namespaced_name(), export);
        }

        pub fn put_route(&self, route: Route) {
            write(&self.routes, (route.kind, route.meta.namespaced_name()), route);
        }

        pub fn put_gateway(&self, gw: Gateway) {
            write(&self.gateways, gw.meta.namespaced_name(), gw);
        }

        pub fn remove_route(&self, kind: RouteKind, name: &NamespacedName) {
            if let Ok(mut m) = self.routes.write() {
                m.remove(&(kind, name.clone()));
            }
        }
    }

    #[async_trait]
    impl ClusterReader for InMemoryCluster {
        async fn get_service(&self, name: &NamespacedName) -> Result<Option<ClusterService>> {
            Ok(read(&self.services, name))
        }

        async fn get_endpoints(&self, name: &NamespacedName) -> Result<Option<Endpoints>> {
            Ok(read(&self.endpoints, name))
        }

        async fn get_service_export(&self, name: &NamespacedName) -> Result<Option<ServiceExport>> {
            Ok(read(&self.exports, name))
        }

        async fn get_route(&self, kind: RouteKind, name: &NamespacedName) -> Result<Option<Route>> {
            Ok(read(&self.routes, &(kind, name.clone())))
        }

        async fn get_gateway(&self, name: &NamespacedName) -> Result<Option<Gateway>> {
            Ok(read(&self.gateways, name))
        }
    }
}
