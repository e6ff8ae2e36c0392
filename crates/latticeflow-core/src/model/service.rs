use super::meta::{RemoteIdentity, ResourceKind, ResourceMeta, StackId, Status};
use super::naming;
use super::target_group::TargetGroupKey;
use crate::cluster::RouteKind;
use latticeflow_cloud::{HttpMatch, RuleAction};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceNetworkSpec {
    pub name: String,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceNetwork {
    pub meta: ResourceMeta,
    pub spec: ServiceNetworkSpec,
    pub status: Status<RemoteIdentity>,
}

impl ServiceNetwork {
    pub fn new(stack_id: StackId, id: impl Into<String>, spec: ServiceNetworkSpec) -> Self {
        Self {
            meta: ResourceMeta::new(stack_id, ResourceKind::ServiceNetwork, id),
            spec,
            status: Status::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub route_name: String,
    pub route_namespace: String,
    pub route_kind: RouteKind,
    /// Networks the service must be associated with
    pub service_networks: Vec<String>,
    pub custom_domain_name: Option<String>,
    pub is_deleted: bool,
}

impl ServiceSpec {
    pub fn remote_name(&self) -> String {
        naming::service_name(&self.route_name, &self.route_namespace)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub arn: String,
    pub id: String,
    pub dns: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Service {
    pub meta: ResourceMeta,
    pub spec: ServiceSpec,
    pub status: Status<ServiceStatus>,
}

impl Service {
    pub fn new(stack_id: StackId, id: impl Into<String>, spec: ServiceSpec) -> Self {
        Self {
            meta: ResourceMeta::new(stack_id, ResourceKind::Service, id),
            spec,
            status: Status::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerSpec {
    pub route_name: String,
    pub route_namespace: String,
    pub port: u16,
    pub protocol: String,
    pub default_action: RuleAction,
}

impl ListenerSpec {
    pub fn remote_name(&self) -> String {
        naming::listener_name(&self.route_name, &self.route_namespace, self.port, &self.protocol)
    }

    pub fn service_name(&self) -> String {
        naming::service_name(&self.route_name, &self.route_namespace)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerStatus {
    pub arn: String,
    pub id: String,
    pub service_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Listener {
    pub meta: ResourceMeta,
    pub spec: ListenerSpec,
    pub status: Status<ListenerStatus>,
}

impl Listener {
    pub fn new(stack_id: StackId, id: impl Into<String>, spec: ListenerSpec) -> Self {
        Self {
            meta: ResourceMeta::new(stack_id, ResourceKind::Listener, id),
            spec,
            status: Status::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTarget {
    pub target_group: TargetGroupKey,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleSpecAction {
    Forward(Vec<RuleTarget>),
    FixedResponse(u16),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub route_name: String,
    pub route_namespace: String,
    pub listener_port: u16,
    pub listener_protocol: String,
    pub priority: u32,
    pub http_match: HttpMatch,
    pub action: RuleSpecAction,
}

impl RuleSpec {
    pub fn remote_name(&self) -> String {
        naming::rule_name(self.priority)
    }

    pub fn service_name(&self) -> String {
        naming::service_name(&self.route_name, &self.route_namespace)
    }

    pub fn listener_name(&self) -> String {
        naming::listener_name(
            &self.route_name,
            &self.route_namespace,
            self.listener_port,
            &self.listener_protocol,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleStatus {
    pub arn: String,
    pub id: String,
    pub listener_id: String,
    pub service_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Rule {
    pub meta: ResourceMeta,
    pub spec: RuleSpec,
    pub status: Status<RuleStatus>,
}

impl Rule {
    pub fn new(stack_id: StackId, id: impl Into<String>, spec: RuleSpec) -> Self {
        Self {
            meta: ResourceMeta::new(stack_id, ResourceKind::Rule, id),
            spec,
            status: Status::default(),
        }
    }
}
