//! In-memory control plane and cluster fixtures shared by the pipeline tests

#![allow(dead_code)]

use async_trait::async_trait;
use latticeflow_cloud::{
    AccessLogSubscriptionSummary, AssociationSummary, Cloud, CloudConfig,
    CreateAccessLogSubscriptionInput, CreateAssociationInput, CreateListenerInput,
    CreateRuleInput, CreateServiceInput, CreateServiceNetworkInput, CreateTargetGroupInput,
    LatticeApi, LatticeError, LifecycleStatus, ListAssociationsInput, ListTargetGroupsInput,
    ListenerSummary, Result, RuleDetail, RuleSummary, ServiceNetworkSummary,
    ServiceSummary, Tags, Target, TargetGroupConfig, TargetGroupDetail, TargetGroupSummary,
    TargetStatus, TargetSummary, TargetsOutcome, UpdateAccessLogSubscriptionInput,
    UpdateListenerInput, UpdateRuleInput, UpdateTargetGroupInput,
};
use latticeflow_core::cluster::{
    BackendKind, BackendRef, ClusterService, EndpointPort, EndpointSubset, Endpoints,
    FEDERATION_ANNOTATION, FEDERATION_VALUE, Gateway, GatewayListener, ObjectMeta, ParentRef,
    Route, RouteKind, RouteRule, ServiceExport, ServicePort,
};
use latticeflow_core::{InMemoryCluster, Ledger, NamespacedName};
use latticeflow_gateway::{Controller, EventRecorder, EventType};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub const VPC_ID: &str = "vpc-0a1b2c";

pub fn cloud_config() -> CloudConfig {
    CloudConfig {
        vpc_id: VPC_ID.to_string(),
        account_id: "111122223333".to_string(),
        region: "us-west-2".to_string(),
        cluster_name: "integration".to_string(),
    }
}

pub fn cloud(api: Arc<FakeLattice>) -> Cloud {
    Cloud::new(cloud_config(), api)
}

#[derive(Debug, Clone)]
struct FakeListener {
    summary: ListenerSummary,
    service_id: String,
}

#[derive(Debug, Clone)]
struct FakeRule {
    detail: RuleDetail,
    listener_id: String,
    is_default: bool,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    networks: Vec<ServiceNetworkSummary>,
    services: Vec<ServiceSummary>,
    associations: Vec<AssociationSummary>,
    listeners: Vec<FakeListener>,
    rules: Vec<FakeRule>,
    target_groups: Vec<TargetGroupDetail>,
    targets: BTreeMap<String, Vec<TargetSummary>>,
    subscriptions: Vec<AccessLogSubscriptionSummary>,
    tags: BTreeMap<String, Tags>,
    mutations: BTreeMap<&'static str, usize>,
}

impl State {
    fn next(&mut self, prefix: &str) -> (String, String) {
        self.next_id += 1;
        let id = format!("{}-{:04}", prefix, self.next_id);
        let arn = format!("arn:aws:vpc-lattice:us-west-2:111122223333:{}/{}", prefix, id);
        (id, arn)
    }

    fn mutated(&mut self, op: &'static str) {
        *self.mutations.entry(op).or_default() += 1;
    }
}

/// A control plane that applies every call immediately and counts mutations
#[derive(Debug, Default)]
pub struct FakeLattice {
    state: Mutex<State>,
}

impl FakeLattice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn mutation_count(&self) -> usize {
        self.state.lock().unwrap().mutations.values().sum()
    }

    pub fn mutations_of(&self, op: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .mutations
            .get(op)
            .copied()
            .unwrap_or(0)
    }

    pub fn service_names(&self) -> Vec<String> {
        self.state.lock().unwrap().services.iter().map(|s| s.name.clone()).collect()
    }

    pub fn listener_ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self
            .state
            .lock()
            .unwrap()
            .listeners
            .iter()
            .map(|l| l.summary.port)
            .collect();
        ports.sort();
        ports
    }

    pub fn rule_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .lock()
            .unwrap()
            .rules
            .iter()
            .filter(|r| !r.is_default)
            .map(|r| r.detail.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn target_group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .lock()
            .unwrap()
            .target_groups
            .iter()
            .map(|tg| tg.summary.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn targets_of(&self, target_group_name: &str) -> Vec<Target> {
        let state = self.state.lock().unwrap();
        let Some(tg) = state
            .target_groups
            .iter()
            .find(|tg| tg.summary.name == target_group_name)
        else {
            return Vec::new();
        };
        let mut targets: Vec<Target> = state
            .targets
            .get(&tg.summary.id)
            .map(|t| t.iter().map(TargetSummary::target).collect())
            .unwrap_or_default();
        targets.sort();
        targets
    }

    pub fn association_count(&self) -> usize {
        self.state.lock().unwrap().associations.len()
    }

    pub fn subscription_destinations(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .map(|s| s.destination_arn.clone())
            .collect()
    }

    /// Put every registered target of a group into `status`
    pub fn set_target_status(&self, target_group_name: &str, status: TargetStatus) {
        let mut state = self.state.lock().unwrap();
        let Some(id) = state
            .target_groups
            .iter()
            .find(|tg| tg.summary.name == target_group_name)
            .map(|tg| tg.summary.id.clone())
        else {
            return;
        };
        for target in state.targets.entry(id).or_default() {
            target.status = status;
        }
    }

    /// Seed a target group created by someone else
    pub fn seed_foreign_target_group(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        let (id, arn) = state.next("tg");
        state.target_groups.push(TargetGroupDetail {
            summary: TargetGroupSummary {
                id,
                arn: arn.clone(),
                name: name.to_string(),
                vpc_identifier: Some(VPC_ID.to_string()),
                port: Some(80),
                protocol: Some("HTTP".to_string()),
                status: LifecycleStatus::Active,
                created_at: None,
            },
            config: None,
        });
        state.tags.insert(arn, Tags::new());
    }
}

fn not_found(what: &str, id: &str) -> LatticeError {
    LatticeError::NotFound(format!("{} {}", what, id))
}

#[async_trait]
impl LatticeApi for FakeLattice {
    async fn list_service_networks(&self) -> Result<Vec<ServiceNetworkSummary>> {
        Ok(self.state.lock().unwrap().networks.clone())
    }

    async fn create_service_network(
        &self,
        input: &CreateServiceNetworkInput,
    ) -> Result<ServiceNetworkSummary> {
        let mut state = self.state.lock().unwrap();
        state.mutated("create_service_network");
        let (id, arn) = state.next("sn");
        let summary = ServiceNetworkSummary {
            id,
            arn: arn.clone(),
            name: input.name.clone(),
        };
        state.networks.push(summary.clone());
        state.tags.insert(arn, input.tags.clone());
        Ok(summary)
    }

    async fn delete_service_network(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.mutated("delete_service_network");
        if state.associations.iter().any(|a| a.service_network_id == id) {
            return Err(LatticeError::Conflict(format!("service network {} has associations", id)));
        }
        let before = state.networks.len();
        state.networks.retain(|n| n.id != id);
        if state.networks.len() == before {
            return Err(not_found("service network", id));
        }
        Ok(())
    }

    async fn list_services(&self) -> Result<Vec<ServiceSummary>> {
        Ok(self.state.lock().unwrap().services.clone())
    }

    async fn create_service(&self, input: &CreateServiceInput) -> Result<ServiceSummary> {
        let mut state = self.state.lock().unwrap();
        state.mutated("create_service");
        let (id, arn) = state.next("svc");
        let summary = ServiceSummary {
            id,
            arn: arn.clone(),
            name: input.name.clone(),
            status: LifecycleStatus::Active,
            dns_entry: None,
            custom_domain_name: input.custom_domain_name.clone(),
        };
        state.services.push(summary.clone());
        state.tags.insert(arn, input.tags.clone());
        Ok(summary)
    }

    async fn delete_service(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.mutated("delete_service");
        let before = state.services.len();
        state.services.retain(|s| s.id != id);
        if state.services.len() == before {
            return Err(not_found("service", id));
        }
        let listener_ids: Vec<String> = state
            .listeners
            .iter()
            .filter(|l| l.service_id == id)
            .map(|l| l.summary.id.clone())
            .collect();
        state.listeners.retain(|l| l.service_id != id);
        state.rules.retain(|r| !listener_ids.contains(&r.listener_id));
        Ok(())
    }

    async fn list_associations(&self, input: &ListAssociationsInput) -> Result<Vec<AssociationSummary>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .associations
            .iter()
            .filter(|a| {
                input.service_identifier.as_ref().is_none_or(|s| *s == a.service_id)
                    && input
                        .service_network_identifier
                        .as_ref()
                        .is_none_or(|n| *n == a.service_network_id)
            })
            .cloned()
            .collect())
    }

    async fn create_association(&self, input: &CreateAssociationInput) -> Result<AssociationSummary> {
        let mut state = self.state.lock().unwrap();
        state.mutated("create_association");
        let Some(network) = state
            .networks
            .iter()
            .find(|n| n.id == input.service_network_identifier)
            .cloned()
        else {
            return Err(not_found("service network", &input.service_network_identifier));
        };
        let (id, arn) = state.next("snsa");
        let summary = AssociationSummary {
            id,
            arn: arn.clone(),
            service_id: input.service_identifier.clone(),
            service_network_id: network.id,
            service_network_name: network.name,
            status: LifecycleStatus::Active,
        };
        state.associations.push(summary.clone());
        state.tags.insert(arn, input.tags.clone());
        Ok(summary)
    }

    async fn delete_association(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.mutated("delete_association");
        let before = state.associations.len();
        state.associations.retain(|a| a.id != id);
        if state.associations.len() == before {
            return Err(not_found("association", id));
        }
        Ok(())
    }

    async fn list_listeners(&self, service_id: &str) -> Result<Vec<ListenerSummary>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .listeners
            .iter()
            .filter(|l| l.service_id == service_id)
            .map(|l| l.summary.clone())
            .collect())
    }

    async fn create_listener(&self, input: &CreateListenerInput) -> Result<ListenerSummary> {
        let mut state = self.state.lock().unwrap();
        state.mutated("create_listener");
        let (id, arn) = state.next("listener");
        let summary = ListenerSummary {
            id: id.clone(),
            arn: arn.clone(),
            name: input.name.clone(),
            port: input.port,
            protocol: input.protocol.clone(),
            default_action: input.default_action.clone(),
        };
        state.listeners.push(FakeListener {
            summary: summary.clone(),
            service_id: input.service_identifier.clone(),
        });
        let (rule_id, rule_arn) = state.next("rule");
        state.rules.push(FakeRule {
            detail: RuleDetail {
                id: rule_id,
                arn: rule_arn,
                name: "default".to_string(),
                priority: 0,
                http_match: Default::default(),
                action: input.default_action.clone(),
            },
            listener_id: id,
            is_default: true,
        });
        state.tags.insert(arn, input.tags.clone());
        Ok(summary)
    }

    async fn update_listener(&self, input: &UpdateListenerInput) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.mutated("update_listener");
        let Some(listener) = state
            .listeners
            .iter_mut()
            .find(|l| l.summary.id == input.listener_identifier)
        else {
            return Err(not_found("listener", &input.listener_identifier));
        };
        listener.summary.default_action = input.default_action.clone();
        Ok(())
    }

    async fn delete_listener(&self, _service_id: &str, listener_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.mutated("delete_listener");
        let before = state.listeners.len();
        state.listeners.retain(|l| l.summary.id != listener_id);
        if state.listeners.len() == before {
            return Err(not_found("listener", listener_id));
        }
        state.rules.retain(|r| r.listener_id != listener_id);
        Ok(())
    }

    async fn list_rules(&self, _service_id: &str, listener_id: &str) -> Result<Vec<RuleSummary>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .rules
            .iter()
            .filter(|r| r.listener_id == listener_id)
            .map(|r| RuleSummary {
                id: r.detail.id.clone(),
                arn: r.detail.arn.clone(),
                name: r.detail.name.clone(),
                priority: r.detail.priority,
                is_default: r.is_default,
            })
            .collect())
    }

    async fn get_rule(&self, _service_id: &str, listener_id: &str, rule_id: &str) -> Result<RuleDetail> {
        self.state
            .lock()
            .unwrap()
            .rules
            .iter()
            .find(|r| r.listener_id == listener_id && r.detail.id == rule_id)
            .map(|r| r.detail.clone())
            .ok_or_else(|| not_found("rule", rule_id))
    }

    async fn create_rule(&self, input: &CreateRuleInput) -> Result<RuleSummary> {
        let mut state = self.state.lock().unwrap();
        state.mutated("create_rule");
        let (id, arn) = state.next("rule");
        state.rules.push(FakeRule {
            detail: RuleDetail {
                id: id.clone(),
                arn: arn.clone(),
                name: input.name.clone(),
                priority: input.priority,
                http_match: input.http_match.clone(),
                action: input.action.clone(),
            },
            listener_id: input.listener_identifier.clone(),
            is_default: false,
        });
        state.tags.insert(arn.clone(), input.tags.clone());
        Ok(RuleSummary {
            id,
            arn,
            name: input.name.clone(),
            priority: input.priority,
            is_default: false,
        })
    }

    async fn update_rule(&self, input: &UpdateRuleInput) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.mutated("update_rule");
        let Some(rule) = state
            .rules
            .iter_mut()
            .find(|r| r.detail.id == input.rule_identifier)
        else {
            return Err(not_found("rule", &input.rule_identifier));
        };
        rule.detail.priority = input.priority;
        rule.detail.http_match = input.http_match.clone();
        rule.detail.action = input.action.clone();
        Ok(())
    }

    async fn delete_rule(&self, _service_id: &str, _listener_id: &str, rule_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.mutated("delete_rule");
        let before = state.rules.len();
        state.rules.retain(|r| r.detail.id != rule_id);
        if state.rules.len() == before {
            return Err(not_found("rule", rule_id));
        }
        Ok(())
    }

    async fn list_target_groups(&self, input: &ListTargetGroupsInput) -> Result<Vec<TargetGroupSummary>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .target_groups
            .iter()
            .filter(|tg| {
                input
                    .vpc_identifier
                    .as_ref()
                    .is_none_or(|vpc| tg.summary.vpc_identifier.as_ref() == Some(vpc))
            })
            .map(|tg| tg.summary.clone())
            .collect())
    }

    async fn get_target_group(&self, id: &str) -> Result<TargetGroupDetail> {
        self.state
            .lock()
            .unwrap()
            .target_groups
            .iter()
            .find(|tg| tg.summary.id == id)
            .cloned()
            .ok_or_else(|| not_found("target group", id))
    }

    async fn create_target_group(&self, input: &CreateTargetGroupInput) -> Result<TargetGroupSummary> {
        let mut state = self.state.lock().unwrap();
        state.mutated("create_target_group");
        let (id, arn) = state.next("tg");
        let summary = TargetGroupSummary {
            id,
            arn: arn.clone(),
            name: input.name.clone(),
            vpc_identifier: Some(input.config.vpc_identifier.clone()),
            port: Some(input.config.port),
            protocol: Some(input.config.protocol.clone()),
            status: LifecycleStatus::Active,
            created_at: None,
        };
        state.target_groups.push(TargetGroupDetail {
            summary: summary.clone(),
            config: Some(TargetGroupConfig {
                port: input.config.port,
                protocol: input.config.protocol.clone(),
                protocol_version: input.config.protocol_version.clone(),
                vpc_identifier: input.config.vpc_identifier.clone(),
                ip_address_type: input.config.ip_address_type.clone(),
                health_check: input.config.health_check.clone(),
            }),
        });
        state.tags.insert(arn, input.tags.clone());
        Ok(summary)
    }

    async fn update_target_group(&self, input: &UpdateTargetGroupInput) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.mutated("update_target_group");
        let Some(tg) = state
            .target_groups
            .iter_mut()
            .find(|tg| tg.summary.id == input.target_group_identifier)
        else {
            return Err(not_found("target group", &input.target_group_identifier));
        };
        if let Some(config) = tg.config.as_mut() {
            config.health_check = Some(input.health_check.clone());
        }
        Ok(())
    }

    async fn delete_target_group(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.mutated("delete_target_group");
        if state.targets.get(id).is_some_and(|t| !t.is_empty()) {
            return Err(LatticeError::Conflict(format!("target group {} has targets", id)));
        }
        let before = state.target_groups.len();
        state.target_groups.retain(|tg| tg.summary.id != id);
        if state.target_groups.len() == before {
            return Err(not_found("target group", id));
        }
        state.targets.remove(id);
        Ok(())
    }

    async fn list_targets(&self, target_group_id: &str) -> Result<Vec<TargetSummary>> {
        let state = self.state.lock().unwrap();
        if !state.target_groups.iter().any(|tg| tg.summary.id == target_group_id) {
            return Err(not_found("target group", target_group_id));
        }
        Ok(state.targets.get(target_group_id).cloned().unwrap_or_default())
    }

    async fn register_targets(&self, target_group_id: &str, targets: &[Target]) -> Result<TargetsOutcome> {
        let mut state = self.state.lock().unwrap();
        state.mutated("register_targets");
        let registered = state.targets.entry(target_group_id.to_string()).or_default();
        for target in targets {
            if !registered.iter().any(|t| t.target() == *target) {
                registered.push(TargetSummary {
                    id: target.id.clone(),
                    port: target.port,
                    status: TargetStatus::Healthy,
                });
            }
        }
        Ok(TargetsOutcome {
            successful: targets.to_vec(),
            unsuccessful: Vec::new(),
        })
    }

    async fn deregister_targets(&self, target_group_id: &str, targets: &[Target]) -> Result<TargetsOutcome> {
        let mut state = self.state.lock().unwrap();
        state.mutated("deregister_targets");
        if let Some(registered) = state.targets.get_mut(target_group_id) {
            registered.retain(|t| !targets.contains(&t.target()));
        }
        Ok(TargetsOutcome {
            successful: targets.to_vec(),
            unsuccessful: Vec::new(),
        })
    }

    async fn list_access_log_subscriptions(&self, resource_id: &str) -> Result<Vec<AccessLogSubscriptionSummary>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .filter(|s| s.resource_id == resource_id)
            .cloned()
            .collect())
    }

    async fn create_access_log_subscription(
        &self,
        input: &CreateAccessLogSubscriptionInput,
    ) -> Result<AccessLogSubscriptionSummary> {
        let mut state = self.state.lock().unwrap();
        state.mutated("create_access_log_subscription");
        let (id, arn) = state.next("als");
        let summary = AccessLogSubscriptionSummary {
            id,
            arn: arn.clone(),
            resource_id: input.resource_identifier.clone(),
            resource_arn: String::new(),
            destination_arn: input.destination_arn.clone(),
        };
        state.subscriptions.push(summary.clone());
        state.tags.insert(arn, input.tags.clone());
        Ok(summary)
    }

    async fn update_access_log_subscription(&self, input: &UpdateAccessLogSubscriptionInput) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.mutated("update_access_log_subscription");
        let Some(subscription) = state
            .subscriptions
            .iter_mut()
            .find(|s| s.id == input.access_log_subscription_identifier)
        else {
            return Err(not_found("access log subscription", &input.access_log_subscription_identifier));
        };
        subscription.destination_arn = input.destination_arn.clone();
        Ok(())
    }

    async fn delete_access_log_subscription(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.mutated("delete_access_log_subscription");
        let before = state.subscriptions.len();
        state.subscriptions.retain(|s| s.id != id);
        if state.subscriptions.len() == before {
            return Err(not_found("access log subscription", id));
        }
        Ok(())
    }

    async fn list_tags_for_resource(&self, arn: &str) -> Result<Tags> {
        self.state
            .lock()
            .unwrap()
            .tags
            .get(arn)
            .cloned()
            .ok_or_else(|| not_found("resource", arn))
    }
}

// ---------------------------------------------------------------------------
// Cluster fixtures
// ---------------------------------------------------------------------------

pub fn gateway(ports: &[u16]) -> Gateway {
    Gateway {
        meta: ObjectMeta::new("infra", "mesh"),
        listeners: ports
            .iter()
            .map(|port| GatewayListener {
                name: format!("listener-{}", port),
                port: *port,
                protocol: "HTTP".to_string(),
            })
            .collect(),
    }
}

pub fn service(namespace: &str, name: &str, port: u16, addresses: &[&str]) -> (ClusterService, Endpoints) {
    (
        ClusterService {
            meta: ObjectMeta::new(namespace, name),
            ports: vec![ServicePort {
                name: String::new(),
                port,
                target_port: port + 8000,
            }],
        },
        Endpoints {
            meta: ObjectMeta::new(namespace, name),
            subsets: vec![EndpointSubset {
                addresses: addresses.iter().map(|a| a.to_string()).collect(),
                ports: vec![EndpointPort {
                    name: String::new(),
                    port: port + 8000,
                }],
            }],
        },
    )
}

pub fn route(namespace: &str, name: &str, backends: &[&str]) -> Route {
    Route {
        meta: ObjectMeta::new(namespace, name),
        kind: RouteKind::Http,
        parent_refs: vec![ParentRef {
            name: "mesh".to_string(),
            namespace: Some("infra".to_string()),
            section_name: None,
            port: None,
        }],
        hostnames: Vec::new(),
        rules: backends
            .iter()
            .map(|backend| RouteRule {
                matches: None,
                backend_refs: vec![BackendRef {
                    name: backend.to_string(),
                    namespace: None,
                    kind: BackendKind::Service,
                    port: Some(80),
                    weight: 1,
                }],
            })
            .collect(),
    }
}

pub fn federated_export(namespace: &str, name: &str) -> ServiceExport {
    let mut meta = ObjectMeta::new(namespace, name);
    meta.annotations
        .insert(FEDERATION_ANNOTATION.to_string(), FEDERATION_VALUE.to_string());
    ServiceExport { meta }
}

/// A cluster holding the mesh gateway and a `checkout` service in `store`
pub fn cluster_with_checkout(addresses: &[&str]) -> Arc<InMemoryCluster> {
    let cluster = Arc::new(InMemoryCluster::new());
    cluster.put_gateway(gateway(&[80]));
    let (svc, eps) = service("store", "checkout", 80, addresses);
    cluster.put_service(svc);
    cluster.put_endpoints(eps);
    cluster
}

/// Event recorder that keeps `(reason, message)` pairs for assertions
#[derive(Debug, Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<(String, String)>>,
}

impl RecordingEvents {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reasons(&self) -> Vec<String> {
        self.events.lock().unwrap().iter().map(|(r, _)| r.clone()).collect()
    }
}

impl EventRecorder for RecordingEvents {
    fn record(
        &self,
        _kind: &str,
        _object: &NamespacedName,
        _event_type: EventType,
        reason: &str,
        message: &str,
    ) {
        self.events
            .lock()
            .unwrap()
            .push((reason.to_string(), message.to_string()));
    }
}

pub fn controller(
    api: &Arc<FakeLattice>,
    cluster: &Arc<InMemoryCluster>,
    events: &Arc<RecordingEvents>,
) -> Controller {
    Controller::new(
        cloud(api.clone()),
        cluster.clone(),
        Arc::new(Ledger::new()),
        events.clone(),
    )
}
