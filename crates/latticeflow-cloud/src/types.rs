//! Wire shapes exchanged with the remote control plane
//!
//! These mirror the request/response structures of the service-mesh API
//! closely enough that an SDK adapter is a field-by-field mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resource tags; ordered so that comparisons and logs are stable
pub type Tags = BTreeMap<String, String>;

/// Remote provisioning state shared by target groups, services and
/// service-network associations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStatus {
    CreateInProgress,
    Active,
    CreateFailed,
    DeleteInProgress,
    DeleteFailed,
}

impl LifecycleStatus {
    /// A resource in one of these states must not be mutated
    pub fn is_transitional(&self) -> bool {
        matches!(self, Self::CreateInProgress | Self::DeleteInProgress)
    }
}

impl std::fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CreateInProgress => "CREATE_IN_PROGRESS",
            Self::Active => "ACTIVE",
            Self::CreateFailed => "CREATE_FAILED",
            Self::DeleteInProgress => "DELETE_IN_PROGRESS",
            Self::DeleteFailed => "DELETE_FAILED",
        };
        write!(f, "{}", s)
    }
}

/// Registration state of a single target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetStatus {
    Draining,
    Unavailable,
    Healthy,
    Unhealthy,
    Initial,
    Unused,
}

// ---------------------------------------------------------------------------
// Target groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetGroupSummary {
    pub id: String,
    pub arn: String,
    pub name: String,
    pub vpc_identifier: Option<String>,
    pub port: Option<u16>,
    pub protocol: Option<String>,
    pub status: LifecycleStatus,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matcher {
    pub http_code: String,
}

/// Health check settings; `None` and zero values mean "remote default"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    pub enabled: Option<bool>,
    pub protocol: Option<String>,
    pub protocol_version: Option<String>,
    pub path: Option<String>,
    pub port: Option<u16>,
    pub matcher: Option<Matcher>,
    pub interval_seconds: Option<u32>,
    pub timeout_seconds: Option<u32>,
    pub healthy_threshold_count: Option<u32>,
    pub unhealthy_threshold_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetGroupConfig {
    pub port: u16,
    pub protocol: String,
    pub protocol_version: String,
    pub vpc_identifier: String,
    pub ip_address_type: String,
    pub health_check: Option<HealthCheckConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTargetGroupInput {
    pub name: String,
    pub config: TargetGroupConfig,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetGroupDetail {
    pub summary: TargetGroupSummary,
    pub config: Option<TargetGroupConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateTargetGroupInput {
    pub target_group_identifier: String,
    pub health_check: HealthCheckConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListTargetGroupsInput {
    pub vpc_identifier: Option<String>,
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSummary {
    pub id: String,
    pub port: u16,
    pub status: TargetStatus,
}

impl TargetSummary {
    pub fn target(&self) -> Target {
        Target {
            id: self.id.clone(),
            port: self.port,
        }
    }
}

/// An entry the remote side refused to (de)register
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetFailure {
    pub id: String,
    pub port: u16,
    pub failure_code: String,
    pub failure_message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetsOutcome {
    pub successful: Vec<Target>,
    pub unsuccessful: Vec<TargetFailure>,
}

// ---------------------------------------------------------------------------
// Service networks, services and their associations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceNetworkSummary {
    pub id: String,
    pub arn: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateServiceNetworkInput {
    pub name: String,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsEntry {
    pub domain_name: String,
    pub hosted_zone_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub id: String,
    pub arn: String,
    pub name: String,
    pub status: LifecycleStatus,
    pub dns_entry: Option<DnsEntry>,
    pub custom_domain_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateServiceInput {
    pub name: String,
    pub custom_domain_name: Option<String>,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationSummary {
    pub id: String,
    pub arn: String,
    pub service_id: String,
    pub service_network_id: String,
    pub service_network_name: String,
    pub status: LifecycleStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListAssociationsInput {
    pub service_identifier: Option<String>,
    pub service_network_identifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAssociationInput {
    pub service_identifier: String,
    pub service_network_identifier: String,
    pub tags: Tags,
}

// ---------------------------------------------------------------------------
// Listeners and rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedTargetGroup {
    pub target_group_identifier: String,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    FixedResponse { status_code: u16 },
    Forward { target_groups: Vec<WeightedTargetGroup> },
}

impl RuleAction {
    pub fn not_found() -> Self {
        Self::FixedResponse { status_code: 404 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerSummary {
    pub id: String,
    pub arn: String,
    pub name: String,
    pub port: u16,
    pub protocol: String,
    pub default_action: RuleAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateListenerInput {
    pub service_identifier: String,
    pub name: String,
    pub port: u16,
    pub protocol: String,
    pub default_action: RuleAction,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateListenerInput {
    pub service_identifier: String,
    pub listener_identifier: String,
    pub default_action: RuleAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathMatchKind {
    Exact,
    Prefix,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMatch {
    pub kind: PathMatchKind,
    pub value: String,
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMatch {
    pub name: String,
    pub exact: String,
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpMatch {
    pub method: Option<String>,
    pub path_match: Option<PathMatch>,
    pub header_matches: Vec<HeaderMatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSummary {
    pub id: String,
    pub arn: String,
    pub name: String,
    pub priority: u32,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDetail {
    pub id: String,
    pub arn: String,
    pub name: String,
    pub priority: u32,
    pub http_match: HttpMatch,
    pub action: RuleAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRuleInput {
    pub service_identifier: String,
    pub listener_identifier: String,
    pub name: String,
    pub priority: u32,
    pub http_match: HttpMatch,
    pub action: RuleAction,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRuleInput {
    pub service_identifier: String,
    pub listener_identifier: String,
    pub rule_identifier: String,
    pub priority: u32,
    pub http_match: HttpMatch,
    pub action: RuleAction,
}

// ---------------------------------------------------------------------------
// Access logs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessLogSubscriptionSummary {
    pub id: String,
    pub arn: String,
    pub resource_id: String,
    pub resource_arn: String,
    pub destination_arn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAccessLogSubscriptionInput {
    pub resource_identifier: String,
    pub destination_arn: String,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateAccessLogSubscriptionInput {
    pub access_log_subscription_identifier: String,
    pub destination_arn: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitional_states() {
        assert!(LifecycleStatus::CreateInProgress.is_transitional());
        assert!(LifecycleStatus::DeleteInProgress.is_transitional());
        assert!(!LifecycleStatus::Active.is_transitional());
        assert!(!LifecycleStatus::CreateFailed.is_transitional());
        assert!(!LifecycleStatus::DeleteFailed.is_transitional());
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&LifecycleStatus::CreateInProgress).unwrap();
        assert_eq!(json, "\"CREATE_IN_PROGRESS\"");
        assert_eq!(LifecycleStatus::CreateInProgress.to_string(), "CREATE_IN_PROGRESS");

        let status: TargetStatus = serde_json::from_str("\"UNUSED\"").unwrap();
        assert_eq!(status, TargetStatus::Unused);
    }

    #[test]
    fn test_rule_action_tagging() {
        let json = serde_json::to_value(RuleAction::not_found()).unwrap();
        assert_eq!(json["type"], "fixed_response");
        assert_eq!(json["status_code"], 404);
    }
}
