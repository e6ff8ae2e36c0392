//! Remote control-plane capability

use crate::error::Result;
use crate::types::*;
use async_trait::async_trait;

/// Operations the reconciler needs from the service-mesh control plane
///
/// Implementations own transport, credentials and timeouts. Every method is
/// a single remote call; retries and state handling live in the managers.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait LatticeApi: Send + Sync {
    // service networks
    async fn list_service_networks(&self) -> Result<Vec<ServiceNetworkSummary>>;
    async fn create_service_network(
        &self,
        input: &CreateServiceNetworkInput,
    ) -> Result<ServiceNetworkSummary>;
    async fn delete_service_network(&self, id: &str) -> Result<()>;

    // services
    async fn list_services(&self) -> Result<Vec<ServiceSummary>>;
    async fn create_service(&self, input: &CreateServiceInput) -> Result<ServiceSummary>;
    async fn delete_service(&self, id: &str) -> Result<()>;

    // service <-> service network associations
    async fn list_associations(
        &self,
        input: &ListAssociationsInput,
    ) -> Result<Vec<AssociationSummary>>;
    async fn create_association(&self, input: &CreateAssociationInput)
    -> Result<AssociationSummary>;
    async fn delete_association(&self, id: &str) -> Result<()>;

    // listeners
    async fn list_listeners(&self, service_id: &str) -> Result<Vec<ListenerSummary>>;
    async fn create_listener(&self, input: &CreateListenerInput) -> Result<ListenerSummary>;
    async fn update_listener(&self, input: &UpdateListenerInput) -> Result<()>;
    async fn delete_listener(&self, service_id: &str, listener_id: &str) -> Result<()>;

    // rules
    async fn list_rules(&self, service_id: &str, listener_id: &str) -> Result<Vec<RuleSummary>>;
    async fn get_rule(
        &self,
        service_id: &str,
        listener_id: &str,
        rule_id: &str,
    ) -> Result<RuleDetail>;
    async fn create_rule(&self, input: &CreateRuleInput) -> Result<RuleSummary>;
    async fn update_rule(&self, input: &UpdateRuleInput) -> Result<()>;
    async fn delete_rule(&self, service_id: &str, listener_id: &str, rule_id: &str)
    -> Result<()>;

    // target groups
    async fn list_target_groups(
        &self,
        input: &ListTargetGroupsInput,
    ) -> Result<Vec<TargetGroupSummary>>;
    async fn get_target_group(&self, id: &str) -> Result<TargetGroupDetail>;
    async fn create_target_group(
        &self,
        input: &CreateTargetGroupInput,
    ) -> Result<TargetGroupSummary>;
    async fn update_target_group(&self, input: &UpdateTargetGroupInput) -> Result<()>;
    async fn delete_target_group(&self, id: &str) -> Result<()>;

    // targets
    async fn list_targets(&self, target_group_id: &str) -> Result<Vec<TargetSummary>>;
    async fn register_targets(
        &self,
        target_group_id: &str,
        targets: &[Target],
    ) -> Result<TargetsOutcome>;
    async fn deregister_targets(
        &self,
        target_group_id: &str,
        targets: &[Target],
    ) -> Result<TargetsOutcome>;

    // access log subscriptions
    async fn list_access_log_subscriptions(
        &self,
        resource_id: &str,
    ) -> Result<Vec<AccessLogSubscriptionSummary>>;
    async fn create_access_log_subscription(
        &self,
        input: &CreateAccessLogSubscriptionInput,
    ) -> Result<AccessLogSubscriptionSummary>;
    async fn update_access_log_subscription(
        &self,
        input: &UpdateAccessLogSubscriptionInput,
    ) -> Result<()>;
    async fn delete_access_log_subscription(&self, id: &str) -> Result<()>;

    // tagging
    async fn list_tags_for_resource(&self, arn: &str) -> Result<Tags>;
}
