use super::{ResourceManager, checkpoint, lookup_service};
use async_trait::async_trait;
use latticeflow_cloud::{
    Cloud, CreateRuleInput, RuleAction, RuleSummary, UpdateRuleInput, WeightedTargetGroup,
};
use latticeflow_core::{Error, Ledger, ListenerKey, Result, Rule, RuleSpecAction, RuleStatus};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Parent of a rule listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerScope {
    pub service_id: String,
    pub listener_id: String,
}

pub struct RuleManager {
    cloud: Cloud,
    ledger: Arc<Ledger>,
}

impl RuleManager {
    pub fn new(cloud: Cloud, ledger: Arc<Ledger>) -> Self {
        Self { cloud, ledger }
    }

    /// Service and listener ids for a rule, or `None` when either is absent
    async fn scope_of(&self, cancel: &CancellationToken, rule: &Rule) -> Result<Option<ListenerScope>> {
        let Some(service) = lookup_service(&self.cloud, &self.ledger, cancel, &rule.spec.service_name()).await?
        else {
            return Ok(None);
        };

        let key = ListenerKey {
            service_name: service.name.clone(),
            port: rule.spec.listener_port,
            protocol: rule.spec.listener_protocol.clone(),
        };
        if let Some(entry) = self.ledger.listener(&key) {
            return Ok(Some(ListenerScope {
                service_id: entry.service_id,
                listener_id: entry.id,
            }));
        }

        checkpoint(cancel)?;
        let listener = self
            .cloud
            .api()
            .list_listeners(&service.id)
            .await?
            .into_iter()
            .find(|l| l.port == rule.spec.listener_port);
        Ok(listener.map(|l| ListenerScope {
            service_id: service.id,
            listener_id: l.id,
        }))
    }

    /// Translate target group keys into remote ids
    fn remote_action(&self, rule: &Rule) -> Result<RuleAction> {
        match &rule.spec.action {
            RuleSpecAction::FixedResponse(status_code) => Ok(RuleAction::FixedResponse {
                status_code: *status_code,
            }),
            RuleSpecAction::Forward(targets) => {
                let target_groups = targets
                    .iter()
                    .map(|t| match self.ledger.target_group(&t.target_group) {
                        Some(entry) if !entry.id.is_empty() => Ok(WeightedTargetGroup {
                            target_group_identifier: entry.id,
                            weight: t.weight,
                        }),
                        _ => Err(Error::retry(format!(
                            "target group {} for rule {} is not known yet",
                            t.target_group,
                            rule.spec.remote_name()
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(RuleAction::Forward { target_groups })
            }
        }
    }

    async fn find(&self, cancel: &CancellationToken, scope: &ListenerScope, name: &str) -> Result<Option<RuleSummary>> {
        Ok(self
            .list(cancel, scope)
            .await?
            .into_iter()
            .find(|r| !r.is_default && r.name == name))
    }

    /// Remove a rule by id; used when pruning rules no route declares
    pub async fn delete_remote(&self, cancel: &CancellationToken, scope: &ListenerScope, rule_id: &str) -> Result<()> {
        checkpoint(cancel)?;
        info!(listener_id = %scope.listener_id, rule_id = %rule_id, "deleting rule");
        match self
            .cloud
            .api()
            .delete_rule(&scope.service_id, &scope.listener_id, rule_id)
            .await
        {
            Err(e) if !e.is_not_found() => Err(e.into()),
            _ => Ok(()),
        }
    }
}

fn status_of(summary: &RuleSummary, scope: &ListenerScope) -> RuleStatus {
    RuleStatus {
        arn: summary.arn.clone(),
        id: summary.id.clone(),
        listener_id: scope.listener_id.clone(),
        service_id: scope.service_id.clone(),
    }
}

#[async_trait]
impl ResourceManager for RuleManager {
    type Resource = Rule;
    type Status = RuleStatus;
    type Summary = RuleSummary;
    type Scope = ListenerScope;

    async fn create(&self, cancel: &CancellationToken, desired: &Rule) -> Result<RuleStatus> {
        let name = desired.spec.remote_name();
        let Some(scope) = self.scope_of(cancel, desired).await? else {
            return Err(Error::retry(format!(
                "listener {} for rule {} is not known yet",
                desired.spec.listener_name(),
                name
            )));
        };
        let action = self.remote_action(desired)?;

        if let Some(existing) = self.find(cancel, &scope, &name).await? {
            checkpoint(cancel)?;
            let detail = self
                .cloud
                .api()
                .get_rule(&scope.service_id, &scope.listener_id, &existing.id)
                .await?;
            let drifted = detail.priority != desired.spec.priority
                || detail.http_match != desired.spec.http_match
                || detail.action != action;
            if drifted {
                checkpoint(cancel)?;
                info!(rule = %name, listener_id = %scope.listener_id, "updating rule");
                self.cloud
                    .api()
                    .update_rule(&UpdateRuleInput {
                        service_identifier: scope.service_id.clone(),
                        listener_identifier: scope.listener_id.clone(),
                        rule_identifier: existing.id.clone(),
                        priority: desired.spec.priority,
                        http_match: desired.spec.http_match.clone(),
                        action,
                    })
                    .await?;
            } else {
                debug!(rule = %name, "rule up to date");
            }
            return Ok(status_of(&existing, &scope));
        }

        checkpoint(cancel)?;
        info!(rule = %name, listener_id = %scope.listener_id, priority = desired.spec.priority, "creating rule");
        let created = self
            .cloud
            .api()
            .create_rule(&CreateRuleInput {
                service_identifier: scope.service_id.clone(),
                listener_identifier: scope.listener_id.clone(),
                name,
                priority: desired.spec.priority,
                http_match: desired.spec.http_match.clone(),
                action,
                tags: self.cloud.default_tags(),
            })
            .await?;
        Ok(status_of(&created, &scope))
    }

    async fn update(&self, cancel: &CancellationToken, desired: &Rule) -> Result<RuleStatus> {
        self.create(cancel, desired).await
    }

    async fn delete(&self, cancel: &CancellationToken, existing: &Rule) -> Result<()> {
        let Some(scope) = self.scope_of(cancel, existing).await? else {
            return Ok(());
        };
        match self.find(cancel, &scope, &existing.spec.remote_name()).await? {
            Some(rule) => self.delete_remote(cancel, &scope, &rule.id).await,
            None => Ok(()),
        }
    }

    async fn get(&self, cancel: &CancellationToken, desired: &Rule) -> Result<Option<RuleStatus>> {
        let Some(scope) = self.scope_of(cancel, desired).await? else {
            return Ok(None);
        };
        Ok(self
            .find(cancel, &scope, &desired.spec.remote_name())
            .await?
            .map(|r| status_of(&r, &scope)))
    }

    async fn list(&self, cancel: &CancellationToken, scope: &ListenerScope) -> Result<Vec<RuleSummary>> {
        checkpoint(cancel)?;
        Ok(self
            .cloud
            .api()
            .list_rules(&scope.service_id, &scope.listener_id)
            .await?)
    }
}
