use super::{ResourceManager, checkpoint};
use async_trait::async_trait;
use latticeflow_cloud::cloud::{
    K8S_PARENT_REF_TYPE_KEY, K8S_SERVICE_NAMESPACE_KEY, K8S_SERVICE_NAME_KEY,
    PARENT_REF_SERVICE_EXPORT,
};
use latticeflow_cloud::{
    Cloud, CreateTargetGroupInput, HealthCheckConfig, LifecycleStatus, ListTargetGroupsInput,
    Matcher, Target, TargetGroupConfig, TargetGroupSummary, TargetStatus, TargetSummary, Tags,
    UpdateTargetGroupInput,
};
use latticeflow_core::{Error, Ledger, RemoteIdentity, Result, TargetGroup, TargetGroupSpec};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const IP_ADDRESS_TYPE: &str = "IPV4";

/// Health check applied when a target group does not configure one
///
/// HTTP/2 and gRPC targets rarely answer plain HTTP/1.1 probes, so checks
/// start disabled for them. gRPC health checks still use HTTP/1.1 semantics.
pub fn default_health_check(protocol_version: &str) -> HealthCheckConfig {
    let (enabled, hc_version) = match protocol_version {
        "HTTP2" => (false, "HTTP2"),
        "GRPC" => (false, "HTTP1"),
        _ => (true, "HTTP1"),
    };
    HealthCheckConfig {
        enabled: Some(enabled),
        protocol: Some("HTTP".to_string()),
        protocol_version: Some(hc_version.to_string()),
        path: Some("/".to_string()),
        port: None,
        matcher: Some(Matcher {
            http_code: "200".to_string(),
        }),
        interval_seconds: Some(0),
        timeout_seconds: Some(0),
        healthy_threshold_count: Some(0),
        unhealthy_threshold_count: Some(0),
    }
}

pub(crate) fn tag<'a>(tags: &'a Tags, key: &str) -> Option<&'a str> {
    tags.get(key).map(String::as_str)
}

/// A remote target group plus its tags; `tags` is `None` when the lookup failed
#[derive(Debug, Clone, PartialEq)]
pub struct TargetGroupWithTags {
    pub summary: TargetGroupSummary,
    pub tags: Option<Tags>,
}

pub struct TargetGroupManager {
    cloud: Cloud,
    ledger: Arc<Ledger>,
}

impl TargetGroupManager {
    pub fn new(cloud: Cloud, ledger: Arc<Ledger>) -> Self {
        Self { cloud, ledger }
    }

    async fn list_in_vpc(&self, cancel: &CancellationToken) -> Result<Vec<TargetGroupSummary>> {
        checkpoint(cancel)?;
        let vpc_id = &self.cloud.config().vpc_id;
        let input = ListTargetGroupsInput {
            vpc_identifier: Some(vpc_id.clone()),
        };
        let groups = self.cloud.api().list_target_groups(&input).await?;
        Ok(groups
            .into_iter()
            .filter(|tg| tg.vpc_identifier.as_deref() == Some(vpc_id.as_str()))
            .collect())
    }

    /// Managed target group with the spec's derived name, in this VPC
    pub async fn find(
        &self,
        cancel: &CancellationToken,
        spec: &TargetGroupSpec,
    ) -> Result<Option<TargetGroupSummary>> {
        let name = spec.remote_name();
        Ok(self
            .list_in_vpc(cancel)
            .await?
            .into_iter()
            .find(|tg| tg.name == name))
    }

    fn desired_health_check(spec: &TargetGroupSpec) -> HealthCheckConfig {
        spec.health_check
            .clone()
            .unwrap_or_else(|| default_health_check(&spec.protocol_version))
    }

    async fn create_remote(
        &self,
        cancel: &CancellationToken,
        spec: &TargetGroupSpec,
    ) -> Result<RemoteIdentity> {
        checkpoint(cancel)?;
        let input = CreateTargetGroupInput {
            name: spec.remote_name(),
            config: TargetGroupConfig {
                port: spec.port,
                protocol: spec.protocol.clone(),
                protocol_version: spec.protocol_version.clone(),
                vpc_identifier: self.cloud.config().vpc_id.clone(),
                ip_address_type: IP_ADDRESS_TYPE.to_string(),
                health_check: Some(Self::desired_health_check(spec)),
            },
            tags: self.cloud.merged_tags(&spec.identity_tags()),
        };
        info!(target_group = %input.name, "creating target group");
        let created = self.cloud.api().create_target_group(&input).await?;

        match created.status {
            LifecycleStatus::Active => Ok(RemoteIdentity::new(created.arn, created.id)),
            status => {
                debug!(target_group = %input.name, %status, "target group not active yet");
                Err(Error::retry(format!(
                    "target group {} is {} after create",
                    input.name, status
                )))
            }
        }
    }

    async fn reconcile_health_check(
        &self,
        cancel: &CancellationToken,
        spec: &TargetGroupSpec,
        existing: &TargetGroupSummary,
    ) -> Result<()> {
        checkpoint(cancel)?;
        let desired = Self::desired_health_check(spec);
        let detail = self.cloud.api().get_target_group(&existing.id).await?;
        let current = detail.config.and_then(|c| c.health_check);
        if current.as_ref() == Some(&desired) {
            return Ok(());
        }

        checkpoint(cancel)?;
        info!(target_group = %existing.name, "updating target group health check");
        self.cloud
            .api()
            .update_target_group(&UpdateTargetGroupInput {
                target_group_identifier: existing.id.clone(),
                health_check: desired,
            })
            .await?;
        Ok(())
    }

    /// Target group exported from another cluster for an imported service
    ///
    /// Imports are matched by identity tags rather than by name, since the
    /// exporting cluster may use a different VPC.
    pub async fn find_service_import(
        &self,
        cancel: &CancellationToken,
        spec: &TargetGroupSpec,
    ) -> Result<Option<TargetGroupSummary>> {
        checkpoint(cancel)?;
        let candidates = self
            .cloud
            .api()
            .list_target_groups(&ListTargetGroupsInput::default())
            .await?;
        for tg in candidates {
            if tg.status != LifecycleStatus::Active {
                continue;
            }
            checkpoint(cancel)?;
            let tags = match self.cloud.api().list_tags_for_resource(&tg.arn).await {
                Ok(tags) => tags,
                Err(e) => {
                    debug!(target_group = %tg.name, error = %e, "skipping import candidate without tags");
                    continue;
                }
            };
            if tag(&tags, K8S_SERVICE_NAME_KEY) == Some(spec.service_name.as_str())
                && tag(&tags, K8S_SERVICE_NAMESPACE_KEY) == Some(spec.service_namespace.as_str())
                && tag(&tags, K8S_PARENT_REF_TYPE_KEY) == Some(PARENT_REF_SERVICE_EXPORT)
            {
                return Ok(Some(tg));
            }
        }
        Ok(None)
    }

    /// Deregister every target that still takes traffic
    ///
    /// Targets already `Draining` or `Unused` are left to finish. Used for
    /// groups no stack carries any more, so no `Targets` resource drains them.
    pub async fn drain(&self, cancel: &CancellationToken, id: &str) -> Result<()> {
        checkpoint(cancel)?;
        let api = self.cloud.api();
        let listed = match api.list_targets(id).await {
            Ok(listed) => listed,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        let live: Vec<Target> = listed
            .iter()
            .filter(|t| !matches!(t.status, TargetStatus::Draining | TargetStatus::Unused))
            .map(TargetSummary::target)
            .collect();
        if live.is_empty() {
            return Ok(());
        }

        checkpoint(cancel)?;
        info!(target_group = %id, count = live.len(), "draining targets");
        let outcome = api.deregister_targets(id, &live).await?;
        if !outcome.unsuccessful.is_empty() {
            return Err(Error::retry(format!(
                "failed to drain {} targets from {}",
                outcome.unsuccessful.len(),
                id
            )));
        }
        Ok(())
    }

    /// Drain-then-delete by remote id
    ///
    /// Nothing is mutated while any target is outside `Unused`. The ledger
    /// entry is only dropped once the group is gone, so a failed pass
    /// resumes at the step that failed.
    pub async fn delete_by_id(&self, cancel: &CancellationToken, id: &str) -> Result<()> {
        checkpoint(cancel)?;
        let api = self.cloud.api();
        let targets = match api.list_targets(id).await {
            Ok(targets) => targets,
            Err(e) if e.is_not_found() => {
                debug!(target_group = %id, "target group already gone");
                self.ledger.remove_target_group_by_id(id);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(busy) = targets.iter().find(|t| t.status != TargetStatus::Unused) {
            debug!(target_group = %id, target = %busy.id, status = ?busy.status, "waiting for targets to drain");
            return Err(Error::retry(format!(
                "target group {} still has target {}:{} in {:?}",
                id, busy.id, busy.port, busy.status
            )));
        }

        if !targets.is_empty() {
            checkpoint(cancel)?;
            let members: Vec<_> = targets.iter().map(|t| t.target()).collect();
            info!(target_group = %id, count = members.len(), "deregistering targets");
            let outcome = api.deregister_targets(id, &members).await?;
            if !outcome.unsuccessful.is_empty() {
                return Err(Error::retry(format!(
                    "failed to deregister {} targets from {}",
                    outcome.unsuccessful.len(),
                    id
                )));
            }
        }

        checkpoint(cancel)?;
        info!(target_group = %id, "deleting target group");
        match api.delete_target_group(id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => debug!(target_group = %id, "target group already gone"),
            Err(e) => return Err(e.into()),
        }
        self.ledger.remove_target_group_by_id(id);
        Ok(())
    }
}

#[async_trait]
impl ResourceManager for TargetGroupManager {
    type Resource = TargetGroup;
    type Status = RemoteIdentity;
    type Summary = TargetGroupWithTags;
    type Scope = ();

    async fn create(&self, cancel: &CancellationToken, desired: &TargetGroup) -> Result<RemoteIdentity> {
        let spec = &desired.spec;
        let Some(existing) = self.find(cancel, spec).await? else {
            return self.create_remote(cancel, spec).await;
        };

        match existing.status {
            LifecycleStatus::Active => {
                self.reconcile_health_check(cancel, spec, &existing).await?;
                Ok(RemoteIdentity::new(existing.arn, existing.id))
            }
            LifecycleStatus::CreateFailed => {
                debug!(target_group = %existing.name, "previous create failed, creating again");
                self.create_remote(cancel, spec).await
            }
            status => {
                debug!(target_group = %existing.name, %status, "target group in transition");
                Err(Error::retry(format!(
                    "target group {} is {}",
                    existing.name, status
                )))
            }
        }
    }

    async fn update(&self, cancel: &CancellationToken, desired: &TargetGroup) -> Result<RemoteIdentity> {
        let spec = &desired.spec;
        match self.find(cancel, spec).await? {
            Some(existing) if existing.status == LifecycleStatus::Active => {
                self.reconcile_health_check(cancel, spec, &existing).await?;
                Ok(RemoteIdentity::new(existing.arn, existing.id))
            }
            Some(existing) => Err(Error::retry(format!(
                "target group {} is {}",
                existing.name, existing.status
            ))),
            None => Err(Error::retry(format!(
                "target group {} does not exist yet",
                spec.remote_name()
            ))),
        }
    }

    async fn delete(&self, cancel: &CancellationToken, existing: &TargetGroup) -> Result<()> {
        let key = existing.spec.ledger_key();
        let known_id = self
            .ledger
            .target_group(&key)
            .map(|e| e.id)
            .filter(|id| !id.is_empty());
        let id = match known_id {
            Some(id) => id,
            None => match self.find(cancel, &existing.spec).await? {
                Some(tg) => tg.id,
                None => {
                    self.ledger.remove_target_group(&key);
                    return Ok(());
                }
            },
        };
        self.delete_by_id(cancel, &id).await?;
        self.ledger.remove_target_group(&key);
        Ok(())
    }

    async fn get(
        &self,
        cancel: &CancellationToken,
        desired: &TargetGroup,
    ) -> Result<Option<RemoteIdentity>> {
        match self.find(cancel, &desired.spec).await? {
            Some(tg) if tg.status == LifecycleStatus::Active => {
                Ok(Some(RemoteIdentity::new(tg.arn, tg.id)))
            }
            Some(tg) if tg.status.is_transitional() => Err(Error::retry(format!(
                "target group {} is {}",
                tg.name, tg.status
            ))),
            _ => Ok(None),
        }
    }

    async fn list(&self, cancel: &CancellationToken, _scope: &()) -> Result<Vec<TargetGroupWithTags>> {
        let groups = self.list_in_vpc(cancel).await?;
        let mut out = Vec::with_capacity(groups.len());
        for summary in groups {
            checkpoint(cancel)?;
            let tags = match self.cloud.api().list_tags_for_resource(&summary.arn).await {
                Ok(tags) => Some(tags),
                Err(e) => {
                    warn!(target_group = %summary.name, error = %e, "failed to fetch tags");
                    None
                }
            };
            out.push(TargetGroupWithTags { summary, tags });
        }
        Ok(out)
    }
}
