use super::{ResourceManager, checkpoint};
use async_trait::async_trait;
use latticeflow_cloud::{Cloud, Target, TargetStatus, TargetSummary};
use latticeflow_core::{Error, Ledger, Result, TargetGroupEntry, Targets};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Keeps a target group's registered members equal to the desired set
pub struct TargetsManager {
    cloud: Cloud,
    ledger: Arc<Ledger>,
}

impl TargetsManager {
    pub fn new(cloud: Cloud, ledger: Arc<Ledger>) -> Self {
        Self { cloud, ledger }
    }

    fn owning_group(&self, targets: &Targets) -> Result<TargetGroupEntry> {
        let key = targets.spec.target_group_key();
        match self.ledger.target_group(&key) {
            Some(entry) if !entry.id.is_empty() => Ok(entry),
            _ => {
                debug!(target_group = %key, "target group not reconciled yet");
                Err(Error::retry(format!(
                    "target group {} is not known yet",
                    key
                )))
            }
        }
    }

    async fn register(&self, cancel: &CancellationToken, tg_id: &str, targets: &[Target]) -> Result<()> {
        if targets.is_empty() {
            return Ok(());
        }
        checkpoint(cancel)?;
        info!(target_group = %tg_id, count = targets.len(), "registering targets");
        let outcome = self.cloud.api().register_targets(tg_id, targets).await?;
        if !outcome.unsuccessful.is_empty() {
            return Err(Error::retry(format!(
                "failed to register {} targets with {}",
                outcome.unsuccessful.len(),
                tg_id
            )));
        }
        Ok(())
    }

    async fn deregister(&self, cancel: &CancellationToken, tg_id: &str, targets: &[Target]) -> Result<()> {
        if targets.is_empty() {
            return Ok(());
        }
        checkpoint(cancel)?;
        info!(target_group = %tg_id, count = targets.len(), "deregistering targets");
        let outcome = self.cloud.api().deregister_targets(tg_id, targets).await?;
        if !outcome.unsuccessful.is_empty() {
            return Err(Error::retry(format!(
                "failed to deregister {} targets from {}",
                outcome.unsuccessful.len(),
                tg_id
            )));
        }
        Ok(())
    }
}

/// Registered members that are not already on their way out
fn live_members(listed: &[TargetSummary]) -> BTreeSet<Target> {
    listed
        .iter()
        .filter(|t| t.status != TargetStatus::Draining)
        .map(TargetSummary::target)
        .collect()
}

/// Only `create` is driven by a synthesizer: an empty desired list is how
/// membership is removed. `delete` and `get` act on the ledger's group the
/// same way for direct callers.
#[async_trait]
impl ResourceManager for TargetsManager {
    type Resource = Targets;
    type Status = Vec<Target>;
    type Summary = TargetSummary;
    type Scope = str;

    async fn create(&self, cancel: &CancellationToken, desired: &Targets) -> Result<Vec<Target>> {
        if desired.spec.targets.is_empty() && self.ledger.target_group(&desired.spec.target_group_key()).is_none() {
            // nothing known to drain; the group is gone or was never created
            debug!(target_group = %desired.spec.target_group_key(), "no target group to drain");
            return Ok(Vec::new());
        }
        let group = self.owning_group(desired)?;
        let listed = self.list(cancel, &group.id).await?;
        let present = live_members(&listed);
        let wanted: BTreeSet<Target> = desired.spec.targets.iter().cloned().collect();

        let to_register: Vec<Target> = wanted.difference(&present).cloned().collect();
        let to_deregister: Vec<Target> = present.difference(&wanted).cloned().collect();

        self.register(cancel, &group.id, &to_register).await?;
        self.deregister(cancel, &group.id, &to_deregister).await?;

        let members: Vec<Target> = wanted.into_iter().collect();
        self.ledger.set_targets(&group.key, members.clone());
        Ok(members)
    }

    async fn update(&self, cancel: &CancellationToken, desired: &Targets) -> Result<Vec<Target>> {
        self.create(cancel, desired).await
    }

    async fn delete(&self, cancel: &CancellationToken, existing: &Targets) -> Result<()> {
        let key = existing.spec.target_group_key();
        let Some(group) = self.ledger.target_group(&key).filter(|e| !e.id.is_empty()) else {
            return Ok(());
        };
        let listed = match self.list(cancel, &group.id).await {
            Ok(listed) => listed,
            Err(Error::Remote(e)) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };
        let members: Vec<Target> = live_members(&listed).into_iter().collect();
        self.deregister(cancel, &group.id, &members).await?;
        self.ledger.set_targets(&key, Vec::new());
        Ok(())
    }

    async fn get(&self, cancel: &CancellationToken, desired: &Targets) -> Result<Option<Vec<Target>>> {
        let key = desired.spec.target_group_key();
        let Some(group) = self.ledger.target_group(&key).filter(|e| !e.id.is_empty()) else {
            return Ok(None);
        };
        let listed = self.list(cancel, &group.id).await?;
        Ok(Some(live_members(&listed).into_iter().collect()))
    }

    async fn list(&self, cancel: &CancellationToken, target_group_id: &str) -> Result<Vec<TargetSummary>> {
        checkpoint(cancel)?;
        Ok(self.cloud.api().list_targets(target_group_id).await?)
    }
}
