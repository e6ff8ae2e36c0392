use crate::managers::{ResourceManager, TargetGroupManager, TargetGroupWithTags};
use latticeflow_cloud::Cloud;
use latticeflow_cloud::cloud::{
    K8S_PARENT_REF_TYPE_KEY, K8S_ROUTE_NAMESPACE_KEY, K8S_ROUTE_NAME_KEY,
    K8S_SERVICE_NAMESPACE_KEY, K8S_SERVICE_NAME_KEY, PARENT_REF_HTTP_ROUTE,
    PARENT_REF_SERVICE_EXPORT,
};
use latticeflow_core::cluster::RouteKind;
use latticeflow_core::{
    ClusterReader, Error, Ledger, NamespacedName, Referrer, RemoteIdentity, Result, Stack,
    TargetGroup, TargetGroupEntry, TargetGroupKey, TargetGroupSpec,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

fn referrer_of(spec: &TargetGroupSpec) -> Referrer {
    if spec.is_backend_ref() || spec.is_service_import {
        Referrer::BackendRef
    } else {
        Referrer::ServiceExport
    }
}

/// Creates target groups on the way in; deletes released ones and sweeps
/// orphans on the way out
pub struct TargetGroupSynthesizer {
    cloud: Cloud,
    ledger: Arc<Ledger>,
    manager: TargetGroupManager,
    cluster: Option<Arc<dyn ClusterReader>>,
}

impl TargetGroupSynthesizer {
    pub fn new(cloud: Cloud, ledger: Arc<Ledger>) -> Self {
        Self {
            manager: TargetGroupManager::new(cloud.clone(), ledger.clone()),
            cloud,
            ledger,
            cluster: None,
        }
    }

    /// Enable the orphan sweep; the cluster reader repairs ledger misses
    pub fn with_gc(mut self, cluster: Arc<dyn ClusterReader>) -> Self {
        self.cluster = Some(cluster);
        self
    }

    pub async fn synthesize(&self, cancel: &CancellationToken, stack: &Stack) -> Result<()> {
        for tg in stack.list::<TargetGroup>() {
            let key = tg.spec.ledger_key();
            let referrer = referrer_of(&tg.spec);
            let _guard = self.ledger.lock(&key.lock_key()).await;

            if tg.spec.is_deleted {
                match self.ledger.release_target_group(&key, referrer) {
                    Some(entry) => {
                        debug!(target_group = %key, unreferenced = entry.is_unreferenced(), "released target group");
                    }
                    None if !tg.spec.is_service_import => self.recover_entry(cancel, tg).await?,
                    None => {}
                }
                continue;
            }

            if tg.spec.is_service_import {
                let Some(found) = self.manager.find_service_import(cancel, &tg.spec).await? else {
                    return Err(Error::retry(format!(
                        "no exported target group found for {}/{}",
                        tg.spec.service_namespace, tg.spec.service_name
                    )));
                };
                let identity = RemoteIdentity::new(&found.arn, &found.id);
                let vpc_id = found.vpc_identifier.unwrap_or_default();
                self.ledger.record_target_group(&key, identity.clone(), &vpc_id, referrer);
                tg.status.set(identity);
                continue;
            }

            let identity = self.manager.create(cancel, tg).await?;
            self.ledger
                .record_target_group(&key, identity.clone(), &self.cloud.config().vpc_id, referrer);
            tg.status.set(identity);
        }
        Ok(())
    }

    /// Put a deleted group the ledger forgot back as unreferenced, so its
    /// targets drain and the cleanup phase deletes it
    async fn recover_entry(&self, cancel: &CancellationToken, tg: &TargetGroup) -> Result<()> {
        let key = tg.spec.ledger_key();
        let Some(found) = self.manager.find(cancel, &tg.spec).await? else {
            debug!(target_group = %key, "deleted target group not found remotely");
            return Ok(());
        };
        info!(target_group = %key, id = %found.id, "recovered ledger entry of deleted target group");
        let identity = RemoteIdentity::new(&found.arn, &found.id);
        self.ledger.restore_target_group(TargetGroupEntry::new(
            key,
            identity.clone(),
            found.vpc_identifier.unwrap_or_default(),
        ));
        tg.status.set(identity);
        Ok(())
    }

    pub async fn post_synthesize(&self, cancel: &CancellationToken, stack: &Stack) -> Result<()> {
        for tg in stack.list::<TargetGroup>().into_iter().filter(|tg| tg.spec.is_deleted) {
            let key = tg.spec.ledger_key();
            let _guard = self.ledger.lock(&key.lock_key()).await;
            let entry = self.ledger.target_group(&key);
            if entry.as_ref().is_some_and(|e| !e.is_unreferenced()) {
                debug!(target_group = %key, "target group still referenced, keeping it");
                continue;
            }
            if tg.spec.is_service_import {
                // imported groups belong to the exporting cluster
                self.ledger.remove_target_group(&key);
                continue;
            }
            self.manager.delete(cancel, tg).await?;
        }

        if self.cluster.is_some() {
            match self.collect_garbage(cancel).await {
                Ok(()) => {}
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => warn!(error = %e, "target group garbage collection failed"),
            }
        }
        Ok(())
    }

    /// Drain and delete managed target groups that nothing references any more
    ///
    /// Every managed group is checked against the cluster, including the
    /// ones the ledger knows: a backend dropped from a live route never
    /// shows up in a stack again, so its flag is only cleared here.
    async fn collect_garbage(&self, cancel: &CancellationToken) -> Result<()> {
        for group in self.manager.list(cancel, &()).await? {
            let Some(tags) = &group.tags else {
                continue;
            };
            if !self.cloud.contains_managed_by(tags) {
                continue;
            }

            let reference = self.cluster_reference(&group).await?;
            let lock_key = match (&reference, self.ledger.find_target_group_by_arn(&group.summary.arn)) {
                (_, Some(entry)) => entry.key.lock_key(),
                (Some(reference), None) => reference.key.lock_key(),
                (None, None) => continue,
            };
            let _guard = self.ledger.lock(&lock_key).await;

            // re-read under the lock, a concurrent pass may have changed it
            let entry = match (self.ledger.find_target_group_by_arn(&group.summary.arn), reference) {
                (Some(entry), Some(reference)) if !reference.live && entry.is_referenced_by(reference.referrer) => {
                    debug!(target_group = %group.summary.name, "no longer referenced in the cluster");
                    self.ledger
                        .release_target_group(&entry.key, reference.referrer)
                        .unwrap_or(entry)
                }
                (Some(entry), _) => entry,
                (None, Some(reference)) => self.rebuild_entry(&group, reference),
                (None, None) => continue,
            };
            if !entry.is_unreferenced() {
                continue;
            }

            info!(target_group = %group.summary.name, "deleting unreferenced target group");
            let id = &group.summary.id;
            let outcome = match self.manager.drain(cancel, id).await {
                Ok(()) => self.manager.delete_by_id(cancel, id).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => {}
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => warn!(target_group = %group.summary.name, error = %e, "failed to delete unreferenced target group"),
            }
        }
        Ok(())
    }

    /// Whether the cluster object named by a group's identity tags still
    /// wants it
    async fn cluster_reference(&self, group: &TargetGroupWithTags) -> Result<Option<ClusterReference>> {
        let (Some(cluster), Some(tags)) = (&self.cluster, &group.tags) else {
            return Ok(None);
        };
        let tag = |key: &str| tags.get(key).cloned();
        let (Some(svc), Some(ns), Some(parent)) = (
            tag(K8S_SERVICE_NAME_KEY),
            tag(K8S_SERVICE_NAMESPACE_KEY),
            tag(K8S_PARENT_REF_TYPE_KEY),
        ) else {
            debug!(target_group = %group.summary.name, "missing identity tags, leaving it alone");
            return Ok(None);
        };
        let service = NamespacedName::new(&ns, &svc);

        let reference = match parent.as_str() {
            PARENT_REF_SERVICE_EXPORT => {
                let export = cluster.get_service_export(&service).await?;
                ClusterReference {
                    key: TargetGroupKey::export(&svc, &ns),
                    referrer: Referrer::ServiceExport,
                    live: export.is_some_and(|e| !e.meta.deleting),
                }
            }
            PARENT_REF_HTTP_ROUTE => {
                let (Some(route_name), Some(route_ns)) =
                    (tag(K8S_ROUTE_NAME_KEY), tag(K8S_ROUTE_NAMESPACE_KEY))
                else {
                    return Ok(None);
                };
                let route_ref = NamespacedName::new(&route_ns, &route_name);
                let mut live = false;
                for kind in [RouteKind::Http, RouteKind::Grpc] {
                    if let Some(route) = cluster.get_route(kind, &route_ref).await? {
                        live = !route.meta.deleting && route.references_service(&service);
                        break;
                    }
                }
                ClusterReference {
                    key: TargetGroupKey::backend_ref(&svc, &ns, &route_name),
                    referrer: Referrer::BackendRef,
                    live,
                }
            }
            other => {
                debug!(target_group = %group.summary.name, parent = %other, "unknown parent type");
                return Ok(None);
            }
        };
        Ok(Some(reference))
    }

    /// Restore a ledger entry the ledger missed; only groups something still
    /// wants go back in
    fn rebuild_entry(&self, group: &TargetGroupWithTags, reference: ClusterReference) -> TargetGroupEntry {
        let mut entry = TargetGroupEntry::new(
            reference.key,
            RemoteIdentity::new(&group.summary.arn, &group.summary.id),
            group.summary.vpc_identifier.clone().unwrap_or_default(),
        );
        match reference.referrer {
            Referrer::BackendRef => entry.by_backend_ref = reference.live,
            Referrer::ServiceExport => entry.by_service_export = reference.live,
        }
        if reference.live {
            self.ledger.restore_target_group(entry.clone());
        }
        entry
    }
}

struct ClusterReference {
    key: TargetGroupKey,
    referrer: Referrer,
    live: bool,
}
