//! Reconciliation ledger
//!
//! In-memory mapping from cluster-derived keys to remote identity. Models
//! and stacks are rebuilt every pass; the ledger is the only state that
//! carries over. It is a cache, not a source of truth: misses are rebuilt
//! from remote `list` calls.
//!
//! Construct one with [`Ledger::new`] at startup and share it as
//! `Arc<Ledger>`. Entry maps are concurrent maps, so unrelated keys never
//! contend; [`Ledger::lock`] serializes work on one logical key. Lock slots
//! live only while someone holds or waits for them.

use crate::model::{RemoteIdentity, TargetGroupKey};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use latticeflow_cloud::Target;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockSlots = DashMap<String, Arc<Mutex<()>>>;

/// Which kind of cluster object currently wants a target group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Referrer {
    BackendRef,
    ServiceExport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetGroupEntry {
    pub key: TargetGroupKey,
    pub arn: String,
    pub id: String,
    pub vpc_id: String,
    pub by_backend_ref: bool,
    pub by_service_export: bool,
    /// Members last registered for this (group, route) pair
    pub targets: Vec<Target>,
    pub updated_at: DateTime<Utc>,
}

impl TargetGroupEntry {
    pub fn new(key: TargetGroupKey, identity: RemoteIdentity, vpc_id: impl Into<String>) -> Self {
        Self {
            key,
            arn: identity.arn,
            id: identity.id,
            vpc_id: vpc_id.into(),
            by_backend_ref: false,
            by_service_export: false,
            targets: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Neither a route nor an export wants this group any more
    pub fn is_unreferenced(&self) -> bool {
        !self.by_backend_ref && !self.by_service_export
    }

    pub fn is_referenced_by(&self, referrer: Referrer) -> bool {
        match referrer {
            Referrer::BackendRef => self.by_backend_ref,
            Referrer::ServiceExport => self.by_service_export,
        }
    }

    pub fn identity(&self) -> RemoteIdentity {
        RemoteIdentity::new(&self.arn, &self.id)
    }

    fn set_referrer(&mut self, referrer: Referrer, value: bool) {
        match referrer {
            Referrer::BackendRef => self.by_backend_ref = value,
            Referrer::ServiceExport => self.by_service_export = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    pub arn: String,
    pub id: String,
    pub dns: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerKey {
    pub service_name: String,
    pub port: u16,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerEntry {
    pub key: ListenerKey,
    pub arn: String,
    pub id: String,
    pub service_id: String,
}

/// Held lock on one ledger key
///
/// Dropping it releases the key and frees the slot once no other task
/// holds or waits for it.
#[derive(Debug)]
pub struct KeyGuard<'a> {
    slots: &'a LockSlots,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // waiters clone the slot under the shard lock, so a count of one
        // means the map holds the only reference
        self.slots
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[derive(Debug, Default)]
pub struct Ledger {
    target_groups: DashMap<TargetGroupKey, TargetGroupEntry>,
    services: DashMap<String, ServiceEntry>,
    listeners: DashMap<ListenerKey, ListenerEntry>,
    locks: LockSlots,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize work on one logical key; the guard releases on drop
    pub async fn lock(&self, key: &str) -> KeyGuard<'_> {
        let mutex = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        KeyGuard {
            slots: &self.locks,
            key: key.to_string(),
            guard: Some(mutex.lock_owned().await),
        }
    }

    /// Number of keys currently locked or waited on
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    // ---- target groups -------------------------------------------------

    pub fn target_group(&self, key: &TargetGroupKey) -> Option<TargetGroupEntry> {
        self.target_groups.get(key).map(|e| e.value().clone())
    }

    pub fn target_groups(&self) -> Vec<TargetGroupEntry> {
        self.target_groups.iter().map(|e| e.value().clone()).collect()
    }

    pub fn find_target_group_by_arn(&self, arn: &str) -> Option<TargetGroupEntry> {
        self.target_groups
            .iter()
            .find(|e| e.arn == arn)
            .map(|e| e.value().clone())
    }

    /// Record the remote identity of a group and mark who references it.
    /// Member lists and the other referrer flag are kept.
    pub fn record_target_group(
        &self,
        key: &TargetGroupKey,
        identity: RemoteIdentity,
        vpc_id: &str,
        referrer: Referrer,
    ) {
        let mut entry = self
            .target_groups
            .entry(key.clone())
            .or_insert_with(|| TargetGroupEntry::new(key.clone(), RemoteIdentity::pending(), vpc_id));
        entry.arn = identity.arn;
        entry.id = identity.id;
        entry.vpc_id = vpc_id.to_string();
        entry.set_referrer(referrer, true);
        entry.updated_at = Utc::now();
    }

    /// Insert an entry as-is; used when rebuilding the ledger from remote state
    pub fn restore_target_group(&self, entry: TargetGroupEntry) {
        self.target_groups.insert(entry.key.clone(), entry);
    }

    /// Drop one referrer flag; returns the updated entry when present
    pub fn release_target_group(&self, key: &TargetGroupKey, referrer: Referrer) -> Option<TargetGroupEntry> {
        let mut entry = self.target_groups.get_mut(key)?;
        entry.set_referrer(referrer, false);
        entry.updated_at = Utc::now();
        Some(entry.clone())
    }

    pub fn set_targets(&self, key: &TargetGroupKey, targets: Vec<Target>) -> bool {
        match self.target_groups.get_mut(key) {
            Some(mut entry) => {
                entry.targets = targets;
                entry.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn remove_target_group(&self, key: &TargetGroupKey) -> Option<TargetGroupEntry> {
        self.target_groups.remove(key).map(|(_, e)| e)
    }

    pub fn remove_target_group_by_id(&self, id: &str) {
        self.target_groups.retain(|_, e| e.id != id);
    }

    // ---- services ------------------------------------------------------

    pub fn service(&self, name: &str) -> Option<ServiceEntry> {
        self.services.get(name).map(|e| e.value().clone())
    }

    pub fn put_service(&self, entry: ServiceEntry) {
        self.services.insert(entry.name.clone(), entry);
    }

    pub fn remove_service(&self, name: &str) -> Option<ServiceEntry> {
        self.services.remove(name).map(|(_, e)| e)
    }

    // ---- listeners -----------------------------------------------------

    pub fn listener(&self, key: &ListenerKey) -> Option<ListenerEntry> {
        self.listeners.get(key).map(|e| e.value().clone())
    }

    pub fn put_listener(&self, entry: ListenerEntry) {
        self.listeners.insert(entry.key.clone(), entry);
    }

    pub fn remove_listener(&self, key: &ListenerKey) -> Option<ListenerEntry> {
        self.listeners.remove(key).map(|(_, e)| e)
    }

    /// Forget every listener of a service, e.g. after the service is deleted
    pub fn remove_listeners_of(&self, service_name: &str) {
        self.listeners.retain(|k, _| k.service_name != service_name);
    }
}
