//! Per-pass container of desired resources

use crate::error::{Error, Result};
use crate::model::{Resource, ResourceKind, StackId, StackResource};
use serde::Serialize;

/// Whether the builder produced the whole desired graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StackState {
    Complete,
    /// The builder failed part-way. The stack is still deployed so that
    /// explicit deletions and GC run, but nothing is pruned for being absent.
    Partial { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct Stack {
    id: StackId,
    state: StackState,
    resources: Vec<Resource>,
}

impl Stack {
    pub fn new(id: StackId) -> Self {
        Self {
            id,
            state: StackState::Complete,
            resources: Vec::new(),
        }
    }

    pub fn id(&self) -> &StackId {
        &self.id
    }

    pub fn state(&self) -> &StackState {
        &self.state
    }

    pub fn is_partial(&self) -> bool {
        matches!(self.state, StackState::Partial { .. })
    }

    pub fn mark_partial(&mut self, reason: impl Into<String>) {
        self.state = StackState::Partial {
            reason: reason.into(),
        };
    }

    /// Add a resource; it must have been created for this stack
    pub fn add(&mut self, resource: impl Into<Resource>) -> Result<()> {
        let resource = resource.into();
        let meta = resource.meta();
        if meta.stack_id != self.id {
            return Err(Error::Integrity(format!(
                "{} {} belongs to stack {}, not {}",
                meta.kind, meta.id, meta.stack_id, self.id
            )));
        }
        if self
            .resources
            .iter()
            .any(|r| r.meta().kind == meta.kind && r.meta().id == meta.id)
        {
            return Err(Error::Integrity(format!(
                "duplicate {} {} in stack {}",
                meta.kind, meta.id, self.id
            )));
        }
        self.resources.push(resource);
        Ok(())
    }

    /// Resources of one kind, in insertion order
    pub fn list<T: StackResource>(&self) -> Vec<&T> {
        self.resources
            .iter()
            .filter_map(|r| T::from_resource(r))
            .collect()
    }

    pub fn get<T: StackResource>(&self, id: &str) -> Option<&T> {
        self.resources
            .iter()
            .filter(|r| r.meta().id == id)
            .find_map(|r| T::from_resource(r))
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.resources
            .iter()
            .filter(|r| r.meta().kind == kind)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
