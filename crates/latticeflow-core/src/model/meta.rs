use crate::cluster::NamespacedName;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::OnceLock;

/// Identity of the cluster object a stack was built for (`namespace/name`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackId(String);

impl StackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&NamespacedName> for StackId {
    fn from(name: &NamespacedName) -> Self {
        Self(name.to_string())
    }
}

impl std::fmt::Display for StackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    ServiceNetwork,
    Service,
    TargetGroup,
    Targets,
    Listener,
    Rule,
    AccessLogSubscription,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ServiceNetwork => "ServiceNetwork",
            Self::Service => "Service",
            Self::TargetGroup => "TargetGroup",
            Self::Targets => "Targets",
            Self::Listener => "Listener",
            Self::Rule => "Rule",
            Self::AccessLogSubscription => "AccessLogSubscription",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMeta {
    pub stack_id: StackId,
    pub kind: ResourceKind,
    /// Unique within the stack and kind
    pub id: String,
}

impl ResourceMeta {
    pub fn new(stack_id: StackId, kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            stack_id,
            kind,
            id: id.into(),
        }
    }
}

/// Write-once status slot, empty until the remote operation completes
///
/// Stacks are shared by reference during deploy, so the slot is filled
/// through `&self`.
#[derive(Debug, Clone)]
pub struct Status<T>(OnceLock<T>);

impl<T> Default for Status<T> {
    fn default() -> Self {
        Self(OnceLock::new())
    }
}

impl<T> Status<T> {
    pub fn get(&self) -> Option<&T> {
        self.0.get()
    }

    /// Returns false when a status was already recorded this pass
    pub fn set(&self, value: T) -> bool {
        self.0.set(value).is_ok()
    }

    pub fn is_set(&self) -> bool {
        self.0.get().is_some()
    }
}

impl<T: PartialEq> PartialEq for Status<T> {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl<T: Serialize> Serialize for Status<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.get().serialize(serializer)
    }
}

/// ARN + ID pair most remote resources resolve to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteIdentity {
    pub arn: String,
    pub id: String,
}

impl RemoteIdentity {
    pub fn new(arn: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            arn: arn.into(),
            id: id.into(),
        }
    }

    /// The empty pair stands for "not created yet"
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.arn.is_empty() && self.id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_is_write_once() {
        let status = Status::default();
        assert!(!status.is_set());
        assert!(status.set(RemoteIdentity::new("arn:1", "tg-1")));
        assert!(!status.set(RemoteIdentity::new("arn:2", "tg-2")));
        assert_eq!(status.get().map(|s| s.id.as_str()), Some("tg-1"));
    }

    #[test]
    fn test_status_serializes_as_option() {
        let status: Status<RemoteIdentity> = Status::default();
        assert_eq!(serde_json::to_string(&status).unwrap(), "null");
        status.set(RemoteIdentity::new("arn:1", "tg-1"));
        assert_eq!(
            serde_json::to_value(&status).unwrap()["id"],
            serde_json::json!("tg-1")
        );
    }

    #[test]
    fn test_pending_identity() {
        assert!(RemoteIdentity::pending().is_pending());
        assert!(!RemoteIdentity::new("arn", "id").is_pending());
    }
}
