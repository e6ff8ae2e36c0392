use super::meta::{RemoteIdentity, ResourceKind, ResourceMeta, StackId, Status};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessLogSource {
    ServiceNetwork,
    Service,
}

/// Where access logs are shipped, inferred from the destination ARN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestinationType {
    S3,
    CloudWatchLogs,
    Firehose,
}

impl DestinationType {
    /// `arn:<partition>:<service>:...`; unknown services yield `None`
    pub fn from_arn(arn: &str) -> Option<Self> {
        let mut parts = arn.split(':');
        if parts.next() != Some("arn") {
            return None;
        }
        match parts.nth(1)? {
            "s3" => Some(Self::S3),
            "logs" => Some(Self::CloudWatchLogs),
            "firehose" => Some(Self::Firehose),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessLogSubscriptionSpec {
    pub source_type: AccessLogSource,
    /// Remote name of the service network or service
    pub source_name: String,
    pub destination_arn: String,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessLogSubscription {
    pub meta: ResourceMeta,
    pub spec: AccessLogSubscriptionSpec,
    pub status: Status<RemoteIdentity>,
}

impl AccessLogSubscription {
    pub fn new(stack_id: StackId, id: impl Into<String>, spec: AccessLogSubscriptionSpec) -> Self {
        Self {
            meta: ResourceMeta::new(stack_id, ResourceKind::AccessLogSubscription, id),
            spec,
            status: Status::default(),
        }
    }
}
