//! Tag provider and handle to the remote control plane

use crate::api::LatticeApi;
use crate::types::Tags;
use latticeflow_config::ControllerConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const TAG_MANAGED_BY: &str = "application-networking.k8s.aws/ManagedBy";

// identity tags carried by target groups
pub const K8S_SERVICE_NAME_KEY: &str = "application-networking.k8s.aws/K8SServiceName";
pub const K8S_SERVICE_NAMESPACE_KEY: &str = "application-networking.k8s.aws/K8SServiceNamespace";
pub const K8S_ROUTE_NAME_KEY: &str = "application-networking.k8s.aws/K8SRouteName";
pub const K8S_ROUTE_NAMESPACE_KEY: &str = "application-networking.k8s.aws/K8SRouteNamespace";
pub const K8S_PARENT_REF_TYPE_KEY: &str = "application-networking.k8s.aws/K8SParentRefType";

pub const PARENT_REF_SERVICE_EXPORT: &str = "ServiceExport";
pub const PARENT_REF_HTTP_ROUTE: &str = "HTTPRoute";

/// Identity of this controller on the remote side
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudConfig {
    pub vpc_id: String,
    pub account_id: String,
    pub region: String,
    pub cluster_name: String,
}

impl From<&ControllerConfig> for CloudConfig {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            vpc_id: config.vpc_id.clone(),
            account_id: config.account_id.clone(),
            region: config.region.clone(),
            cluster_name: config.cluster_name.clone(),
        }
    }
}

/// The remote API plus the tags that mark resources as ours
#[derive(Clone)]
pub struct Cloud {
    config: CloudConfig,
    api: Arc<dyn LatticeApi>,
    managed_by: String,
}

impl Cloud {
    pub fn new(config: CloudConfig, api: Arc<dyn LatticeApi>) -> Self {
        let managed_by = format!(
            "{}/{}/{}",
            config.account_id, config.cluster_name, config.vpc_id
        );
        Self {
            config,
            api,
            managed_by,
        }
    }

    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    pub fn api(&self) -> &dyn LatticeApi {
        self.api.as_ref()
    }

    pub fn managed_by(&self) -> &str {
        &self.managed_by
    }

    pub fn default_tags(&self) -> Tags {
        let mut tags = Tags::new();
        tags.insert(TAG_MANAGED_BY.to_string(), self.managed_by.clone());
        tags
    }

    /// Default tags overlaid with `extra`; the managed-by tag is never overridden
    pub fn merged_tags(&self, extra: &Tags) -> Tags {
        let mut tags = self.default_tags();
        for (key, value) in extra {
            if key != TAG_MANAGED_BY {
                tags.insert(key.clone(), value.clone());
            }
        }
        tags
    }

    pub fn contains_managed_by(&self, tags: &Tags) -> bool {
        tags.get(TAG_MANAGED_BY)
            .is_some_and(|value| value == &self.managed_by)
    }

    /// Tag lookup failures count as "not ours"
    pub async fn is_arn_managed(&self, arn: &str) -> bool {
        match self.api.list_tags_for_resource(arn).await {
            Ok(tags) => self.contains_managed_by(&tags),
            Err(e) => {
                tracing::debug!(arn = %arn, error = %e, "tag lookup failed, treating as unmanaged");
                false
            }
        }
    }
}

impl std::fmt::Debug for Cloud {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cloud")
            .field("config", &self.config)
            .field("managed_by", &self.managed_by)
            .finish_non_exhaustive()
    }
}
