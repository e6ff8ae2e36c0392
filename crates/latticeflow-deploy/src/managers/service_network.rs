use super::{ResourceManager, checkpoint};
use async_trait::async_trait;
use latticeflow_cloud::{Cloud, CreateServiceNetworkInput, ListAssociationsInput, ServiceNetworkSummary};
use latticeflow_core::{Error, RemoteIdentity, Result, ServiceNetwork};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct ServiceNetworkManager {
    cloud: Cloud,
}

impl ServiceNetworkManager {
    pub fn new(cloud: Cloud) -> Self {
        Self { cloud }
    }

    pub async fn find_by_name(
        &self,
        cancel: &CancellationToken,
        name: &str,
    ) -> Result<Option<ServiceNetworkSummary>> {
        Ok(self
            .list(cancel, &())
            .await?
            .into_iter()
            .find(|sn| sn.name == name))
    }
}

#[async_trait]
impl ResourceManager for ServiceNetworkManager {
    type Resource = ServiceNetwork;
    type Status = RemoteIdentity;
    type Summary = ServiceNetworkSummary;
    type Scope = ();

    async fn create(&self, cancel: &CancellationToken, desired: &ServiceNetwork) -> Result<RemoteIdentity> {
        let name = &desired.spec.name;
        if let Some(existing) = self.find_by_name(cancel, name).await? {
            debug!(service_network = %name, id = %existing.id, "service network exists");
            return Ok(RemoteIdentity::new(existing.arn, existing.id));
        }

        checkpoint(cancel)?;
        info!(service_network = %name, "creating service network");
        let created = self
            .cloud
            .api()
            .create_service_network(&CreateServiceNetworkInput {
                name: name.clone(),
                tags: self.cloud.default_tags(),
            })
            .await?;
        Ok(RemoteIdentity::new(created.arn, created.id))
    }

    async fn update(&self, cancel: &CancellationToken, desired: &ServiceNetwork) -> Result<RemoteIdentity> {
        self.create(cancel, desired).await
    }

    /// Only networks we created are deleted, and only once nothing is associated
    async fn delete(&self, cancel: &CancellationToken, existing: &ServiceNetwork) -> Result<()> {
        let name = &existing.spec.name;
        let Some(sn) = self.find_by_name(cancel, name).await? else {
            return Ok(());
        };

        checkpoint(cancel)?;
        if !self.cloud.is_arn_managed(&sn.arn).await {
            info!(service_network = %name, "not managed by this controller, leaving it in place");
            return Ok(());
        }

        checkpoint(cancel)?;
        let associations = self
            .cloud
            .api()
            .list_associations(&ListAssociationsInput {
                service_identifier: None,
                service_network_identifier: Some(sn.id.clone()),
            })
            .await?;
        if !associations.is_empty() {
            return Err(Error::retry(format!(
                "service network {} still has {} service associations",
                name,
                associations.len()
            )));
        }

        checkpoint(cancel)?;
        info!(service_network = %name, "deleting service network");
        match self.cloud.api().delete_service_network(&sn.id).await {
            Err(e) if !e.is_not_found() => Err(e.into()),
            _ => Ok(()),
        }
    }

    async fn get(&self, cancel: &CancellationToken, desired: &ServiceNetwork) -> Result<Option<RemoteIdentity>> {
        Ok(self
            .find_by_name(cancel, &desired.spec.name)
            .await?
            .map(|sn| RemoteIdentity::new(sn.arn, sn.id)))
    }

    async fn list(&self, cancel: &CancellationToken, _scope: &()) -> Result<Vec<ServiceNetworkSummary>> {
        checkpoint(cancel)?;
        Ok(self.cloud.api().list_service_networks().await?)
    }
}
