use super::{ResourceManager, checkpoint};
use async_trait::async_trait;
use latticeflow_cloud::{
    AssociationSummary, Cloud, CreateAssociationInput, CreateServiceInput, LifecycleStatus,
    ListAssociationsInput, ServiceSummary,
};
use latticeflow_core::{Error, Ledger, Result, Service, ServiceEntry, ServiceStatus};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Services and their service network associations
pub struct ServiceManager {
    cloud: Cloud,
    ledger: Arc<Ledger>,
}

impl ServiceManager {
    pub fn new(cloud: Cloud, ledger: Arc<Ledger>) -> Self {
        Self { cloud, ledger }
    }

    async fn find(&self, cancel: &CancellationToken, name: &str) -> Result<Option<ServiceSummary>> {
        Ok(self
            .list(cancel, &())
            .await?
            .into_iter()
            .find(|s| s.name == name))
    }

    async fn associations(&self, cancel: &CancellationToken, service_id: &str) -> Result<Vec<AssociationSummary>> {
        checkpoint(cancel)?;
        Ok(self
            .cloud
            .api()
            .list_associations(&ListAssociationsInput {
                service_identifier: Some(service_id.to_string()),
                service_network_identifier: None,
            })
            .await?)
    }

    /// Create or adopt the service, then converge its associations.
    ///
    /// With `prune` set, managed associations to networks the service no
    /// longer lists are removed. Partial passes call this with `prune`
    /// unset so an incomplete network list never disassociates anything.
    pub async fn ensure(&self, cancel: &CancellationToken, desired: &Service, prune: bool) -> Result<ServiceStatus> {
        let name = desired.spec.remote_name();

        let summary = match self.find(cancel, &name).await? {
            Some(existing) => {
                checkpoint(cancel)?;
                if !self.cloud.is_arn_managed(&existing.arn).await {
                    return Err(Error::NotManaged(format!("service {}", name)));
                }
                if existing.status != LifecycleStatus::Active {
                    return Err(Error::retry(format!(
                        "service {} is {}",
                        name, existing.status
                    )));
                }
                existing
            }
            None => {
                checkpoint(cancel)?;
                info!(service = %name, "creating service");
                let created = self
                    .cloud
                    .api()
                    .create_service(&CreateServiceInput {
                        name: name.clone(),
                        custom_domain_name: desired.spec.custom_domain_name.clone(),
                        tags: self.cloud.default_tags(),
                    })
                    .await?;
                self.ledger.put_service(entry_of(&created));
                if created.status != LifecycleStatus::Active {
                    return Err(Error::retry(format!(
                        "service {} is {}",
                        name, created.status
                    )));
                }
                created
            }
        };

        self.converge_associations(cancel, desired, &summary, prune).await?;

        let entry = entry_of(&summary);
        self.ledger.put_service(entry.clone());
        Ok(ServiceStatus {
            arn: entry.arn,
            id: entry.id,
            dns: entry.dns,
        })
    }

    async fn converge_associations(
        &self,
        cancel: &CancellationToken,
        desired: &Service,
        service: &ServiceSummary,
        prune: bool,
    ) -> Result<()> {
        let wanted: BTreeSet<&str> = desired.spec.service_networks.iter().map(String::as_str).collect();
        let existing = self.associations(cancel, &service.id).await?;

        let mut networks = None;
        for network_name in &wanted {
            if let Some(assoc) = existing.iter().find(|a| a.service_network_name == *network_name) {
                if assoc.status.is_transitional() {
                    return Err(Error::retry(format!(
                        "association of {} with {} is {}",
                        service.name, network_name, assoc.status
                    )));
                }
                continue;
            }

            if networks.is_none() {
                checkpoint(cancel)?;
                networks = Some(self.cloud.api().list_service_networks().await?);
            }
            let Some(network) = networks
                .iter()
                .flatten()
                .find(|sn| sn.name == *network_name)
            else {
                return Err(Error::retry(format!(
                    "service network {} does not exist yet",
                    network_name
                )));
            };

            checkpoint(cancel)?;
            info!(service = %service.name, service_network = %network_name, "associating service");
            self.cloud
                .api()
                .create_association(&CreateAssociationInput {
                    service_identifier: service.id.clone(),
                    service_network_identifier: network.id.clone(),
                    tags: self.cloud.default_tags(),
                })
                .await?;
        }

        if !prune {
            return Ok(());
        }

        for assoc in existing
            .iter()
            .filter(|a| !wanted.contains(a.service_network_name.as_str()))
        {
            if assoc.status == LifecycleStatus::DeleteInProgress {
                continue;
            }
            checkpoint(cancel)?;
            if !self.cloud.is_arn_managed(&assoc.arn).await {
                debug!(association = %assoc.id, "association not managed, keeping it");
                continue;
            }
            checkpoint(cancel)?;
            info!(service = %service.name, service_network = %assoc.service_network_name, "removing association");
            match self.cloud.api().delete_association(&assoc.id).await {
                Err(e) if !e.is_not_found() => return Err(e.into()),
                _ => {}
            }
        }
        Ok(())
    }
}

fn entry_of(summary: &ServiceSummary) -> ServiceEntry {
    ServiceEntry {
        name: summary.name.clone(),
        arn: summary.arn.clone(),
        id: summary.id.clone(),
        dns: summary.dns_entry.as_ref().map(|d| d.domain_name.clone()),
    }
}

#[async_trait]
impl ResourceManager for ServiceManager {
    type Resource = Service;
    type Status = ServiceStatus;
    type Summary = ServiceSummary;
    type Scope = ();

    async fn create(&self, cancel: &CancellationToken, desired: &Service) -> Result<ServiceStatus> {
        self.ensure(cancel, desired, true).await
    }

    async fn update(&self, cancel: &CancellationToken, desired: &Service) -> Result<ServiceStatus> {
        self.ensure(cancel, desired, true).await
    }

    async fn delete(&self, cancel: &CancellationToken, existing: &Service) -> Result<()> {
        let name = existing.spec.remote_name();
        let Some(service) = self.find(cancel, &name).await? else {
            self.ledger.remove_service(&name);
            self.ledger.remove_listeners_of(&name);
            return Ok(());
        };

        checkpoint(cancel)?;
        if !self.cloud.is_arn_managed(&service.arn).await {
            warn!(service = %name, "service is not managed by this controller, skipping delete");
            return Ok(());
        }

        for assoc in self.associations(cancel, &service.id).await? {
            if assoc.status == LifecycleStatus::DeleteInProgress {
                continue;
            }
            checkpoint(cancel)?;
            match self.cloud.api().delete_association(&assoc.id).await {
                Err(e) if !e.is_not_found() => return Err(e.into()),
                _ => {}
            }
        }

        checkpoint(cancel)?;
        info!(service = %name, "deleting service");
        match self.cloud.api().delete_service(&service.id).await {
            Err(e) if !e.is_not_found() => return Err(e.into()),
            _ => {}
        }

        self.ledger.remove_service(&name);
        self.ledger.remove_listeners_of(&name);
        Ok(())
    }

    async fn get(&self, cancel: &CancellationToken, desired: &Service) -> Result<Option<ServiceStatus>> {
        let name = desired.spec.remote_name();
        match self.find(cancel, &name).await? {
            Some(s) if s.status.is_transitional() => Err(Error::retry(format!(
                "service {} is {}",
                name, s.status
            ))),
            Some(s) if s.status == LifecycleStatus::Active => {
                let entry = entry_of(&s);
                Ok(Some(ServiceStatus {
                    arn: entry.arn,
                    id: entry.id,
                    dns: entry.dns,
                }))
            }
            _ => Ok(None),
        }
    }

    async fn list(&self, cancel: &CancellationToken, _scope: &()) -> Result<Vec<ServiceSummary>> {
        checkpoint(cancel)?;
        Ok(self.cloud.api().list_services().await?)
    }
}
