use super::{ResourceManager, checkpoint, lookup_service};
use async_trait::async_trait;
use latticeflow_cloud::{Cloud, CreateListenerInput, ListenerSummary, UpdateListenerInput};
use latticeflow_core::{Error, Ledger, Listener, ListenerEntry, ListenerKey, ListenerStatus, Result, ServiceEntry};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct ListenerManager {
    cloud: Cloud,
    ledger: Arc<Ledger>,
}

impl ListenerManager {
    pub fn new(cloud: Cloud, ledger: Arc<Ledger>) -> Self {
        Self { cloud, ledger }
    }

    async fn parent_service(&self, cancel: &CancellationToken, listener: &Listener) -> Result<Option<ServiceEntry>> {
        lookup_service(&self.cloud, &self.ledger, cancel, &listener.spec.service_name()).await
    }

    fn record(&self, listener: &Listener, summary: &ListenerSummary, service_id: &str) -> ListenerStatus {
        self.ledger.put_listener(ListenerEntry {
            key: ListenerKey {
                service_name: listener.spec.service_name(),
                port: listener.spec.port,
                protocol: listener.spec.protocol.clone(),
            },
            arn: summary.arn.clone(),
            id: summary.id.clone(),
            service_id: service_id.to_string(),
        });
        ListenerStatus {
            arn: summary.arn.clone(),
            id: summary.id.clone(),
            service_id: service_id.to_string(),
        }
    }

    /// Remove a listener by id; used when pruning listeners no route declares
    pub async fn delete_remote(&self, cancel: &CancellationToken, service_id: &str, listener_id: &str) -> Result<()> {
        checkpoint(cancel)?;
        info!(service_id = %service_id, listener_id = %listener_id, "deleting listener");
        match self.cloud.api().delete_listener(service_id, listener_id).await {
            Err(e) if !e.is_not_found() => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ResourceManager for ListenerManager {
    type Resource = Listener;
    type Status = ListenerStatus;
    type Summary = ListenerSummary;
    type Scope = str;

    async fn create(&self, cancel: &CancellationToken, desired: &Listener) -> Result<ListenerStatus> {
        let Some(service) = self.parent_service(cancel, desired).await? else {
            return Err(Error::retry(format!(
                "service {} for listener {} is not known yet",
                desired.spec.service_name(),
                desired.spec.remote_name()
            )));
        };

        let existing = self
            .list(cancel, &service.id)
            .await?
            .into_iter()
            .find(|l| l.port == desired.spec.port);

        if let Some(existing) = existing {
            if existing.default_action != desired.spec.default_action {
                checkpoint(cancel)?;
                info!(listener = %existing.name, "updating listener default action");
                self.cloud
                    .api()
                    .update_listener(&UpdateListenerInput {
                        service_identifier: service.id.clone(),
                        listener_identifier: existing.id.clone(),
                        default_action: desired.spec.default_action.clone(),
                    })
                    .await?;
            } else {
                debug!(listener = %existing.name, "listener up to date");
            }
            return Ok(self.record(desired, &existing, &service.id));
        }

        checkpoint(cancel)?;
        let name = desired.spec.remote_name();
        info!(listener = %name, port = desired.spec.port, "creating listener");
        let created = self
            .cloud
            .api()
            .create_listener(&CreateListenerInput {
                service_identifier: service.id.clone(),
                name,
                port: desired.spec.port,
                protocol: desired.spec.protocol.clone(),
                default_action: desired.spec.default_action.clone(),
                tags: self.cloud.default_tags(),
            })
            .await?;
        Ok(self.record(desired, &created, &service.id))
    }

    async fn update(&self, cancel: &CancellationToken, desired: &Listener) -> Result<ListenerStatus> {
        self.create(cancel, desired).await
    }

    async fn delete(&self, cancel: &CancellationToken, existing: &Listener) -> Result<()> {
        let key = ListenerKey {
            service_name: existing.spec.service_name(),
            port: existing.spec.port,
            protocol: existing.spec.protocol.clone(),
        };
        if let Some(service) = self.parent_service(cancel, existing).await? {
            let found = self
                .list(cancel, &service.id)
                .await?
                .into_iter()
                .find(|l| l.port == existing.spec.port);
            if let Some(listener) = found {
                self.delete_remote(cancel, &service.id, &listener.id).await?;
            }
        }
        self.ledger.remove_listener(&key);
        Ok(())
    }

    async fn get(&self, cancel: &CancellationToken, desired: &Listener) -> Result<Option<ListenerStatus>> {
        let Some(service) = self.parent_service(cancel, desired).await? else {
            return Ok(None);
        };
        Ok(self
            .list(cancel, &service.id)
            .await?
            .into_iter()
            .find(|l| l.port == desired.spec.port)
            .map(|l| ListenerStatus {
                arn: l.arn,
                id: l.id,
                service_id: service.id.clone(),
            }))
    }

    async fn list(&self, cancel: &CancellationToken, service_id: &str) -> Result<Vec<ListenerSummary>> {
        checkpoint(cancel)?;
        Ok(self.cloud.api().list_listeners(service_id).await?)
    }
}
