use super::{ResourceManager, checkpoint, lookup_service};
use async_trait::async_trait;
use latticeflow_cloud::{
    AccessLogSubscriptionSummary, Cloud, CreateAccessLogSubscriptionInput,
    UpdateAccessLogSubscriptionInput,
};
use latticeflow_core::{
    AccessLogSource, AccessLogSubscription, DestinationType, Error, Ledger, RemoteIdentity, Result,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Access log subscriptions on service networks and services.
///
/// A source carries at most one subscription per destination type, so an
/// existing subscription of the same type is retargeted instead of
/// duplicated.
pub struct AccessLogSubscriptionManager {
    cloud: Cloud,
    ledger: Arc<Ledger>,
}

impl AccessLogSubscriptionManager {
    pub fn new(cloud: Cloud, ledger: Arc<Ledger>) -> Self {
        Self { cloud, ledger }
    }

    /// Remote id of the subscribed network or service
    async fn source_id(&self, cancel: &CancellationToken, subscription: &AccessLogSubscription) -> Result<Option<String>> {
        let name = &subscription.spec.source_name;
        match subscription.spec.source_type {
            AccessLogSource::ServiceNetwork => {
                checkpoint(cancel)?;
                Ok(self
                    .cloud
                    .api()
                    .list_service_networks()
                    .await?
                    .into_iter()
                    .find(|sn| &sn.name == name)
                    .map(|sn| sn.id))
            }
            AccessLogSource::Service => Ok(lookup_service(&self.cloud, &self.ledger, cancel, name)
                .await?
                .map(|s| s.id)),
        }
    }

    async fn same_type(
        &self,
        cancel: &CancellationToken,
        source_id: &str,
        destination: DestinationType,
    ) -> Result<Option<AccessLogSubscriptionSummary>> {
        Ok(self
            .list(cancel, source_id)
            .await?
            .into_iter()
            .find(|s| DestinationType::from_arn(&s.destination_arn) == Some(destination)))
    }
}

fn destination_of(subscription: &AccessLogSubscription) -> Result<DestinationType> {
    DestinationType::from_arn(&subscription.spec.destination_arn).ok_or_else(|| {
        Error::InvalidConfig(format!(
            "unsupported access log destination {}",
            subscription.spec.destination_arn
        ))
    })
}

#[async_trait]
impl ResourceManager for AccessLogSubscriptionManager {
    type Resource = AccessLogSubscription;
    type Status = RemoteIdentity;
    type Summary = AccessLogSubscriptionSummary;
    type Scope = str;

    async fn create(&self, cancel: &CancellationToken, desired: &AccessLogSubscription) -> Result<RemoteIdentity> {
        let destination = destination_of(desired)?;
        let Some(source_id) = self.source_id(cancel, desired).await? else {
            return Err(Error::retry(format!(
                "access log source {} does not exist yet",
                desired.spec.source_name
            )));
        };

        if let Some(existing) = self.same_type(cancel, &source_id, destination).await? {
            if existing.destination_arn == desired.spec.destination_arn {
                debug!(subscription = %existing.id, "access log subscription up to date");
            } else {
                checkpoint(cancel)?;
                info!(subscription = %existing.id, destination = %desired.spec.destination_arn, "retargeting access log subscription");
                self.cloud
                    .api()
                    .update_access_log_subscription(&UpdateAccessLogSubscriptionInput {
                        access_log_subscription_identifier: existing.id.clone(),
                        destination_arn: desired.spec.destination_arn.clone(),
                    })
                    .await?;
            }
            return Ok(RemoteIdentity::new(existing.arn, existing.id));
        }

        checkpoint(cancel)?;
        info!(source = %desired.spec.source_name, destination = %desired.spec.destination_arn, "creating access log subscription");
        let created = self
            .cloud
            .api()
            .create_access_log_subscription(&CreateAccessLogSubscriptionInput {
                resource_identifier: source_id,
                destination_arn: desired.spec.destination_arn.clone(),
                tags: self.cloud.default_tags(),
            })
            .await?;
        Ok(RemoteIdentity::new(created.arn, created.id))
    }

    async fn update(&self, cancel: &CancellationToken, desired: &AccessLogSubscription) -> Result<RemoteIdentity> {
        self.create(cancel, desired).await
    }

    async fn delete(&self, cancel: &CancellationToken, existing: &AccessLogSubscription) -> Result<()> {
        let Some(source_id) = self.source_id(cancel, existing).await? else {
            return Ok(());
        };
        let found = self
            .list(cancel, &source_id)
            .await?
            .into_iter()
            .find(|s| s.destination_arn == existing.spec.destination_arn);
        let Some(subscription) = found else {
            return Ok(());
        };

        checkpoint(cancel)?;
        info!(subscription = %subscription.id, "deleting access log subscription");
        match self
            .cloud
            .api()
            .delete_access_log_subscription(&subscription.id)
            .await
        {
            Err(e) if !e.is_not_found() => Err(e.into()),
            _ => Ok(()),
        }
    }

    async fn get(&self, cancel: &CancellationToken, desired: &AccessLogSubscription) -> Result<Option<RemoteIdentity>> {
        let Some(source_id) = self.source_id(cancel, desired).await? else {
            return Ok(None);
        };
        Ok(self
            .list(cancel, &source_id)
            .await?
            .into_iter()
            .find(|s| s.destination_arn == desired.spec.destination_arn)
            .map(|s| RemoteIdentity::new(s.arn, s.id)))
    }

    async fn list(&self, cancel: &CancellationToken, resource_id: &str) -> Result<Vec<AccessLogSubscriptionSummary>> {
        checkpoint(cancel)?;
        Ok(self
            .cloud
            .api()
            .list_access_log_subscriptions(resource_id)
            .await?)
    }
}
