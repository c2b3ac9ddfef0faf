use log::*;
use order_engine::traits::{FulfillmentProvider, ProviderError, ProviderLineItem, ProviderOrderId, Recipient};
use pod_tools::{NewPodOrder, PodApi, PodApiError, PodConfig, PodFile, PodLineItem, PodOrder, PodRecipient};

use crate::errors::ServerError;

/// The print-on-demand provider, seen through the engine's [`FulfillmentProvider`] contract.
#[derive(Clone)]
pub struct PodFulfillment {
    api: PodApi,
}

impl PodFulfillment {
    pub fn new(config: PodConfig) -> Result<Self, ServerError> {
        let api = PodApi::new(config)?;
        Ok(Self { api })
    }
}

impl FulfillmentProvider for PodFulfillment {
    async fn create_order(
        &self,
        recipient: &Recipient,
        items: &[ProviderLineItem],
        external_ref: &str,
    ) -> Result<ProviderOrderId, ProviderError> {
        let order = NewPodOrder {
            external_id: external_ref.to_string(),
            recipient: to_pod_recipient(recipient),
            items: items.iter().map(to_pod_item).collect::<Result<Vec<_>, _>>()?,
        };
        let created = self.api.create_order(&order).await.map_err(to_provider_error)?;
        debug!("📦️ Provider created draft order {} for {external_ref}", created.id);
        Ok(ProviderOrderId(created.id.to_string()))
    }

    async fn confirm_order(&self, id: &ProviderOrderId) -> Result<String, ProviderError> {
        let numeric_id = id
            .as_str()
            .parse::<u64>()
            .map_err(|e| ProviderError::InvalidRequest(format!("Provider order id {id} is not numeric. {e}")))?;
        match self.api.confirm_order(numeric_id).await {
            Ok(order) => Ok(order.status),
            Err(e @ (PodApiError::RestRequestError(_) | PodApiError::RestResponseError(_))) => {
                warn!("📦️ Confirmation of provider order {id} failed in transit. Checking whether it landed. {e}");
                match self.api.get_order(numeric_id).await {
                    Ok(order) if confirmation_landed(&order) => {
                        info!("📦️ Provider order {id} was confirmed after all. Status: {}", order.status);
                        Ok(order.status)
                    },
                    Ok(order) => {
                        debug!("📦️ Provider order {id} is still {}", order.status);
                        Err(to_provider_error(e))
                    },
                    Err(lookup) => {
                        warn!("📦️ Could not look up provider order {id}. {lookup}");
                        Err(to_provider_error(e))
                    },
                }
            },
            Err(e) => Err(to_provider_error(e)),
        }
    }
}

/// A provider order that has left the draft state without being cancelled was released for production.
fn confirmation_landed(order: &PodOrder) -> bool {
    !["draft", "canceled", "failed"].contains(&order.status.to_ascii_lowercase().as_str())
}

fn to_pod_recipient(recipient: &Recipient) -> PodRecipient {
    PodRecipient {
        name: recipient.name.clone(),
        address1: recipient.address1.clone(),
        address2: recipient.address2.clone(),
        city: recipient.city.clone(),
        state_code: recipient.state_code.clone(),
        country_code: recipient.country_code.clone(),
        zip: recipient.zip.clone(),
        email: recipient.email.clone(),
        phone: recipient.phone.clone(),
    }
}

fn to_pod_item(item: &ProviderLineItem) -> Result<PodLineItem, ProviderError> {
    let variant_id = item.variant_ref.parse::<u64>().map_err(|e| {
        ProviderError::InvalidRequest(format!("Catalog variant {} is not a provider variant id. {e}", item.variant_ref))
    })?;
    Ok(PodLineItem {
        variant_id,
        quantity: item.quantity,
        retail_price: item.retail_price.clone(),
        name: item.name.clone(),
        files: item.files.iter().map(|url| PodFile { url: url.clone() }).collect(),
    })
}

fn to_provider_error(e: PodApiError) -> ProviderError {
    match e {
        PodApiError::QueryError { status, message } => ProviderError::Rejected { status, body: message },
        PodApiError::Timeout(s) => ProviderError::Timeout(s),
        PodApiError::RestRequestError(s) | PodApiError::RestResponseError(s) => ProviderError::Transport(s),
        PodApiError::JsonError(s) => ProviderError::InvalidResponse(s),
        PodApiError::Initialization(s) | PodApiError::Configuration(s) => ProviderError::InvalidRequest(s),
    }
}
