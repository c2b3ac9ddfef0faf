use std::{fmt::Debug, future::Future, sync::Arc, time::Duration};

use log::*;

use super::errors::{FulfillmentError, FulfillmentStep, TranslationError};
use crate::{
    catalog::ProductCatalog,
    db_types::{Order, OrderStatusType, OrderUpdate},
    traits::{FulfillmentProvider, OrderManagement, ProviderError, ProviderLineItem, Recipient},
};

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(8);

/// `FulfillmentApi` pushes paid orders through the provider's draft-then-confirm lifecycle.
///
/// [`Self::fulfill`] never fails. Whatever goes wrong downstream is recorded on the order as `fulfillment_failed`
/// together with a note for the operator.
pub struct FulfillmentApi<B, P> {
    db: B,
    provider: P,
    catalog: Arc<ProductCatalog>,
    provider_timeout: Duration,
}

impl<B, P> Debug for FulfillmentApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FulfillmentApi ({} products, timeout {:?})", self.catalog.len(), self.provider_timeout)
    }
}

impl<B, P> FulfillmentApi<B, P> {
    pub fn new(db: B, provider: P, catalog: ProductCatalog) -> Self {
        Self { db, provider, catalog: Arc::new(catalog), provider_timeout: DEFAULT_PROVIDER_TIMEOUT }
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }
}

impl<B, P> FulfillmentApi<B, P>
where
    B: OrderManagement,
    P: FulfillmentProvider,
{
    /// Runs the fulfillment state machine for a freshly paid order and returns the order in its final state.
    ///
    /// 0. Mark the order `fulfillment_pending`.
    /// 1. Translate the items into provider line items using the product catalog.
    /// 2. Translate the shipping address into a provider recipient.
    /// 3. Submit a draft order and record the provider order id.
    /// 4. Confirm the draft for production.
    /// 5. Mark the order `fulfillment_confirmed`.
    ///
    /// Any failure in steps 1 to 5 marks the order `fulfillment_failed`.
    pub async fn fulfill(&self, order: Order) -> Order {
        let order_id = order.id.clone();
        let pending = match self.db.update_order(&order_id, OrderUpdate::status(OrderStatusType::FulfillmentPending)).await
        {
            Ok(o) => o,
            Err(e) => {
                error!(
                    "📦️ Fulfillment of order {order_id} failed at step {}. Fulfillment will not be attempted. {e}",
                    FulfillmentStep::MarkPending
                );
                return order;
            },
        };
        debug!("📦️ Order {order_id} is now {}", pending.status);
        let mut order = pending;
        match self.submit(&mut order).await {
            Ok(()) => order,
            Err(err) => self.record_failure(order, err).await,
        }
    }

    /// Steps 1 to 5. `order` always holds the latest stored version so that a failure can be recorded against it.
    async fn submit(&self, order: &mut Order) -> Result<(), FulfillmentError> {
        let items = translate_items(order, &self.catalog).map_err(FulfillmentError::at(FulfillmentStep::TranslateItems))?;
        let recipient = translate_recipient(order).map_err(FulfillmentError::at(FulfillmentStep::TranslateRecipient))?;
        let provider_id = self
            .bounded(self.provider.create_order(&recipient, &items, order.id.as_str()))
            .await
            .map_err(FulfillmentError::at(FulfillmentStep::Submit))?;
        info!("📦️ Order {} submitted to the provider as draft {provider_id}", order.id);
        *order = self
            .db
            .update_order(&order.id, OrderUpdate::default().with_provider_order_id(provider_id.as_str()))
            .await
            .map_err(FulfillmentError::at(FulfillmentStep::RecordProviderId))?;
        let status = self
            .bounded(self.provider.confirm_order(&provider_id))
            .await
            .map_err(FulfillmentError::at(FulfillmentStep::Confirm))?;
        info!("📦️ Provider order {provider_id} for {} confirmed. Provider status: {status}", order.id);
        *order = self
            .db
            .update_order(&order.id, OrderUpdate::status(OrderStatusType::FulfillmentConfirmed))
            .await
            .map_err(FulfillmentError::at(FulfillmentStep::Finalize))?;
        Ok(())
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, ProviderError>
    where F: Future<Output = Result<T, ProviderError>> {
        tokio::time::timeout(self.provider_timeout, call).await.map_err(|_| {
            ProviderError::Timeout(format!("no response after {}s", self.provider_timeout.as_secs_f32()))
        })?
    }

    async fn record_failure(&self, order: Order, err: FulfillmentError) -> Order {
        error!("📦️ Fulfillment of order {} failed at step {}. {}", order.id, err.step, err.kind);
        let update = OrderUpdate::status(OrderStatusType::FulfillmentFailed).with_note(err.to_string());
        match self.db.update_order(&order.id, update).await {
            Ok(failed) => failed,
            Err(e) => {
                error!("📦️ Could not record the fulfillment failure of order {}. {e}", order.id);
                order
            },
        }
    }
}

/// Resolves every order item against the product catalog.
pub fn translate_items(order: &Order, catalog: &ProductCatalog) -> Result<Vec<ProviderLineItem>, TranslationError> {
    if order.items.is_empty() {
        return Err(TranslationError::NoItems);
    }
    order
        .items
        .iter()
        .map(|item| {
            let entry =
                catalog.lookup(&item.product_ref).ok_or_else(|| TranslationError::UnknownProduct(item.product_ref.clone()))?;
            Ok(ProviderLineItem {
                variant_ref: entry.variant_id.clone(),
                quantity: item.quantity,
                retail_price: item.unit_price.format_major(&order.currency),
                name: item.name.clone().or_else(|| entry.name.clone()),
                files: entry.files.clone(),
            })
        })
        .collect()
}

pub fn translate_recipient(order: &Order) -> Result<Recipient, TranslationError> {
    let address = order.shipping_address.as_ref().ok_or(TranslationError::MissingShippingAddress)?;
    let name = if address.name.trim().is_empty() { order.customer_name.clone() } else { address.name.clone() };
    Ok(Recipient {
        name,
        address1: address.line1.clone(),
        address2: address.line2.clone(),
        city: address.city.clone(),
        state_code: address.state.clone(),
        country_code: address.country.to_ascii_uppercase(),
        zip: address.postal_code.clone(),
        email: Some(order.customer_email.clone()),
        phone: address.phone.clone(),
    })
}
