use std::{
    fmt::{Debug, Display},
    time::Duration,
};

use chrono::Utc;
use log::*;
use serde::Serialize;
use serde_json::json;

use super::{errors::OrderFlowError, fulfillment_api::FulfillmentApi, notification_api::NotificationApi};
use crate::{
    db_types::{EventId, Order},
    payment_events::{PaymentEvent, PaymentEventType, Purchase, PurchaseKind},
    traits::{FulfillmentProvider, InsertOrderResult, Notifier, OrderManagement},
};

/// What happened to an event. Every outcome is a successful delivery from the gateway's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    OrderCreated,
    DuplicateOrder,
    ReceiptSent,
    DuplicateReceipt,
    Acknowledged,
    Ignored,
    Rejected,
}

impl Display for EventOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventOutcome::OrderCreated => "order_created",
            EventOutcome::DuplicateOrder => "duplicate_order",
            EventOutcome::ReceiptSent => "receipt_sent",
            EventOutcome::DuplicateReceipt => "duplicate_receipt",
            EventOutcome::Acknowledged => "acknowledged",
            EventOutcome::Ignored => "ignored",
            EventOutcome::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Orders older than this that are still not fulfilled when their event is redelivered are reported to the operator.
pub const DEFAULT_STALE_ORDER_AGE: Duration = Duration::from_secs(60);

/// Work that remains after an event has been durably recorded. Once the record exists a redelivery is treated as a
/// duplicate, so this work must run to completion even if the gateway has already been answered.
#[derive(Debug, Clone)]
pub enum FollowUp {
    /// Fulfill a new order, then notify the customer and the operator.
    Fulfill(Order),
    /// Send the receipt for an intangible purchase.
    Receipt(EventId, Purchase),
}

/// The result of recording an event. See [`OrderFlowApi::accept_event`].
#[derive(Debug, Clone)]
pub struct AcceptedEvent {
    pub outcome: EventOutcome,
    pub follow_up: Option<FollowUp>,
}

impl AcceptedEvent {
    fn done(outcome: EventOutcome) -> Self {
        Self { outcome, follow_up: None }
    }
}

/// `OrderFlowApi` is the entry point for verified payment events. It is the single place that decides what an event
/// means:
///
/// * `purchase.completed` for physical goods: store the order, fulfill it, notify the customer and the operator.
/// * `purchase.completed` for intangible goods: send a receipt. No order is stored and the provider is never called.
/// * `payment.succeeded`: acknowledged.
/// * `payment.failed`: acknowledged, with an alert to the operator.
/// * Anything else: acknowledged and ignored.
///
/// Only storage failures are returned as errors.
///
/// Handling is split in two. [`Self::accept_event`] records the event and must finish before the gateway is answered.
/// [`Self::follow_up`] does the slow work (provider calls and emails) that the record commits us to.
/// [`Self::process_event`] runs both in turn.
pub struct OrderFlowApi<B, P, N> {
    db: B,
    fulfillment: FulfillmentApi<B, P>,
    notifications: NotificationApi<N>,
    stale_after: Duration,
}

impl<B, P, N> Debug for OrderFlowApi<B, P, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi ({:?}, {:?})", self.fulfillment, self.notifications)
    }
}

impl<B, P, N> OrderFlowApi<B, P, N> {
    pub fn new(db: B, fulfillment: FulfillmentApi<B, P>, notifications: NotificationApi<N>) -> Self {
        Self { db, fulfillment, notifications, stale_after: DEFAULT_STALE_ORDER_AGE }
    }

    /// A redelivered event whose order is still not fulfilled after `age` raises an operator alert.
    pub fn with_stale_after(mut self, age: Duration) -> Self {
        self.stale_after = age;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, P, N> OrderFlowApi<B, P, N>
where
    B: OrderManagement,
    P: FulfillmentProvider,
    N: Notifier,
{
    pub async fn process_event(&self, event: PaymentEvent) -> Result<EventOutcome, OrderFlowError> {
        let accepted = self.accept_event(event).await?;
        if let Some(follow_up) = accepted.follow_up {
            self.follow_up(follow_up).await;
        }
        Ok(accepted.outcome)
    }

    /// Classifies the event and records it. Nothing after the record is written happens here; that work is returned
    /// as a [`FollowUp`].
    pub async fn accept_event(&self, event: PaymentEvent) -> Result<AcceptedEvent, OrderFlowError> {
        trace!("🔄️ Processing event {} ({})", event.id, event.event_type);
        let accepted = match event.kind() {
            PaymentEventType::PurchaseCompleted => self.process_purchase(&event).await?,
            PaymentEventType::PaymentSucceeded => {
                info!("🔄️ Payment succeeded for event {}", event.id);
                AcceptedEvent::done(EventOutcome::Acknowledged)
            },
            PaymentEventType::PaymentFailed => {
                warn!("🔄️ Payment failed for event {}", event.id);
                let details = json!({ "event_id": event.id, "data": event.data });
                self.notifications.alert_operator("Payment failed", details).await;
                AcceptedEvent::done(EventOutcome::Acknowledged)
            },
            PaymentEventType::Unhandled(event_type) => {
                info!("🔄️ Ignoring event {} of unhandled type {event_type}", event.id);
                AcceptedEvent::done(EventOutcome::Ignored)
            },
        };
        debug!("🔄️ Event {} accepted: {}", event.id, accepted.outcome);
        Ok(accepted)
    }

    /// Finishes the work of an accepted event. Never fails: fulfillment problems are recorded on the order and
    /// notification problems are logged.
    pub async fn follow_up(&self, follow_up: FollowUp) {
        match follow_up {
            FollowUp::Fulfill(order) => {
                let order = self.fulfillment.fulfill(order).await;
                self.notifications.notify_customer(&order).await;
                self.notifications.notify_operator(&order).await;
                debug!("🔄️ Order {} handled. Status: {}", order.id, order.status);
            },
            FollowUp::Receipt(event_id, purchase) => {
                self.notifications.send_receipt(&event_id, &purchase).await;
            },
        }
    }

    async fn process_purchase(&self, event: &PaymentEvent) -> Result<AcceptedEvent, OrderFlowError> {
        let purchase = match Purchase::from_event_data(&event.data) {
            Ok(p) => p,
            Err(e) => {
                error!("🔄️ Rejecting purchase event {}. {e}", event.id);
                let details = json!({ "event_id": event.id, "error": e.to_string(), "data": event.data });
                self.notifications.alert_operator("Unprocessable purchase", details).await;
                return Ok(AcceptedEvent::done(EventOutcome::Rejected));
            },
        };
        match purchase.kind {
            PurchaseKind::Intangible => self.process_intangible(event, purchase).await,
            PurchaseKind::Physical => self.process_physical(event, purchase).await,
        }
    }

    async fn process_intangible(
        &self,
        event: &PaymentEvent,
        purchase: Purchase,
    ) -> Result<AcceptedEvent, OrderFlowError> {
        if !self.db.record_event(&event.id, &event.event_type).await? {
            info!("🔄️ Receipt for event {} has already been handled", event.id);
            return Ok(AcceptedEvent::done(EventOutcome::DuplicateReceipt));
        }
        let follow_up = FollowUp::Receipt(event.id.clone(), purchase);
        Ok(AcceptedEvent { outcome: EventOutcome::ReceiptSent, follow_up: Some(follow_up) })
    }

    async fn process_physical(
        &self,
        event: &PaymentEvent,
        purchase: Purchase,
    ) -> Result<AcceptedEvent, OrderFlowError> {
        let new_order = purchase.into_new_order(event.id.clone());
        let order = match self.db.create_order_if_absent(new_order).await? {
            InsertOrderResult::AlreadyExists(order) => {
                info!("🔄️ Event {} is a redelivery of order {} ({})", event.id, order.id, order.status);
                if self.is_stalled(&order) {
                    self.report_stalled(&order).await;
                }
                return Ok(AcceptedEvent::done(EventOutcome::DuplicateOrder));
            },
            InsertOrderResult::Inserted(order) => order,
        };
        let total = order.formatted_total();
        info!("🔄️ Order {} created for event {}. Total {total} {}", order.id, event.id, order.currency);
        Ok(AcceptedEvent { outcome: EventOutcome::OrderCreated, follow_up: Some(FollowUp::Fulfill(order)) })
    }

    /// An order that has not reached a terminal status and has not changed for `stale_after`.
    fn is_stalled(&self, order: &Order) -> bool {
        if order.status.is_terminal() {
            return false;
        }
        (Utc::now() - order.updated_at).to_std().map(|age| age >= self.stale_after).unwrap_or(false)
    }

    async fn report_stalled(&self, order: &Order) {
        warn!("🔄️ Order {} has been {} since {}. It needs manual follow-up.", order.id, order.status, order.updated_at);
        let details = json!({
            "order_id": order.id,
            "source_event_id": order.source_event_id,
            "status": order.status,
            "updated_at": order.updated_at,
            "customer_email": order.customer_email,
        });
        self.notifications.alert_operator("Order stalled before fulfillment finished", details).await;
    }
}
