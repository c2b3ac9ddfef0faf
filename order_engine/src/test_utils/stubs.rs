use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use serde_json::Value;

use crate::traits::{
    FulfillmentProvider,
    NotificationError,
    NotificationTemplate,
    Notifier,
    ProviderError,
    ProviderLineItem,
    ProviderOrderId,
    Recipient,
};

#[derive(Debug, Default)]
struct ProviderState {
    created: Vec<(String, Recipient, Vec<ProviderLineItem>)>,
    confirmed: Vec<ProviderOrderId>,
    create_error: Option<ProviderError>,
    confirm_error: Option<ProviderError>,
    delay: Option<Duration>,
}

/// An in-memory fulfillment provider that records every call. Clones share their state.
#[derive(Debug, Clone, Default)]
pub struct StubProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_create(self, err: ProviderError) -> Self {
        self.state.lock().unwrap().create_error = Some(err);
        self
    }

    pub fn failing_confirm(self, err: ProviderError) -> Self {
        self.state.lock().unwrap().confirm_error = Some(err);
        self
    }

    /// Every call sleeps for `delay` before answering.
    pub fn stalling(self, delay: Duration) -> Self {
        self.state.lock().unwrap().delay = Some(delay);
        self
    }

    /// External refs of every created draft, in call order
    pub fn created(&self) -> Vec<String> {
        self.state.lock().unwrap().created.iter().map(|(r, _, _)| r.clone()).collect()
    }

    pub fn created_items(&self) -> Vec<Vec<ProviderLineItem>> {
        self.state.lock().unwrap().created.iter().map(|(_, _, items)| items.clone()).collect()
    }

    pub fn confirmed(&self) -> Vec<ProviderOrderId> {
        self.state.lock().unwrap().confirmed.clone()
    }

    fn delay(&self) -> Option<Duration> {
        self.state.lock().unwrap().delay
    }
}

impl FulfillmentProvider for StubProvider {
    async fn create_order(
        &self,
        recipient: &Recipient,
        items: &[ProviderLineItem],
        external_ref: &str,
    ) -> Result<ProviderOrderId, ProviderError> {
        if let Some(delay) = self.delay() {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        if let Some(e) = state.create_error.clone() {
            return Err(e);
        }
        state.created.push((external_ref.to_string(), recipient.clone(), items.to_vec()));
        Ok(ProviderOrderId(format!("pod_{}", state.created.len())))
    }

    async fn confirm_order(&self, id: &ProviderOrderId) -> Result<String, ProviderError> {
        if let Some(delay) = self.delay() {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        if let Some(e) = state.confirm_error.clone() {
            return Err(e);
        }
        state.confirmed.push(id.clone());
        Ok("pending".to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentNotification {
    pub to: String,
    pub template: NotificationTemplate,
    pub data: Value,
}

#[derive(Debug, Default)]
struct NotifierState {
    sent: Vec<SentNotification>,
    failing: bool,
    delay: Option<Duration>,
}

/// A notifier that records what it was asked to send. A failing notifier still records the attempt.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    state: Arc<Mutex<NotifierState>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(self) -> Self {
        self.state.lock().unwrap().failing = true;
        self
    }

    pub fn stalling(self, delay: Duration) -> Self {
        self.state.lock().unwrap().delay = Some(delay);
        self
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn sent_templates(&self) -> Vec<NotificationTemplate> {
        self.state.lock().unwrap().sent.iter().map(|n| n.template).collect()
    }
}

impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, template: NotificationTemplate, data: Value) -> Result<(), NotificationError> {
        let delay = self.state.lock().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        state.sent.push(SentNotification { to: to.to_string(), template, data });
        if state.failing {
            Err(NotificationError::Transport("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}
