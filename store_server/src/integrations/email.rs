use std::{sync::Arc, time::Duration};

use log::*;
use order_engine::traits::{NotificationError, NotificationTemplate, Notifier};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
};
use serde::Serialize;
use serde_json::Value;
use store_common::{
    helpers::{env_duration_secs, env_string},
    Secret,
};

use crate::errors::ServerError;

const DEFAULT_EMAIL_API_URL: &str = "https://api.resend.com";
const DEFAULT_EMAIL_FROM: &str = "orders@localhost";
const DEFAULT_NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: Secret<String>,
    pub from: String,
    /// Bound on a single send.
    pub timeout: Duration,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_EMAIL_API_URL.to_string(),
            api_key: Secret::default(),
            from: DEFAULT_EMAIL_FROM.to_string(),
            timeout: DEFAULT_NOTIFICATION_TIMEOUT,
        }
    }
}

impl EmailConfig {
    pub fn new(api_url: &str, api_key: &str) -> Self {
        Self { api_url: api_url.to_string(), api_key: Secret::new(api_key.to_string()), ..Default::default() }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let api_url = env_string("STORE_EMAIL_API_URL").unwrap_or_else(|| DEFAULT_EMAIL_API_URL.to_string());
        let api_key = env_string("STORE_EMAIL_API_KEY")
            .map(Secret::new)
            .ok_or_else(|| ServerError::ConfigurationError("STORE_EMAIL_API_KEY is not set".to_string()))?;
        let from = env_string("STORE_EMAIL_FROM").unwrap_or_else(|| {
            warn!("🪛️ STORE_EMAIL_FROM is not set. Emails will be sent from {DEFAULT_EMAIL_FROM}");
            DEFAULT_EMAIL_FROM.to_string()
        });
        let timeout = env_duration_secs("STORE_NOTIFICATION_TIMEOUT_SECS", DEFAULT_NOTIFICATION_TIMEOUT);
        Ok(Self { api_url: api_url.trim_end_matches('/').to_string(), api_key, from, timeout })
    }
}

#[derive(Debug, Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: String,
    template: &'static str,
    data: Value,
}

/// Sends templated emails through the transactional email service.
#[derive(Clone)]
pub struct EmailNotifier {
    config: EmailConfig,
    client: Arc<Client>,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Result<Self, ServerError> {
        if config.api_key.is_blank() {
            return Err(ServerError::ConfigurationError("The email service key is empty".to_string()));
        }
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key.reveal()))
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self) -> String {
        format!("{}/emails", self.config.api_url.trim_end_matches('/'))
    }
}

impl Notifier for EmailNotifier {
    async fn send(&self, to: &str, template: NotificationTemplate, data: Value) -> Result<(), NotificationError> {
        if !to.contains('@') {
            return Err(NotificationError::InvalidRecipient(to.to_string()));
        }
        let subject = template.subject(&data);
        let email = OutgoingEmail { from: &self.config.from, to: [to], subject, template: template.as_str(), data };
        trace!("✉️ Posting {template} email for {to}");
        let response = self.client.post(self.url()).json(&email).send().await.map_err(|e| {
            if e.is_timeout() {
                NotificationError::Timeout
            } else {
                NotificationError::Transport(e.to_string())
            }
        })?;
        let status = response.status();
        if status.is_success() {
            debug!("✉️ Email service accepted {template} email for {to}");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NotificationError::Rejected { status: status.as_u16(), body })
        }
    }
}
