use std::time::Duration;

use log::*;
use store_common::{
    helpers::{env_duration_secs, env_string},
    Secret,
};

use crate::PodApiError;

const DEFAULT_POD_API_URL: &str = "https://api.printful.com";
const DEFAULT_POD_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone)]
pub struct PodConfig {
    /// Base url of the provider REST API, without a trailing slash. e.g. "https://api.printful.com"
    pub api_url: String,
    pub api_token: Secret<String>,
    /// Some provider accounts host several stores, in which case the store must be named on every request.
    pub store_id: Option<String>,
    /// Applied to every request made by the client.
    pub timeout: Duration,
}

impl Default for PodConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_POD_API_URL.to_string(),
            api_token: Secret::default(),
            store_id: None,
            timeout: DEFAULT_POD_TIMEOUT,
        }
    }
}

impl PodConfig {
    pub fn new(api_url: &str, api_token: &str) -> Self {
        Self { api_url: api_url.to_string(), api_token: Secret::new(api_token.to_string()), ..Default::default() }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Loads the provider configuration from `STORE_POD_*` environment variables. The API token is mandatory.
    pub fn try_from_env() -> Result<Self, PodApiError> {
        let api_url = env_string("STORE_POD_API_URL").unwrap_or_else(|| {
            info!("🪛️ STORE_POD_API_URL is not set. Using {DEFAULT_POD_API_URL}");
            DEFAULT_POD_API_URL.to_string()
        });
        let api_token = env_string("STORE_POD_API_TOKEN")
            .map(Secret::new)
            .ok_or_else(|| PodApiError::Configuration("STORE_POD_API_TOKEN is not set".to_string()))?;
        let store_id = env_string("STORE_POD_STORE_ID");
        let timeout = env_duration_secs("STORE_PROVIDER_TIMEOUT_SECS", DEFAULT_POD_TIMEOUT);
        Ok(Self { api_url: api_url.trim_end_matches('/').to_string(), api_token, store_id, timeout })
    }
}
