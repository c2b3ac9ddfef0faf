use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::PodConfig,
    data_objects::{NewPodOrder, PodOrder, PodResponse},
    PodApiError,
};

#[derive(Clone)]
pub struct PodApi {
    config: PodConfig,
    client: Arc<Client>,
}

impl PodApi {
    pub fn new(config: PodConfig) -> Result<Self, PodApiError> {
        if config.api_token.is_blank() {
            return Err(PodApiError::Configuration("The provider API token is empty".to_string()));
        }
        let mut headers = HeaderMap::with_capacity(3);
        let val = HeaderValue::from_str(format!("Bearer {}", config.api_token.reveal()).as_str())
            .map_err(|e| PodApiError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        if let Some(store_id) = &config.store_id {
            let val = HeaderValue::from_str(store_id).map_err(|e| PodApiError::Initialization(e.to_string()))?;
            headers.insert("X-PF-Store-Id", val);
        }
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| PodApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, PodApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| PodApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await?;
            Err(PodApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url.trim_end_matches('/'))
    }

    /// Creates a draft order. Drafts are held by the provider until [`Self::confirm_order`] is called.
    pub async fn create_order(&self, order: &NewPodOrder) -> Result<PodOrder, PodApiError> {
        debug!("Submitting draft order for {}", order.external_id);
        let result =
            self.rest_query::<PodResponse<PodOrder>, _>(Method::POST, "/orders", Some(order)).await?.result;
        info!("Provider created draft order #{} for {}", result.id, order.external_id);
        Ok(result)
    }

    /// Releases a draft order for production.
    pub async fn confirm_order(&self, order_id: u64) -> Result<PodOrder, PodApiError> {
        let path = format!("/orders/{order_id}/confirm");
        debug!("Confirming provider order #{order_id}");
        let result = self.rest_query::<PodResponse<PodOrder>, ()>(Method::POST, &path, None).await?.result;
        info!("Provider order #{order_id} confirmed with status {}", result.status);
        Ok(result)
    }

    /// Fetches the current state of a provider order, e.g. to find out whether a confirmation that failed in transit
    /// went through.
    pub async fn get_order(&self, order_id: u64) -> Result<PodOrder, PodApiError> {
        let path = format!("/orders/{order_id}");
        debug!("Fetching provider order #{order_id}");
        let result = self.rest_query::<PodResponse<PodOrder>, ()>(Method::GET, &path, None).await?.result;
        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn urls() {
        let api = PodApi::new(PodConfig::new("https://pod.example.com/", "token")).unwrap();
        assert_eq!(api.url("/orders/13/confirm"), "https://pod.example.com/orders/13/confirm");
    }

    #[test]
    fn blank_token_is_rejected() {
        let err = PodApi::new(PodConfig::new("https://pod.example.com", "  ")).err().unwrap();
        assert!(matches!(err, PodApiError::Configuration(_)));
    }
}
