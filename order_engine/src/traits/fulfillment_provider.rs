use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where the provider ships the goods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state_code: Option<String>,
    pub country_code: String,
    pub zip: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderLineItem {
    /// The provider's catalog variant for this item
    pub variant_ref: String,
    pub quantity: u32,
    /// Retail price per unit in major units, e.g. "49.00"
    pub retail_price: String,
    pub name: Option<String>,
    /// Print file URLs
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderOrderId(pub String);

impl ProviderOrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProviderOrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderOrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("The provider rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("The provider did not respond in time: {0}")]
    Timeout(String),
    #[error("Could not reach the provider: {0}")]
    Transport(String),
    #[error("Unexpected provider response: {0}")]
    InvalidResponse(String),
    #[error("The request could not be built: {0}")]
    InvalidRequest(String),
}

/// A two-phase print-on-demand provider. `create_order` creates a draft that is neither charged nor produced until
/// `confirm_order` is called.
#[allow(async_fn_in_trait)]
pub trait FulfillmentProvider {
    /// Creates a draft order and returns the provider's id for it. `external_ref` is our own order id.
    async fn create_order(
        &self,
        recipient: &Recipient,
        items: &[ProviderLineItem],
        external_ref: &str,
    ) -> Result<ProviderOrderId, ProviderError>;

    /// Releases a draft for production and returns the provider's status for the order.
    async fn confirm_order(&self, id: &ProviderOrderId) -> Result<String, ProviderError>;
}
