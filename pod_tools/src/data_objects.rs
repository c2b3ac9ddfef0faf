use serde::{Deserialize, Serialize};

/// Shipping destination in the provider's schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodRecipient {
    pub name: String,
    pub address1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_code: Option<String>,
    pub country_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodFile {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodLineItem {
    pub variant_id: u64,
    pub quantity: u32,
    /// Price charged to the customer, in major units, e.g. "49.00"
    pub retail_price: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<PodFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPodOrder {
    /// Our own order id. The provider echoes it back and lets us look orders up by it.
    pub external_id: String,
    pub recipient: PodRecipient,
    pub items: Vec<PodLineItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodOrder {
    pub id: u64,
    #[serde(default)]
    pub external_id: Option<String>,
    /// e.g. "draft", "pending", "inprocess", "fulfilled", "canceled"
    pub status: String,
    #[serde(default)]
    pub created: Option<i64>,
}

/// Every provider response is wrapped in this envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodResponse<T> {
    pub code: u16,
    pub result: T,
}
