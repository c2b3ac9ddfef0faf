//! Maps storefront SKUs to the fulfillment provider's catalog variants.
//!
//! The catalog is a JSON object keyed by SKU:
//!
//! ```json
//! {
//!   "POSTER-A": { "variant_id": 4011, "name": "Poster A (18x24)", "files": ["https://cdn.example.com/poster-a.png"] }
//! }
//! ```
use std::{collections::HashMap, fs, path::Path};

use log::*;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Could not read the product catalog: {0}")]
    Io(String),
    #[error("The product catalog is not valid JSON: {0}")]
    Json(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(deserialize_with = "string_or_number")]
    pub variant_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

impl CatalogEntry {
    pub fn new(variant_id: &str) -> Self {
        Self { variant_id: variant_id.to_string(), name: None, files: vec![] }
    }

    pub fn with_file(mut self, url: &str) -> Self {
        self.files.push(url.to_string());
        self
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Ref {
        Text(String),
        Number(u64),
    }
    Ok(match Ref::deserialize(deserializer)? {
        Ref::Text(s) => s,
        Ref::Number(n) => n.to_string(),
    })
}

#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, sku: &str, entry: CatalogEntry) -> Self {
        self.entries.insert(sku.to_string(), entry);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let entries = serde_json::from_str::<HashMap<String, CatalogEntry>>(json)
            .map_err(|e| CatalogError::Json(e.to_string()))?;
        Ok(Self { entries })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| CatalogError::Io(format!("{}: {e}", path.display())))?;
        let catalog = Self::from_json_str(&json)?;
        info!("📦️ Loaded {} products from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Loads the catalog named by `STORE_PRODUCT_CATALOG`. If the variable is not set, the catalog is empty and every
    /// physical order will fail fulfillment until one is configured.
    pub fn try_from_env() -> Result<Self, CatalogError> {
        match store_common::helpers::env_string("STORE_PRODUCT_CATALOG") {
            Some(path) => Self::from_file(path),
            None => {
                warn!("🪛️ STORE_PRODUCT_CATALOG is not set. The product catalog is empty.");
                Ok(Self::default())
            },
        }
    }

    pub fn lookup(&self, sku: &str) -> Option<&CatalogEntry> {
        self.entries.get(sku)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_catalog() {
        let catalog = ProductCatalog::from_json_str(
            r#"{
                "POSTER-A": { "variant_id": 4011, "name": "Poster A", "files": ["https://cdn.example.com/a.png"] },
                "MUG-B": { "variant_id": "mug-11oz" }
            }"#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.lookup("POSTER-A").unwrap().variant_id, "4011");
        assert_eq!(catalog.lookup("POSTER-A").unwrap().files.len(), 1);
        assert_eq!(catalog.lookup("MUG-B").unwrap(), &CatalogEntry::new("mug-11oz"));
        assert!(catalog.lookup("POSTER-Z").is_none());
    }

    #[test]
    fn bad_catalogs() {
        assert!(matches!(ProductCatalog::from_json_str("[1,2]"), Err(CatalogError::Json(_))));
        assert!(matches!(ProductCatalog::from_file("/definitely/not/here.json"), Err(CatalogError::Io(_))));
    }
}
