//! Response type definitions
//!
//! Defines the GraphQL response envelope and the payloads returned by the
//! pharmacy API, plus the flattened [`ProductInfo`] view written to output
//! files.

use serde::{Deserialize, Serialize};

use super::serde_helpers::{
    deserialize_flexible_bool, deserialize_flexible_f64, deserialize_null_as_default,
};

/// GraphQL response envelope: `{data: {...}} | {errors: [...]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphqlResponse {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "deserialize_null_as_default")]
    pub errors: Vec<GraphqlError>,
}

/// A single GraphQL error entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphqlError {
    #[serde(default, deserialize_with = "deserialize_null_as_default")]
    pub message: String,
    #[serde(default)]
    pub extensions: Option<GraphqlErrorExtensions>,
}

/// Structured error metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphqlErrorExtensions {
    #[serde(default)]
    pub code: Option<String>,
}

impl GraphqlError {
    /// Error code from `extensions.code`, if any
    pub fn code(&self) -> Option<&str> {
        self.extensions.as_ref().and_then(|ext| ext.code.as_deref())
    }
}

impl GraphqlResponse {
    /// Join all error messages for reporting
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| match e.code() {
                Some(code) if e.message.is_empty() => code.to_string(),
                Some(code) => format!("{} ({})", e.message, code),
                None => e.message.clone(),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// `getSkuInfo` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuInfo {
    /// Availability status
    #[serde(default)]
    pub stat: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub pdp_price_info: Option<PdpPriceInfo>,
    #[serde(default)]
    pub tat_info: Option<TatInfo>,
}

/// Price block of a SKU
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdpPriceInfo {
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    pub mrp: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    pub discount: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    pub selling_price: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    pub discount_percent: Option<f64>,
}

/// Stock / delivery-timing block of a SKU
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TatInfo {
    #[serde(default, deserialize_with = "deserialize_flexible_bool")]
    pub magento_availability: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub pack_info: Option<String>,
}

/// `searchMedicineProducts` payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub products: Vec<SearchProduct>,
    #[serde(default)]
    pub total_count: Option<u64>,
}

/// One product in a search result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchProduct {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    pub special_price: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    pub mrp: Option<f64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub url_key: Option<String>,
    #[serde(default)]
    pub type_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flexible_bool")]
    pub is_in_stock: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_flexible_bool")]
    pub is_prescription_required: Option<bool>,
}

/// Flattened product view combining pricing and availability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfo {
    pub sku: String,
    pub product_url: String,
    pub stats: Option<String>,
    pub expiry_date: Option<String>,
    pub pricing: PdpPriceInfo,
    pub availability: Availability,
    /// Full `getSkuInfo` payload
    pub raw_data: SkuInfo,
}

/// Availability portion of [`ProductInfo`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub in_stock: Option<bool>,
    pub message: Option<String>,
    pub unit_price: Option<f64>,
    pub pack_info: Option<String>,
}

impl ProductInfo {
    /// Build the product view for `sku` from its SKU info
    pub fn from_sku_info(sku: impl Into<String>, product_base_url: &str, info: &SkuInfo) -> Self {
        let sku = sku.into();
        let tat = info.tat_info.clone().unwrap_or_default();

        Self {
            product_url: format!("{}{}", product_base_url, sku),
            sku,
            stats: info.stat.clone(),
            expiry_date: info.expiry_date.clone(),
            pricing: info.pdp_price_info.clone().unwrap_or_default(),
            availability: Availability {
                in_stock: tat.magento_availability,
                message: tat.message,
                unit_price: tat.unit_price,
                pack_info: tat.pack_info,
            },
            raw_data: info.clone(),
        }
    }
}
