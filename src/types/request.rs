//! Request type definitions
//!
//! Defines the GraphQL request envelope and the query inputs sent to the
//! pharmacy API.

use serde::{Deserialize, Serialize};
use serde_json::json;

const SKU_INFO_QUERY: &str = r#"
query getSkuInfo($skuInfoInput: SkuInfoInput!) {
  getSkuInfo(skuInfoInput: $skuInfoInput) {
    stat
    expiryDate
    pdpPriceInfo {
      price
      mrp
      discount
      sellingPrice
      discountPercent
    }
    tatInfo {
      magentoAvailability
      message
      unitPrice
      packInfo
    }
  }
}
"#;

const SEARCH_PRODUCTS_QUERY: &str = r#"
query searchMedicineProducts($searchText: String!, $pageSize: Int, $offset: Int) {
  searchMedicineProducts(searchText: $searchText, pageSize: $pageSize, offset: $offset) {
    products {
      id
      name
      sku
      price
      special_price
      mrp
      thumbnail
      url_key
      type_id
      is_in_stock
      is_prescription_required
    }
    total_count
  }
}
"#;

/// GraphQL request body: `{operationName, variables, query}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    /// Operation name, also the key of the payload under `data`
    pub operation_name: String,
    /// Operation variables
    pub variables: serde_json::Value,
    /// Query document
    pub query: String,
}

impl GraphqlRequest {
    /// Create a request for an arbitrary operation
    pub fn new(
        operation_name: impl Into<String>,
        variables: serde_json::Value,
        query: impl Into<String>,
    ) -> Self {
        Self {
            operation_name: operation_name.into(),
            variables,
            query: query.into(),
        }
    }

    /// `getSkuInfo` request for a single SKU
    pub fn sku_info(query: &SkuQuery) -> Self {
        Self::new(
            "getSkuInfo",
            json!({ "skuInfoInput": query }),
            SKU_INFO_QUERY,
        )
    }

    /// `searchMedicineProducts` request
    pub fn search_products(search_text: &str, page_size: u32, offset: u32) -> Self {
        Self::new(
            "searchMedicineProducts",
            json!({
                "searchText": search_text,
                "pageSize": page_size,
                "offset": offset,
            }),
            SEARCH_PRODUCTS_QUERY,
        )
    }
}

/// Input for `getSkuInfo`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuQuery {
    /// Product SKU
    pub sku: String,
    /// Quantity, always 1 for price lookups
    pub qty: u32,
    /// Location hint used for availability and pricing
    #[serde(rename = "addressInfo")]
    pub address_info: AddressInfo,
}

/// Location hint for SKU lookups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressInfo {
    pub pincode: String,
    pub lat: f64,
    pub lng: f64,
}

impl SkuQuery {
    /// Create a query for one unit of `sku` delivered to `pincode`
    pub fn new(sku: impl Into<String>, pincode: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            qty: 1,
            address_info: AddressInfo {
                pincode: pincode.into(),
                lat: 0.0,
                lng: 0.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sku_query_defaults() {
        let query = SkuQuery::new("NEU1021", "500032");
        assert_eq!(query.qty, 1);
        assert_eq!(query.address_info.pincode, "500032");
        assert_eq!(query.address_info.lat, 0.0);
    }

    #[test]
    fn test_sku_info_request_shape() {
        let request = GraphqlRequest::sku_info(&SkuQuery::new("NEU1021", ""));
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["operationName"], "getSkuInfo");
        assert_eq!(body["variables"]["skuInfoInput"]["sku"], "NEU1021");
        assert_eq!(body["variables"]["skuInfoInput"]["qty"], 1);
        assert_eq!(
            body["variables"]["skuInfoInput"]["addressInfo"]["pincode"],
            ""
        );
        assert!(body["query"].as_str().unwrap().contains("pdpPriceInfo"));
    }

    #[test]
    fn test_search_request_shape() {
        let request = GraphqlRequest::search_products("fish oil", 20, 0);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["operationName"], "searchMedicineProducts");
        assert_eq!(body["variables"]["searchText"], "fish oil");
        assert_eq!(body["variables"]["pageSize"], 20);
        assert_eq!(body["variables"]["offset"], 0);
    }
}
