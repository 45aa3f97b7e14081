//! Product catalogue types
//!
//! Category listings scraped from 1mg, SKUs discovered on Apollo category
//! pages, and the extra fields read from an Apollo product page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named category page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLink {
    pub name: String,
    pub url: String,
}

impl CategoryLink {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// A product card on a 1mg category page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryProduct {
    pub name: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub pack_size: String,
    /// Price as shown on the card, without the currency sign
    #[serde(default)]
    pub price: String,
    /// Falls back to `price` when the card shows no MRP
    #[serde(default)]
    pub mrp: String,
    #[serde(default)]
    pub prescription_required: bool,
    pub url: String,
}

/// Products scraped from one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryListing {
    pub category_id: usize,
    pub category_name: String,
    pub category_url: String,
    pub pages_scraped: u32,
    pub product_count: usize,
    pub products: Vec<CategoryProduct>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Progress marker of a category catalogue file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogStatus {
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "In Progress (with errors)")]
    InProgressWithErrors,
    #[serde(rename = "Complete")]
    Complete,
}

/// Output document of a category scrape, rewritten after every category
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCatalog {
    pub scraped_at: DateTime<Utc>,
    pub source: String,
    pub status: CatalogStatus,
    pub categories_completed: usize,
    pub total_categories: usize,
    pub categories_with_products: usize,
    pub total_products: usize,
    pub categories: Vec<CategoryListing>,
}

impl CategoryCatalog {
    /// Snapshot after `categories.len()` of `total_categories` are done.
    pub fn snapshot(source: &str, total_categories: usize, categories: Vec<CategoryListing>) -> Self {
        let status = if categories.len() >= total_categories {
            CatalogStatus::Complete
        } else if categories.iter().any(|c| c.error.is_some()) {
            CatalogStatus::InProgressWithErrors
        } else {
            CatalogStatus::InProgress
        };

        Self {
            scraped_at: Utc::now(),
            source: source.to_string(),
            status,
            categories_completed: categories.len(),
            total_categories,
            categories_with_products: categories.iter().filter(|c| c.product_count > 0).count(),
            total_products: categories.iter().map(|c| c.product_count).sum(),
            categories,
        }
    }
}

/// A product link found on an Apollo category page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredProduct {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub price_text: Option<String>,
}

/// SKUs discovered on one category page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredCategory {
    pub name: String,
    pub url: String,
    pub products: Vec<DiscoveredProduct>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Output document of a discovery run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuDiscovery {
    pub discovered_at: DateTime<Utc>,
    pub total_skus: usize,
    /// Every SKU found, in discovery order without repeats
    pub skus: Vec<String>,
    pub categories: Vec<DiscoveredCategory>,
}

impl SkuDiscovery {
    pub fn new(categories: Vec<DiscoveredCategory>) -> Self {
        let mut skus: Vec<String> = Vec::new();
        for product in categories.iter().flat_map(|c| &c.products) {
            if !skus.contains(&product.sku) {
                skus.push(product.sku.clone());
            }
        }

        Self {
            discovered_at: Utc::now(),
            total_skus: skus.len(),
            skus,
            categories,
        }
    }
}

/// Fields only available on the rendered Apollo product page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub main_image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub gallery_images: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn listing(id: usize, products: usize, error: Option<&str>) -> CategoryListing {
        CategoryListing {
            category_id: id,
            category_name: format!("Category {}", id),
            category_url: format!("https://www.1mg.com/categories/c-{}", id),
            pages_scraped: u32::from(products > 0),
            product_count: products,
            products: vec![CategoryProduct::default(); products],
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_catalog_snapshot_status() {
        let catalog = CategoryCatalog::snapshot("Tata 1mg", 3, vec![listing(1, 4, None)]);
        assert_eq!(catalog.status, CatalogStatus::InProgress);
        assert_eq!(catalog.categories_completed, 1);

        let catalog = CategoryCatalog::snapshot(
            "Tata 1mg",
            3,
            vec![listing(1, 4, None), listing(2, 0, Some("timeout"))],
        );
        assert_eq!(catalog.status, CatalogStatus::InProgressWithErrors);

        let catalog = CategoryCatalog::snapshot(
            "Tata 1mg",
            3,
            vec![listing(1, 4, None), listing(2, 0, Some("timeout")), listing(3, 2, None)],
        );
        assert_eq!(catalog.status, CatalogStatus::Complete);
        assert_eq!(catalog.total_products, 6);
        assert_eq!(catalog.categories_with_products, 2);

        let json = serde_json::to_value(&catalog).unwrap();
        assert_eq!(json["status"], "Complete");
        assert_eq!(json["categories"][1]["error"], "timeout");
        assert!(json["categories"][0].get("error").is_none());
    }

    #[test]
    fn test_discovery_collects_unique_skus() {
        let product = |sku: &str| DiscoveredProduct {
            sku: sku.to_string(),
            name: format!("Product {}", sku),
            price_text: None,
        };
        let discovery = SkuDiscovery::new(vec![
            DiscoveredCategory {
                name: "Vitamins".into(),
                url: "https://www.apollopharmacy.in/category/vitamins".into(),
                products: vec![product("NEU1021"), product("VIT001")],
                error: None,
            },
            DiscoveredCategory {
                name: "Fish oil".into(),
                url: "https://www.apollopharmacy.in/category/fish-oil".into(),
                products: vec![product("NEU1021"), product("OME0042")],
                error: None,
            },
        ]);

        assert_eq!(discovery.skus, vec!["NEU1021", "VIT001", "OME0042"]);
        assert_eq!(discovery.total_skus, 3);
    }
}
