//! 1mg category product scraper
//!
//! Category pages list product cards much like the medicine index does; a
//! category is walked page by page until it runs out of cards.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use super::human::{self, BROWSE, SKIM};
use super::listing::{ListingPage, ListingSource, paginate};
use crate::{
    Result,
    session::BrowserSession,
    types::{CategoryLink, CategoryListing, CategoryProduct},
};

/// Source label written into category catalogues
pub const CATEGORY_SOURCE: &str = "Tata 1mg";

const CATEGORIES: &[(&str, &str)] = &[
    ("Vitamins & Supplements", "https://www.1mg.com/categories/vitamins-supplements-328"),
    ("Ayurveda", "https://www.1mg.com/categories/ayurveda-104"),
    ("Homeopathy", "https://www.1mg.com/categories/homeopathy-105"),
    ("Fitness & Wellness", "https://www.1mg.com/categories/fitness-wellness-330"),
    ("Mom & Baby", "https://www.1mg.com/categories/mom-baby-329"),
    ("Devices", "https://www.1mg.com/categories/devices-106"),
    ("Personal Care", "https://www.1mg.com/categories/personal-care-108"),
    ("Health Food & Drinks", "https://www.1mg.com/categories/health-food-drinks-107"),
    ("Skin Care", "https://www.1mg.com/categories/skin-care-331"),
    ("Home Care", "https://www.1mg.com/categories/home-care-332"),
    ("Diabetic Care", "https://www.1mg.com/categories/diabetic-care-333"),
    ("Elderly Care", "https://www.1mg.com/categories/elderly-care-334"),
    ("Sexual Wellness", "https://www.1mg.com/categories/sexual-wellness-335"),
    ("Health Conditions", "https://www.1mg.com/categories/health-conditions-336"),
];

/// Cards appear late on category pages
const PRODUCT_CARD_SELECTOR: &str =
    r#"div[class*="style__product-card"], div[class*="ProductCard"], a[href*="/drugs/"]"#;

/// Finds product containers (falling back to any div holding a product link
/// and a price) and reads one card from each
const EXTRACT_PRODUCTS_SCRIPT: &str = r#"
(() => {
    const productLink = 'a[href*="/drugs/"], a[href*="/otc/"]';
    let containers = document.querySelectorAll('div[class*="style__product-card"]');
    if (containers.length === 0) {
        containers = document.querySelectorAll('div[class*="ProductCard"], div[class*="product"]');
    }
    if (containers.length === 0) {
        containers = Array.from(document.querySelectorAll('div')).filter(div =>
            div.querySelector(productLink) &&
            (div.innerText.includes('₹') || div.innerText.includes('MRP')));
    }

    const products = [];
    const seen = new Set();
    Array.from(containers).forEach(container => {
        try {
            const link = container.querySelector(productLink);
            if (!link || seen.has(link.href)) return;

            let name = container.querySelector('div[class*="name"], h3, h2, .product-name')?.innerText?.trim();
            if (!name) {
                name = link.innerText?.split('\n')[0]?.trim();
            }
            if (!name || name.length <= 2) return;

            const text = container.innerText;
            const price = text.match(/₹\s*([\d,]+\.?\d*)/);
            const mrp = text.match(/MRP\s*₹\s*([\d,]+\.?\d*)/i);

            seen.add(link.href);
            products.push({
                name,
                manufacturer: container.querySelector('div[class*="manufacturer"], div[class*="Manufacturer"]')?.innerText?.trim() || 'N/A',
                packSize: container.querySelector('div[class*="pack"], div[class*="Pack"]')?.innerText?.trim() || 'N/A',
                price: price ? price[1] : '',
                mrp: mrp ? mrp[1] : (price ? price[1] : ''),
                prescriptionRequired: text.includes('Prescription'),
                url: link.href
            });
        } catch (e) {}
    });

    const next = document.querySelector('a[rel="next"], a[class*="next"]:not([class*="disabled"])');
    return { products, hasNext: !!next };
})()
"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractedCategoryPage {
    #[serde(default)]
    products: Vec<CategoryProduct>,
    #[serde(default)]
    has_next: bool,
}

/// The built-in 1mg category list
pub fn default_categories() -> Vec<CategoryLink> {
    CATEGORIES
        .iter()
        .map(|(name, url)| CategoryLink::new(*name, *url))
        .collect()
}

/// Pick categories by name, case-insensitively. An empty `names` keeps all.
pub fn select_categories(all: Vec<CategoryLink>, names: &[String]) -> Result<Vec<CategoryLink>> {
    if names.is_empty() {
        return Ok(all);
    }

    names
        .iter()
        .map(|wanted| {
            all.iter()
                .find(|c| c.name.eq_ignore_ascii_case(wanted.trim()))
                .cloned()
                .ok_or_else(|| crate::Error::config(format!("Unknown category: {}", wanted)))
        })
        .collect()
}

/// URL of page `page` of a category; page 1 is the category URL itself.
pub fn category_page_url(category_url: &str, page: u32) -> Result<String> {
    if page <= 1 {
        return Ok(category_url.to_string());
    }

    let mut url = Url::parse(category_url)?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("page", &page.to_string());
    Ok(url.into())
}

/// Product pages of one category, read through a browser session
#[derive(Debug)]
pub struct CategoryScraper<'a> {
    session: &'a BrowserSession,
    category: CategoryLink,
    page_load_timeout: Duration,
}

impl<'a> CategoryScraper<'a> {
    pub fn new(session: &'a BrowserSession, category: CategoryLink, page_load_timeout: Duration) -> Self {
        Self {
            session,
            category,
            page_load_timeout,
        }
    }

    /// Scrape up to `max_pages` pages of the category.
    ///
    /// `id` is the category's 1-based position in the run.
    pub async fn scrape(&mut self, id: usize, max_pages: u32, page_delay: Duration) -> CategoryListing {
        info!("Scraping category {}", self.category.name);
        let outcome = paginate(self, 1, max_pages, page_delay).await;

        if outcome.records.is_empty() && outcome.error.is_none() {
            warn!("No products found in {}", self.category.name);
        }

        CategoryListing {
            category_id: id,
            category_name: self.category.name.clone(),
            category_url: self.category.url.clone(),
            pages_scraped: outcome.pages_scraped,
            product_count: outcome.records.len(),
            products: outcome.records,
            error: outcome.error,
        }
    }
}

#[async_trait]
impl ListingSource for CategoryScraper<'_> {
    type Record = CategoryProduct;

    async fn fetch_page(&mut self, page: u32) -> Result<ListingPage<CategoryProduct>> {
        let url = category_page_url(&self.category.url, page)?;
        self.session.navigate(&url, self.page_load_timeout).await?;

        let routine = if page == 1 { BROWSE } else { SKIM };
        human::perform(self.session.page(), routine).await;

        if !self
            .session
            .wait_for_selector(PRODUCT_CARD_SELECTOR, self.page_load_timeout)
            .await?
        {
            warn!("Product cards not found on {}, extracting anyway", url);
        }

        let extracted: ExtractedCategoryPage =
            self.session.evaluate_json(EXTRACT_PRODUCTS_SCRIPT).await?;

        Ok(ListingPage {
            records: extracted.products,
            has_next: extracted.has_next,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_default_categories() {
        let categories = default_categories();
        assert_eq!(categories.len(), 14);
        assert_eq!(categories[0].name, "Vitamins & Supplements");
        assert!(categories.iter().all(|c| c.url.starts_with("https://www.1mg.com/categories/")));
    }

    #[test]
    fn test_select_categories_by_name() {
        let picked = select_categories(
            default_categories(),
            &["ayurveda".to_string(), " Skin Care ".to_string()],
        )
        .unwrap();
        let names: Vec<_> = picked.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Ayurveda", "Skin Care"]);

        assert_eq!(select_categories(default_categories(), &[]).unwrap().len(), 14);
    }

    #[test]
    fn test_select_unknown_category_fails() {
        let err = select_categories(default_categories(), &["Groceries".to_string()]).unwrap_err();
        assert!(err.to_string().contains("Unknown category: Groceries"));
    }

    #[rstest]
    #[case("https://www.1mg.com/categories/ayurveda-104", 1, "https://www.1mg.com/categories/ayurveda-104")]
    #[case("https://www.1mg.com/categories/ayurveda-104", 3, "https://www.1mg.com/categories/ayurveda-104?page=3")]
    #[case("https://www.1mg.com/categories/ayurveda-104?sort=price&page=2", 4, "https://www.1mg.com/categories/ayurveda-104?sort=price&page=4")]
    fn test_category_page_url(#[case] base: &str, #[case] page: u32, #[case] expected: &str) {
        assert_eq!(category_page_url(base, page).unwrap(), expected);
    }

    #[test]
    fn test_category_page_url_rejects_bad_url() {
        assert!(category_page_url("not a url", 2).is_err());
    }

    #[test]
    fn test_extracted_page_decoding() {
        let page: ExtractedCategoryPage = serde_json::from_value(serde_json::json!({
            "products": [{
                "name": "Chyawanprash",
                "manufacturer": "Dabur",
                "packSize": "jar of 1 Kg",
                "price": "375",
                "mrp": "399",
                "prescriptionRequired": false,
                "url": "https://www.1mg.com/otc/dabur-chyawanprash-otc123"
            }],
            "hasNext": false
        }))
        .unwrap();

        assert!(!page.has_next);
        assert_eq!(page.products[0].pack_size, "jar of 1 Kg");
        assert_eq!(page.products[0].mrp, "399");
    }
}
