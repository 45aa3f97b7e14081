//! Apollo catalogue discovery
//!
//! The GraphQL API needs SKUs up front. They are found by walking category
//! links from the homepage and reading product links on each category page.
//! The product page itself carries a few fields the API does not return.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use super::human::{self, Gesture};
use crate::{
    Error, Result,
    session::BrowserSession,
    types::{CategoryLink, DiscoveredProduct, ProductPage},
};

/// Category pages render their grid a moment after the DOM is ready
const SETTLE: Duration = Duration::from_millis(3000);

/// Three screens of scrolling to trigger lazy-loaded products
const LOAD_MORE: &[Gesture] = &[
    Gesture::Wheel { delta_y: 768.0 },
    Gesture::Pause(Duration::from_millis(1000)),
    Gesture::Wheel { delta_y: 768.0 },
    Gesture::Pause(Duration::from_millis(1000)),
    Gesture::Wheel { delta_y: 768.0 },
    Gesture::Pause(Duration::from_millis(1000)),
];

const CATEGORY_LINKS_SCRIPT: &str = r#"
(() => {
    const categories = [];
    const seen = new Set();
    document.querySelectorAll('a[href*="/category/"], a[href*="/otc"], a[href*="/medicines"]').forEach(link => {
        const name = link.textContent?.trim();
        if (!link.href || !name || seen.has(link.href) || name.length <= 2 || name.length >= 50) return;
        seen.add(link.href);
        categories.push({ name, url: link.href });
    });
    return categories;
})()
"#;

/// Raw product links; SKUs are derived outside the page
const PRODUCT_LINKS_SCRIPT: &str = r#"
(() => Array.from(document.querySelectorAll('a[href*="/medicine-info/"], a[href*="/otc/"]')).map(link => {
    const skuHolder = link.closest('[data-sku]') || link.querySelector('[data-sku]');
    const nameEl = link.querySelector('h2, h3, [class*="name"], [class*="Name"], [class*="title"]') || link;
    const priceEl = link.querySelector('[class*="price"], [class*="Price"]') ||
        link.closest('[class*="product"]')?.querySelector('[class*="price"]');
    return {
        href: link.href,
        dataSku: skuHolder ? skuHolder.getAttribute('data-sku') : null,
        name: nameEl?.textContent?.trim() || '',
        priceText: priceEl?.textContent?.trim() || null
    };
}))()
"#;

const PRODUCT_PAGE_SCRIPT: &str = r#"
(() => {
    const text = sel => document.querySelector(sel)?.textContent?.trim() || null;
    const image = document.querySelector('img[alt*="product"], .product-image img, [class*="ProductImage"] img');
    return {
        name: text('h1'),
        mainImage: image ? image.src : null,
        description: text('[class*="description"], .product-description'),
        galleryImages: Array.from(document.querySelectorAll('.product-gallery img, [class*="gallery"] img')).map(img => img.src)
    };
})()
"#;

/// A product link as read from the page
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductLink {
    pub href: String,
    #[serde(default)]
    pub data_sku: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price_text: Option<String>,
}

/// SKU encoded in an Apollo product URL.
///
/// Takes the slug after `/medicine-info/` or `/otc/` and prefers a code of
/// three or more letters followed by three or more digits inside it.
pub fn sku_from_href(href: &str) -> Option<String> {
    let lower = href.to_ascii_lowercase();
    let start = ["/medicine-info/", "/otc/"]
        .iter()
        .filter_map(|marker| lower.find(marker).map(|i| i + marker.len()))
        .min()?;

    let slug: &str = href[start..]
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    if slug.is_empty() {
        return None;
    }

    Some(sku_code(slug).unwrap_or(slug).to_string())
}

/// First run of 3+ ASCII letters directly followed by 3+ digits
fn sku_code(slug: &str) -> Option<&str> {
    let bytes = slug.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_alphabetic() {
            i += 1;
            continue;
        }
        let letters_end = i + bytes[i..].iter().take_while(|b| b.is_ascii_alphabetic()).count();
        let digits_end =
            letters_end + bytes[letters_end..].iter().take_while(|b| b.is_ascii_digit()).count();
        if letters_end - i >= 3 && digits_end - letters_end >= 3 {
            return Some(&slug[i..digits_end]);
        }
        i = letters_end;
    }
    None
}

/// Turn raw links into unique products, keeping at most `max_products`.
///
/// A `data-sku` attribute overrides the URL-derived SKU. Links with a short
/// SKU or name are dropped. A repeated SKU keeps its first position and its
/// last details.
pub fn collect_products(links: Vec<ProductLink>, max_products: usize) -> Vec<DiscoveredProduct> {
    let mut products: Vec<DiscoveredProduct> = Vec::new();

    for link in links {
        let sku = link
            .data_sku
            .filter(|s| s.trim().len() > 2)
            .or_else(|| sku_from_href(&link.href));
        let Some(sku) = sku.map(|s| s.trim().to_ascii_uppercase()) else {
            continue;
        };
        let name = link.name.trim().to_string();
        if sku.len() <= 2 || name.chars().count() <= 3 {
            continue;
        }

        let product = DiscoveredProduct {
            sku,
            name,
            price_text: link.price_text,
        };
        match products.iter_mut().find(|p| p.sku == product.sku) {
            Some(existing) => *existing = product,
            None => products.push(product),
        }
    }

    products.truncate(max_products);
    products
}

/// Category links on the Apollo homepage
pub async fn discover_categories(
    session: &BrowserSession,
    homepage_url: &str,
    timeout: Duration,
) -> Result<Vec<CategoryLink>> {
    session.navigate(homepage_url, timeout).await?;
    tokio::time::sleep(SETTLE).await;

    let categories: Vec<CategoryLink> = session.evaluate_json(CATEGORY_LINKS_SCRIPT).await?;
    info!("Found {} categories", categories.len());
    Ok(categories)
}

/// Products linked from one category page
pub async fn discover_category_products(
    session: &BrowserSession,
    category_url: &str,
    max_products: usize,
    timeout: Duration,
) -> Result<Vec<DiscoveredProduct>> {
    session.navigate(category_url, timeout).await?;
    tokio::time::sleep(SETTLE).await;
    human::perform(session.page(), LOAD_MORE).await;

    let links: Vec<ProductLink> = session.evaluate_json(PRODUCT_LINKS_SCRIPT).await?;
    debug!("{} product links on {}", links.len(), category_url);

    let products = collect_products(links, max_products);
    info!("Found {} unique products on {}", products.len(), category_url);
    Ok(products)
}

/// Read the product page of `sku`
pub async fn scrape_product_page(
    session: &BrowserSession,
    product_base_url: &str,
    sku: &str,
    timeout: Duration,
) -> Result<ProductPage> {
    let url = format!("{}{}", product_base_url, sku);
    session.navigate(&url, timeout).await?;

    let mut page: ProductPage = session.evaluate_json(PRODUCT_PAGE_SCRIPT).await?;
    if page.name.is_none() && page.description.is_none() {
        return Err(Error::extraction_empty(url));
    }

    page.sku = sku.to_string();
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn link(href: &str, data_sku: Option<&str>, name: &str) -> ProductLink {
        ProductLink {
            href: href.to_string(),
            data_sku: data_sku.map(str::to_string),
            name: name.to_string(),
            price_text: None,
        }
    }

    #[rstest]
    #[case("https://www.apollopharmacy.in/otc/neuherbs-deep-sea-fish-oil-NEU1021", Some("NEU1021"))]
    #[case("https://www.apollopharmacy.in/medicine-info/dolo-650-tablet?src=cat", Some("dolo-650-tablet"))]
    #[case("https://www.apollopharmacy.in/medicine-info/crocin650/", Some("crocin650"))]
    #[case("https://www.apollopharmacy.in/otc/ab12-xyz0042#reviews", Some("xyz0042"))]
    #[case("https://www.apollopharmacy.in/otc/", None)]
    #[case("https://www.apollopharmacy.in/category/vitamins", None)]
    fn test_sku_from_href(#[case] href: &str, #[case] expected: Option<&str>) {
        assert_eq!(sku_from_href(href).as_deref(), expected);
    }

    #[test]
    fn test_collect_products_dedupes_and_limits() {
        let links = vec![
            link("https://www.apollopharmacy.in/otc/fish-oil-NEU1021", None, "Fish Oil"),
            link("https://www.apollopharmacy.in/otc/some-slug", Some("vit001"), "Vitamin C"),
            link("https://www.apollopharmacy.in/otc/fish-oil-NEU1021", None, "Fish Oil 60s"),
            link("https://www.apollopharmacy.in/otc/x", None, "Too short sku"),
            link("https://www.apollopharmacy.in/otc/ok-OME0042", None, "Ome"),
            link("https://www.apollopharmacy.in/otc/zinc-ZIN0100", None, "Zinc Tablets"),
        ];

        let products = collect_products(links.clone(), 10);
        let skus: Vec<_> = products.iter().map(|p| p.sku.as_str()).collect();
        assert_eq!(skus, vec!["NEU1021", "VIT001", "ZIN0100"]);
        assert_eq!(products[0].name, "Fish Oil 60s");

        assert_eq!(collect_products(links, 2).len(), 2);
    }

    #[test]
    fn test_product_page_decoding() {
        let page: ProductPage = serde_json::from_value(serde_json::json!({
            "name": "Neuherbs Deep Sea Fish Oil",
            "mainImage": null,
            "description": "Omega 3 capsules",
            "galleryImages": ["https://img.example/1.jpg"]
        }))
        .unwrap();

        assert_eq!(page.sku, "");
        assert_eq!(page.main_image, None);
        assert_eq!(page.gallery_images.len(), 1);
    }
}
