//! Browser-driven catalogue scraping
//!
//! Listing pagination for 1mg categories and the A-Z medicine index, detail
//! extraction, Apollo SKU discovery, and the pointer activity played between
//! navigations.

pub mod category;
pub mod discovery;
pub mod human;
pub mod listing;
pub mod medicine_detail;
pub mod medicine_index;
pub mod source;

pub use category::{
    CATEGORY_SOURCE, CategoryScraper, category_page_url, default_categories, select_categories,
};
pub use discovery::{
    collect_products, discover_categories, discover_category_products, scrape_product_page,
    sku_from_href,
};
pub use listing::{ListingOutcome, ListingPage, ListingSource, paginate};
pub use medicine_detail::fetch_details;
pub use medicine_index::{INDEX_BASE_URL, MedicineIndexScraper, index_url, parse_letters};
pub use source::{flatten_source, load_source};
