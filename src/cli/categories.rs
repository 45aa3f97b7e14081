//! Category mode CLI logic
//!
//! Scrapes 1mg category pages one after another, with a long pause between
//! categories, and rewrites the catalogue file after each one.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    config::Settings,
    enrich::write_json_atomic,
    scrape::{CATEGORY_SOURCE, CategoryScraper, default_categories, select_categories},
    session::BrowserSession,
    types::{CategoryCatalog, CategoryLink, CategoryListing},
};

/// Arguments for category mode
#[derive(Args, Debug)]
pub struct CategoriesArgs {
    /// Built-in category to scrape, by name (repeatable; default all)
    #[arg(long = "category", value_name = "NAME")]
    pub categories: Vec<String>,

    /// Extra category page to scrape, as NAME=URL (repeatable)
    #[arg(long = "url", value_name = "NAME=URL", value_parser = parse_named_url)]
    pub urls: Vec<CategoryLink>,

    /// Pages to visit per category
    #[arg(long, default_value = "1")]
    pub max_pages: u32,

    /// Seconds to wait between categories
    #[arg(long, value_name = "SECS")]
    pub delay_secs: Option<u64>,

    /// Catalogue file to write
    #[arg(short, long, value_name = "FILE", default_value = "tata1mg_all_categories.json")]
    pub output: PathBuf,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CategoriesReport<'a> {
    total_categories: usize,
    categories_with_products: usize,
    total_products: usize,
    errors: Vec<String>,
    output: &'a Path,
}

/// Run category mode with the given arguments
pub async fn run_categories_mode(args: CategoriesArgs, settings: &Settings) -> Result<()> {
    let categories = categories_to_scrape(&args)?;
    let delay = args
        .delay_secs
        .map(std::time::Duration::from_secs)
        .unwrap_or_else(|| settings.batch.category_delay());
    info!(
        "Scraping {} categories, {}s apart",
        categories.len(),
        delay.as_secs()
    );

    let session = BrowserSession::launch(&settings.browser).await?;
    let total = categories.len();
    let mut listings: Vec<CategoryListing> = Vec::with_capacity(total);
    let mut outcome = Ok(());

    for (i, category) in categories.into_iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(delay).await;
        }
        info!("[{}/{}] {}", i + 1, total, category.name);

        let listing = CategoryScraper::new(&session, category, settings.browser.page_load_timeout())
            .scrape(i + 1, args.max_pages, settings.batch.page_delay())
            .await;
        info!(
            "{}: {} products",
            listing.category_name, listing.product_count
        );
        listings.push(listing);

        let snapshot = CategoryCatalog::snapshot(CATEGORY_SOURCE, total, listings.clone());
        if let Err(e) = write_json_atomic(&args.output, &snapshot).await {
            outcome = Err(e);
            break;
        }
    }

    if let Err(e) = session.close().await {
        warn!("Failed to close browser session: {}", e);
    }
    outcome?;

    CategoriesReport {
        total_categories: listings.len(),
        categories_with_products: listings.iter().filter(|l| l.product_count > 0).count(),
        total_products: listings.iter().map(|l| l.product_count).sum(),
        errors: listings.iter().filter_map(|l| l.error.clone()).collect(),
        output: &args.output,
    }
    .print()
}

impl CategoriesReport<'_> {
    fn print(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

/// Named built-in categories plus `--url` ones; all built-ins when neither
/// is given
fn categories_to_scrape(args: &CategoriesArgs) -> Result<Vec<CategoryLink>> {
    if args.categories.is_empty() && !args.urls.is_empty() {
        return Ok(args.urls.clone());
    }

    let mut categories = select_categories(default_categories(), &args.categories)?;
    categories.extend(args.urls.iter().cloned());
    Ok(categories)
}

fn parse_named_url(raw: &str) -> std::result::Result<CategoryLink, String> {
    let (name, url) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=URL, got {:?}", raw))?;
    url::Url::parse(url.trim()).map_err(|e| format!("invalid URL {:?}: {}", url, e))?;
    Ok(CategoryLink::new(name.trim(), url.trim()))
}
