//! Discovery mode CLI logic
//!
//! Finds Apollo SKUs on category pages so they can be fed to `sku`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    config::Settings,
    enrich::write_json_atomic,
    scrape::{discover_categories, discover_category_products},
    session::BrowserSession,
    types::{CategoryLink, DiscoveredCategory, SkuDiscovery},
};

/// Arguments for discovery mode
#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Category page to read (repeatable); found on the homepage when omitted
    #[arg(long = "category", value_name = "URL")]
    pub categories: Vec<String>,

    /// Homepage categories to visit when none are given
    #[arg(long, default_value = "10")]
    pub max_categories: usize,

    /// Products to keep per category
    #[arg(long, default_value = "50")]
    pub max_products: usize,

    /// Discovery document to write; its `skus` list is accepted by `sku --input`
    #[arg(short, long, value_name = "FILE", default_value = "discovered_skus.json")]
    pub output: PathBuf,

    /// Also write the SKUs one per line to this file
    #[arg(long, value_name = "FILE")]
    pub sku_list: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DiscoverReport<'a> {
    categories: usize,
    total_skus: usize,
    errors: Vec<String>,
    output: &'a Path,
}

/// Run discovery mode with the given arguments
pub async fn run_discover_mode(args: DiscoverArgs, settings: &Settings) -> Result<()> {
    let timeout = settings.browser.page_load_timeout();
    let session = BrowserSession::launch(&settings.browser).await?;

    let result = discover(&args, settings, &session, timeout).await;

    if let Err(e) = session.close().await {
        warn!("Failed to close browser session: {}", e);
    }
    let discovery = result?;

    write_json_atomic(&args.output, &discovery).await?;
    if let Some(path) = &args.sku_list {
        tokio::fs::write(path, sku_lines(&discovery.skus))
            .await
            .with_context(|| format!("Cannot write SKU list {}", path.display()))?;
    }

    let report = DiscoverReport {
        categories: discovery.categories.len(),
        total_skus: discovery.total_skus,
        errors: discovery
            .categories
            .iter()
            .filter_map(|c| c.error.clone())
            .collect(),
        output: &args.output,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn discover(
    args: &DiscoverArgs,
    settings: &Settings,
    session: &BrowserSession,
    timeout: std::time::Duration,
) -> Result<SkuDiscovery> {
    let categories: Vec<CategoryLink> = if args.categories.is_empty() {
        let mut found =
            discover_categories(session, &settings.browser.homepage_url, timeout).await?;
        found.truncate(args.max_categories);
        found
    } else {
        args.categories
            .iter()
            .map(|url| CategoryLink::new(url.clone(), url.clone()))
            .collect()
    };

    let mut discovered = Vec::with_capacity(categories.len());
    for (i, category) in categories.into_iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(settings.batch.page_delay()).await;
        }

        let outcome =
            discover_category_products(session, &category.url, args.max_products, timeout).await;
        let (products, error) = match outcome {
            Ok(products) => (products, None),
            Err(e) => {
                warn!("Discovery failed for {}: {}", category.url, e);
                (Vec::new(), Some(e.to_string()))
            }
        };
        info!("{}: {} SKUs", category.name, products.len());

        discovered.push(DiscoveredCategory {
            name: category.name,
            url: category.url,
            products,
            error,
        });
    }

    Ok(SkuDiscovery::new(discovered))
}

fn sku_lines(skus: &[String]) -> String {
    skus.iter().map(|sku| format!("{}\n", sku)).collect()
}
