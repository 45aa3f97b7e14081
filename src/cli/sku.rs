//! SKU mode CLI logic
//!
//! Batch `getSkuInfo` lookups with token refresh, resumable through the
//! output file.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use tracing::info;

use super::{BatchReport, batch_options};
use crate::{
    api::BrowserAuthenticatedClient,
    config::Settings,
    enrich::{EnrichmentRecord, JsonDocumentStore, SkuItem, enrich_batch},
    types::ProductInfo,
};

/// Stored outcome of one SKU lookup
pub type SkuRecord = EnrichmentRecord<SkuItem, ProductInfo>;

/// Arguments for SKU mode
#[derive(Args, Debug)]
pub struct SkuArgs {
    /// SKUs to look up
    #[arg(value_name = "SKU")]
    pub skus: Vec<String>,

    /// File with more SKUs: a JSON array, a `discover` output, or one SKU per line
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Delivery pincode for pricing and availability
    #[arg(long)]
    pub pincode: Option<String>,

    /// Results file, updated in place
    #[arg(short, long, value_name = "FILE", default_value = "sku_results.json")]
    pub output: PathBuf,

    /// Delay between lookups in milliseconds
    #[arg(long, value_name = "MS")]
    pub rate_limit_ms: Option<u64>,

    /// Process at most this many pending SKUs
    #[arg(long)]
    pub limit: Option<usize>,

    /// Look up SKUs whose previous attempt failed
    #[arg(long)]
    pub retry_failed: bool,
}

/// Run SKU mode with the given arguments
pub async fn run_sku_mode(args: SkuArgs, settings: &Settings) -> Result<()> {
    let mut skus = args.skus.clone();
    if let Some(path) = &args.input {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Cannot read SKU list {}", path.display()))?;
        skus.extend(parse_sku_list(&raw)?);
    }

    let items = unique_items(skus);
    if items.is_empty() {
        bail!("No SKUs given: pass them as arguments or with --input");
    }

    let pincode = args
        .pincode
        .clone()
        .unwrap_or_else(|| settings.api.default_pincode.clone());
    let options = batch_options(&settings.batch, args.rate_limit_ms, args.limit);

    let mut store: JsonDocumentStore<SkuRecord> = JsonDocumentStore::open(&args.output).await?;
    let resume = store.resume_keys(args.retry_failed);
    info!(
        "{} SKUs, {} already in {}",
        items.len(),
        store.len(),
        args.output.display()
    );

    let client = BrowserAuthenticatedClient::from_settings(settings)?;
    let client_ref = &client;
    let pincode = pincode.as_str();

    let result = enrich_batch(items, &options, &resume, &mut store, |item: SkuItem| async move {
        client_ref.product_info(&item.sku, pincode).await
    })
    .await;

    let refreshes = client.sessions().refresh_count();
    client.close().await;
    let summary = result?;

    BatchReport {
        summary: &summary,
        refreshes: Some(refreshes),
        output: &args.output,
    }
    .print()
}

/// SKUs from a JSON array of strings, a discovery document's `skus`, or
/// from lines (blank lines and `#` comments are skipped)
pub fn parse_sku_list(raw: &str) -> Result<Vec<String>> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('{') {
        let discovery: DiscoveredSkus =
            serde_json::from_str(trimmed).context("SKU list document has no \"skus\" array")?;
        return Ok(discovery.skus);
    }
    if trimmed.starts_with('[') {
        let skus: Vec<String> =
            serde_json::from_str(trimmed).context("SKU list is not a JSON array of strings")?;
        return Ok(skus);
    }

    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[derive(serde::Deserialize)]
struct DiscoveredSkus {
    skus: Vec<String>,
}

fn unique_items(skus: Vec<String>) -> Vec<SkuItem> {
    let mut seen = HashSet::new();
    skus.into_iter()
        .map(|sku| sku.trim().to_string())
        .filter(|sku| !sku.is_empty() && seen.insert(sku.clone()))
        .map(SkuItem::new)
        .collect()
}
