//! Medicine catalogue CLI logic
//!
//! `medicines index` walks the A-Z index for one or more letters;
//! `medicines enrich` visits each indexed medicine's page and stores its
//! details.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use super::{BatchReport, batch_options};
use crate::{
    config::Settings,
    enrich::{EnrichmentRecord, JsonDocumentStore, enrich_batch, write_json_atomic},
    scrape::{MedicineIndexScraper, fetch_details, load_source, parse_letters},
    session::BrowserSession,
    types::{MedicineCatalog, MedicineDetails, MedicineIndex, MedicineListing},
};

/// Stored outcome of one detail page visit
pub type MedicineRecord = EnrichmentRecord<MedicineListing, MedicineDetails>;

/// Arguments for medicine mode
#[derive(Args, Debug)]
pub struct MedicinesArgs {
    #[command(subcommand)]
    pub command: MedicinesCommand,
}

#[derive(Subcommand, Debug)]
pub enum MedicinesCommand {
    /// Scrape the A-Z medicine index
    Index(IndexArgs),
    /// Add detail page content to indexed medicines
    Enrich(EnrichArgs),
}

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Letters to scrape: a single letter, a range such as B-Z, or a list
    #[arg(short, long, default_value = "A")]
    pub letters: String,

    /// Highest page number to visit per letter
    #[arg(long, default_value = "334")]
    pub max_pages: u32,

    /// Index file to write
    #[arg(short, long, value_name = "FILE", default_value = "medicines_index.json")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct EnrichArgs {
    /// Index file produced by `medicines index` (any supported layout)
    #[arg(short, long, value_name = "FILE")]
    pub source: PathBuf,

    /// Enriched records file, updated in place
    #[arg(short, long, value_name = "FILE", default_value = "medicines_enriched.json")]
    pub output: PathBuf,

    /// Delay between pages in milliseconds
    #[arg(long, value_name = "MS")]
    pub rate_limit_ms: Option<u64>,

    /// Process at most this many pending medicines
    #[arg(long)]
    pub limit: Option<usize>,

    /// Revisit medicines whose previous attempt failed
    #[arg(long)]
    pub retry_failed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexReport<'a> {
    letters: Vec<String>,
    total_medicines: usize,
    errors: Vec<String>,
    output: &'a std::path::Path,
}

/// Run medicine mode with the given arguments
pub async fn run_medicines_mode(args: MedicinesArgs, settings: &Settings) -> Result<()> {
    match args.command {
        MedicinesCommand::Index(args) => run_index(args, settings).await,
        MedicinesCommand::Enrich(args) => run_enrich(args, settings).await,
    }
}

async fn run_index(args: IndexArgs, settings: &Settings) -> Result<()> {
    let letters = parse_letters(&args.letters)?;
    let session = BrowserSession::launch(&settings.browser).await?;

    let mut indexes: Vec<MedicineIndex> = Vec::with_capacity(letters.len());
    let mut outcome = Ok(());
    for letter in &letters {
        let index = MedicineIndexScraper::new(&session, *letter, settings.browser.page_load_timeout())
            .scrape(args.max_pages, settings.batch.page_delay())
            .await;
        info!(
            "Letter {}: {} medicines from {} pages",
            index.letter, index.total_medicines, index.pages_scraped
        );
        indexes.push(index);

        // Progress is written after every letter
        let saved = if let [single] = indexes.as_slice() {
            write_json_atomic(&args.output, single).await
        } else {
            write_json_atomic(&args.output, &MedicineCatalog::new(indexes.clone())).await
        };
        if let Err(e) = saved {
            outcome = Err(e);
            break;
        }
    }

    if let Err(e) = session.close().await {
        warn!("Failed to close browser session: {}", e);
    }
    outcome?;

    IndexReport {
        letters: indexes.iter().map(|i| i.letter.clone()).collect(),
        total_medicines: indexes.iter().map(|i| i.total_medicines).sum(),
        errors: indexes.iter().filter_map(|i| i.error.clone()).collect(),
        output: &args.output,
    }
    .print()
}

impl IndexReport<'_> {
    fn print(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

async fn run_enrich(args: EnrichArgs, settings: &Settings) -> Result<()> {
    let medicines = load_source(&args.source).await?;
    let options = batch_options(&settings.batch, args.rate_limit_ms, args.limit);

    let mut store: JsonDocumentStore<MedicineRecord> = JsonDocumentStore::open(&args.output).await?;
    let resume = store.resume_keys(args.retry_failed);
    info!(
        "Loaded {} already enriched medicines ({} failed)",
        store.len(),
        store.failure_count()
    );

    let session = BrowserSession::launch(&settings.browser).await?;
    let session_ref = &session;
    let timeout = settings.browser.page_load_timeout();

    let result = enrich_batch(
        medicines,
        &options,
        &resume,
        &mut store,
        |medicine: MedicineListing| async move {
            fetch_details(session_ref, &medicine.url, timeout).await
        },
    )
    .await;

    if let Err(e) = session.close().await {
        warn!("Failed to close browser session: {}", e);
    }
    let summary = result?;

    BatchReport {
        summary: &summary,
        refreshes: None,
        output: &args.output,
    }
    .print()
}
