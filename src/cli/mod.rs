//! Command line interface
//!
//! Argument definitions and the logic behind each subcommand. The binary in
//! `main.rs` only parses arguments and dispatches here.

pub mod categories;
pub mod discover;
pub mod medicines;
pub mod product_page;
pub mod search;
pub mod sku;
pub mod token;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::{BatchSettings, ConfigLoader},
    enrich::{BatchOptions, BatchSummary},
    utils::version,
};

/// Pharmacy catalogue scraper with browser-captured API tokens
#[derive(Parser, Debug)]
#[command(name = "pharmascrape", author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to the per-user config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Capture a bearer token once and print a summary of it
    Token(token::TokenArgs),
    /// Look up product details for SKUs through the GraphQL API
    Sku(sku::SkuArgs),
    /// Search the product catalogue
    Search(search::SearchArgs),
    /// Scrape the A-Z medicine index or enrich it with detail pages
    Medicines(medicines::MedicinesArgs),
    /// Scrape product listings from 1mg category pages
    Categories(categories::CategoriesArgs),
    /// Find product SKUs on Apollo category pages
    Discover(discover::DiscoverArgs),
    /// Read name, description and images from Apollo product pages
    ProductPage(product_page::ProductPageArgs),
}

/// Load configuration, set up logging and run the selected command.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = ConfigLoader::new().load(cli.config.as_deref())?;
    init_logging(cli.verbose || settings.logging.verbose, &settings.logging.level);

    tracing::debug!("pharmascrape v{}", version::get_version());

    match cli.command {
        Command::Token(args) => token::run_token_mode(args, &settings).await,
        Command::Sku(args) => sku::run_sku_mode(args, &settings).await,
        Command::Search(args) => search::run_search_mode(args, &settings).await,
        Command::Medicines(args) => medicines::run_medicines_mode(args, &settings).await,
        Command::Categories(args) => categories::run_categories_mode(args, &settings).await,
        Command::Discover(args) => discover::run_discover_mode(args, &settings).await,
        Command::ProductPage(args) => product_page::run_product_page_mode(args, &settings).await,
    }
}

/// Install the stderr subscriber; `RUST_LOG` wins over `level`.
pub fn init_logging(verbose: bool, level: &str) {
    let default_directive = if verbose { "debug" } else { level };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Batch options from settings with command line overrides
pub(crate) fn batch_options(
    settings: &BatchSettings,
    rate_limit_ms: Option<u64>,
    limit: Option<usize>,
) -> BatchOptions {
    let mut options = BatchOptions::from_settings(settings);
    if let Some(ms) = rate_limit_ms {
        options.rate_limit = std::time::Duration::from_millis(ms);
    }
    if limit.is_some() {
        options.limit = limit;
    }
    options
}

/// JSON printed on stdout at the end of a batch command
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BatchReport<'a> {
    #[serde(flatten)]
    pub summary: &'a BatchSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refreshes: Option<u64>,
    pub output: &'a Path,
}

impl BatchReport<'_> {
    pub fn print(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}
