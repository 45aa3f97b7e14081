//! pharmascrape command line entry point
//!
//! # Usage
//!
//! ```bash
//! pharmascrape token
//! pharmascrape sku NEU1021 VIT001 --pincode 500032
//! pharmascrape medicines index --letters B-Z
//! pharmascrape medicines enrich --source medicines_index.json --limit 100
//! pharmascrape categories --category Ayurveda --max-pages 3
//! pharmascrape discover --sku-list skus.txt
//! pharmascrape sku --input discovered_skus.json
//! ```

use clap::Parser;
use pharmascrape::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::run(Cli::parse()).await
}
