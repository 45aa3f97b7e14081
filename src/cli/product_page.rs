//! Product page mode CLI logic

use anyhow::Result;
use clap::Args;
use tracing::warn;

use crate::{config::Settings, scrape::scrape_product_page, session::BrowserSession};

/// Arguments for product page mode
#[derive(Args, Debug)]
pub struct ProductPageArgs {
    /// SKUs whose product pages to read
    #[arg(value_name = "SKU", required = true)]
    pub skus: Vec<String>,
}

/// Print name, description and images from each SKU's product page.
///
/// A page that cannot be read is reported with its error and the rest are
/// still visited.
pub async fn run_product_page_mode(args: ProductPageArgs, settings: &Settings) -> Result<()> {
    let session = BrowserSession::launch(&settings.browser).await?;
    let timeout = settings.browser.page_load_timeout();

    let mut pages = Vec::with_capacity(args.skus.len());
    for sku in &args.skus {
        let page =
            scrape_product_page(&session, &settings.api.product_base_url, sku, timeout).await;
        pages.push(match page {
            Ok(page) => serde_json::to_value(page)?,
            Err(e) => {
                warn!("Product page for {} failed: {}", sku, e);
                serde_json::json!({ "sku": sku, "error": e.to_string() })
            }
        });
    }

    if let Err(e) = session.close().await {
        warn!("Failed to close browser session: {}", e);
    }

    println!("{}", serde_json::to_string_pretty(&pages)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::cli::{Cli, Command};
    use clap::Parser;

    #[test]
    fn test_product_page_requires_sku() {
        assert!(Cli::try_parse_from(["pharmascrape", "product-page"]).is_err());

        let cli = Cli::parse_from(["pharmascrape", "product-page", "NEU1021", "VIT001"]);
        let Command::ProductPage(args) = cli.command else {
            panic!("expected product-page command");
        };
        assert_eq!(args.skus, vec!["NEU1021", "VIT001"]);
    }
}
