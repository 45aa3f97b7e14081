//! Search mode CLI logic

use anyhow::{Result, bail};
use clap::Args;

use crate::{api::BrowserAuthenticatedClient, config::Settings};

/// Arguments for search mode
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search text
    #[arg(value_name = "TEXT", required = true)]
    pub text: Vec<String>,

    /// Number of products to request
    #[arg(long, default_value = "20")]
    pub page_size: u32,
}

/// Run search mode with the given arguments
pub async fn run_search_mode(args: SearchArgs, settings: &Settings) -> Result<()> {
    let text = args.text.join(" ");
    if text.trim().is_empty() {
        bail!("Search text must not be empty");
    }

    let client = BrowserAuthenticatedClient::from_settings(settings)?;
    let result = client.search_products(text.trim(), args.page_size).await;
    client.close().await;

    println!("{}", serde_json::to_string_pretty(&result?)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::cli::{Cli, Command};
    use clap::Parser;

    #[test]
    fn test_search_args() {
        let cli = Cli::parse_from(["pharmascrape", "search", "dolo", "650", "--page-size", "5"]);
        let Command::Search(args) = cli.command else {
            panic!("expected search command");
        };
        assert_eq!(args.text.join(" "), "dolo 650");
        assert_eq!(args.page_size, 5);
    }
}
