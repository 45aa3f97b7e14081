//! Token mode CLI logic
//!
//! Bootstraps one browser session, prints a summary of the captured token and
//! closes the session again.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tracing::info;

use crate::{
    config::Settings,
    session::{TokenBootstrap, TokenProvider},
    types::TokenReport,
};

/// Arguments for token mode
#[derive(Args, Debug)]
pub struct TokenArgs {
    /// Page to open instead of the configured homepage
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Seconds to wait for a token after navigation
    #[arg(long, value_name = "SECS")]
    pub wait_secs: Option<u64>,
}

/// Run token mode with the given arguments
pub async fn run_token_mode(args: TokenArgs, settings: &Settings) -> Result<()> {
    let url = args
        .url
        .unwrap_or_else(|| settings.browser.homepage_url.clone());
    let budget = args
        .wait_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| settings.browser.token_wait());

    let bootstrap = TokenBootstrap::new(settings.browser.clone());
    let acquired = bootstrap.acquire_token_from(&url, budget).await?;
    let report = TokenReport::new(&acquired.token);
    bootstrap.close_session(acquired.session).await;

    info!("Captured token of {} characters", report.token_length);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
