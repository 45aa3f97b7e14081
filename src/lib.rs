//! pharmascrape - pharmacy catalogue scraping with browser-captured tokens
//!
//! Drives a headless Chrome to the pharmacy site, captures the bearer token
//! the site's own scripts send to its GraphQL API, and uses that token for
//! direct API calls. Expired tokens are detected from the API's error shapes
//! and replaced transparently, once per call.
//!
//! # Architecture
//!
//! - [`session`]: browser sessions, token bootstrap and the [`SessionManager`]
//!   that owns the current token
//! - [`api`]: the GraphQL client and its refresh-aware wrapper
//! - [`enrich`]: sequential, rate-limited, resumable batch processing with
//!   JSON document persistence
//! - [`scrape`]: in-page extraction for 1mg categories, the A-Z medicine
//!   index and detail pages, and Apollo SKU discovery
//! - [`cli`]: the `pharmascrape` command line
//!
//! # Examples
//!
//! ```rust,no_run
//! use pharmascrape::{Settings, api::BrowserAuthenticatedClient};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = Settings::default();
//! let client = BrowserAuthenticatedClient::from_settings(&settings)?;
//! let product = client.product_info("NEU1021", "500032").await?;
//! println!("{:?}", product.pricing.mrp);
//! client.close().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod enrich;
pub mod error;
pub mod scrape;
pub mod session;
pub mod types;
pub mod utils;

pub use config::Settings;
pub use error::{Error, Result};
pub use session::SessionManager;
pub use types::{BearerToken, ProductInfo, SkuInfo, SkuQuery};
