//! Configuration settings structure
//!
//! Defines the main settings structure and loading logic for the scraper.
//! Every field has a default matching the values the scrapers were tuned
//! with, so an empty config file (or none at all) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Main configuration settings for the scraper
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Browser session configuration
    pub browser: BrowserSettings,
    /// GraphQL API configuration
    pub api: ApiSettings,
    /// Batch enrichment configuration
    pub batch: BatchSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Headless browser configuration used by token bootstrap and page scraping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Homepage visited to observe an authenticated request
    pub homepage_url: String,
    /// Run Chrome without a visible window
    pub headless: bool,
    /// Explicit Chrome/Chromium executable (auto-detected when unset)
    pub executable: Option<String>,
    /// User agent presented by the browser
    pub user_agent: String,
    /// Accept-Language / locale presented by the browser
    pub locale: String,
    /// Viewport width in CSS pixels
    pub viewport_width: u32,
    /// Viewport height in CSS pixels
    pub viewport_height: u32,
    /// Upper bound for a navigation to reach "content loaded"
    pub page_load_timeout_secs: u64,
    /// Upper bound for a bearer token to show up after navigation
    pub token_wait_secs: u64,
    /// Interval between token polls
    pub poll_interval_ms: u64,
    /// Extra Chrome command-line arguments
    pub chrome_args: Vec<String>,
}

/// GraphQL endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// GraphQL endpoint
    pub endpoint: String,
    /// `origin` header sent with every call
    pub origin: String,
    /// `referer` header sent with every call
    pub referer: String,
    /// `user-agent` header sent with every call
    pub user_agent: String,
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// Default pincode used for location-aware pricing
    pub default_pincode: String,
    /// Base used to build product page URLs from SKUs
    pub product_base_url: String,
}

/// Batch enrichment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Fixed delay between consecutive items
    pub rate_limit_ms: u64,
    /// Maximum number of pending items processed per run
    pub batch_size: usize,
    /// Persist accumulated results after this many processed items
    pub save_every: usize,
    /// Delay between listing pages when paginating
    pub page_delay_ms: u64,
    /// Delay between categories in a category scrape
    pub category_delay_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,
    /// Enable verbose logging
    pub verbose: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            homepage_url: "https://www.apollopharmacy.in/".to_string(),
            headless: true,
            executable: None,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            locale: "en-IN".to_string(),
            viewport_width: 1366,
            viewport_height: 768,
            page_load_timeout_secs: 60,
            token_wait_secs: 30,
            poll_interval_ms: 500,
            chrome_args: Vec::new(),
        }
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.apollo247.com/".to_string(),
            origin: "https://www.apollopharmacy.in".to_string(),
            referer: "https://www.apollopharmacy.in/".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            request_timeout_secs: 30,
            default_pincode: String::new(),
            product_base_url: "https://www.apollopharmacy.in/medicine-info/".to_string(),
        }
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            rate_limit_ms: 1000,
            batch_size: 100,
            save_every: 1,
            page_delay_ms: 2000,
            category_delay_ms: 30_000,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            verbose: false,
        }
    }
}

impl BrowserSettings {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn token_wait(&self) -> Duration {
        Duration::from_secs(self.token_wait_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl ApiSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl BatchSettings {
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn category_delay(&self) -> Duration {
        Duration::from_millis(self.category_delay_ms)
    }
}

impl Settings {
    /// Create new settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file, falling back to defaults for missing keys
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Load settings from environment variables
    pub fn from_env() -> crate::Result<Self> {
        Self::default().merge_with_env()
    }

    /// Apply `PHARMASCRAPE_*` environment overrides on top of these settings
    pub fn merge_with_env(mut self) -> crate::Result<Self> {
        if let Ok(url) = std::env::var("PHARMASCRAPE_HOMEPAGE_URL") {
            self.browser.homepage_url = url;
        }

        if let Ok(headless) = std::env::var("PHARMASCRAPE_HEADLESS") {
            self.browser.headless = parse_env("PHARMASCRAPE_HEADLESS", &headless)?;
        }

        if let Ok(path) = std::env::var("PHARMASCRAPE_CHROME") {
            self.browser.executable = Some(path);
        }

        if let Ok(secs) = std::env::var("PHARMASCRAPE_TOKEN_WAIT_SECS") {
            self.browser.token_wait_secs = parse_env("PHARMASCRAPE_TOKEN_WAIT_SECS", &secs)?;
        }

        if let Ok(endpoint) = std::env::var("PHARMASCRAPE_API_ENDPOINT") {
            self.api.endpoint = endpoint;
        }

        if let Ok(pincode) = std::env::var("PHARMASCRAPE_PINCODE") {
            self.api.default_pincode = pincode;
        }

        if let Ok(ms) = std::env::var("PHARMASCRAPE_RATE_LIMIT_MS") {
            self.batch.rate_limit_ms = parse_env("PHARMASCRAPE_RATE_LIMIT_MS", &ms)?;
        }

        if let Ok(size) = std::env::var("PHARMASCRAPE_BATCH_SIZE") {
            self.batch.batch_size = parse_env("PHARMASCRAPE_BATCH_SIZE", &size)?;
        }

        Ok(self)
    }

    /// Check invariants the runtime relies on
    pub fn validate(&self) -> crate::Result<()> {
        Url::parse(&self.browser.homepage_url)
            .map_err(|e| crate::Error::config(format!("Invalid homepage_url: {}", e)))?;
        Url::parse(&self.api.endpoint)
            .map_err(|e| crate::Error::config(format!("Invalid api endpoint: {}", e)))?;

        if self.browser.token_wait_secs == 0 {
            return Err(crate::Error::config("token_wait_secs must be greater than 0"));
        }

        if self.browser.poll_interval_ms == 0 {
            return Err(crate::Error::config("poll_interval_ms must be greater than 0"));
        }

        if self.browser.poll_interval() > self.browser.token_wait() {
            return Err(crate::Error::config(
                "poll_interval_ms must not exceed token_wait_secs",
            ));
        }

        if self.browser.page_load_timeout_secs == 0 || self.api.request_timeout_secs == 0 {
            return Err(crate::Error::config("timeouts must be greater than 0"));
        }

        if self.batch.save_every == 0 {
            return Err(crate::Error::config("save_every must be at least 1"));
        }

        Ok(())
    }
}

fn parse_env<T>(name: &str, value: &str) -> crate::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| crate::Error::Config(format!("Invalid {}: {}", name, e)))
}
