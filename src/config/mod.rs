//! Configuration management for the scraper
//!
//! This module handles loading and managing configuration settings
//! for the browser, the GraphQL API and batch runs.

pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::{ApiSettings, BatchSettings, BrowserSettings, LoggingSettings, Settings};
