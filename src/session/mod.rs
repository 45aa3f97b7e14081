//! Browser sessions and bearer token lifecycle
//!
//! This module drives the headless browser, captures bearer tokens from the
//! site's own traffic, and owns the current token for authenticated calls.

pub mod bootstrap;
pub mod browser;
pub mod manager;

pub use bootstrap::{AcquiredSession, TokenBootstrap, TokenProvider, extract_bearer, wait_for_token};
pub use browser::BrowserSession;
pub use manager::{SessionManager, SessionManagerGeneric, TokenStatus};
