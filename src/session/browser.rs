//! Chromium session management over CDP
//!
//! A [`BrowserSession`] owns one browser process and one page. It applies the
//! configured identity (user agent, locale, viewport) before the first
//! navigation and exposes outgoing request headers as a channel.

use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EventRequestWillBeSent, EventRequestWillBeSentExtraInfo,
};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, NavigateParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{Error, Result, config::BrowserSettings};

/// Hides the automation flag from page scripts
const STEALTH_SCRIPT: &str = r#"
    Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
"#;

/// Resolves once the DOM has been parsed
const WAIT_FOR_CONTENT_LOADED: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'interactive' || document.readyState === 'complete') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
        }
    })
"#;

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A live browser process with a single page
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    observers: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserSession")
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl BrowserSession {
    /// Launch a browser and open a blank page with the configured identity.
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let config = browser_config(settings)?;

        debug!(
            "Launching browser (headless: {}, executable: {:?})",
            settings.headless, settings.executable
        );
        let (mut browser, mut handler) = Browser::launch(config).await?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {}", e);
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler.abort();
                return Err(e.into());
            }
        };

        let session = Self {
            browser,
            page,
            handler,
            observers: Vec::new(),
        };

        if let Err(e) = session.apply_identity(settings).await {
            if let Err(close_err) = session.close().await {
                warn!("Failed to close browser after setup error: {}", close_err);
            }
            return Err(e);
        }

        info!("Browser session ready");
        Ok(session)
    }

    async fn apply_identity(&self, settings: &BrowserSettings) -> Result<()> {
        let user_agent = SetUserAgentOverrideParams::builder()
            .user_agent(settings.user_agent.clone())
            .accept_language(settings.locale.clone())
            .build()
            .map_err(Error::browser)?;
        self.page.execute(user_agent).await?;

        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(settings.viewport_width))
            .height(i64::from(settings.viewport_height))
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(Error::browser)?;
        self.page.execute(metrics).await?;

        self.page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
            .await?;

        Ok(())
    }

    /// The session's page
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Stream values derived from the header map of every outgoing request.
    ///
    /// `extract` runs for each request (including the extra-info event, which
    /// carries headers added by the network stack). Matches are sent in the
    /// order they are observed. Must be called before navigating.
    pub async fn observe_request_headers<T, F>(
        &mut self,
        extract: F,
    ) -> Result<mpsc::UnboundedReceiver<T>>
    where
        T: Send + 'static,
        F: Fn(&serde_json::Value) -> Option<T> + Clone + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut sent = self.page.event_listener::<EventRequestWillBeSent>().await?;
        let sent_tx = tx.clone();
        let sent_extract = extract.clone();
        self.observers.push(tokio::spawn(async move {
            while let Some(event) = sent.next().await {
                if let Some(value) = sent_extract(event.request.headers.inner()) {
                    if sent_tx.send(value).is_err() {
                        break;
                    }
                }
            }
        }));

        let mut extra = self
            .page
            .event_listener::<EventRequestWillBeSentExtraInfo>()
            .await?;
        self.observers.push(tokio::spawn(async move {
            while let Some(event) = extra.next().await {
                if let Some(value) = extract(event.headers.inner()) {
                    if tx.send(value).is_err() {
                        break;
                    }
                }
            }
        }));

        Ok(rx)
    }

    /// Navigate and wait for the "content loaded" signal, bounded by `timeout`.
    pub async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        info!("Navigating to {}", url);
        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| Error::browser(format!("Invalid URL {}: {}", url, e)))?;

        let navigation = async {
            let response = self.page.execute(params).await?;
            if let Some(error_text) = &response.result.error_text {
                return Err(Error::browser(format!(
                    "Navigation to {} failed: {}",
                    url, error_text
                )));
            }
            self.page.evaluate(WAIT_FOR_CONTENT_LOADED).await?;
            Ok(())
        };

        tokio::time::timeout(timeout, navigation)
            .await
            .map_err(|_| {
                Error::timeout(format!(
                    "navigation to {} ({}s)",
                    url,
                    timeout.as_secs()
                ))
            })?
    }

    /// Evaluate a script in the page and decode its result.
    pub async fn evaluate_json<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        let result = self.page.evaluate(script).await?;
        Ok(result.into_value::<T>()?)
    }

    /// Poll until an element matching `selector` exists.
    ///
    /// Returns `false` if none appeared within `timeout`.
    pub async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let script = presence_script(selector)?;
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.evaluate_json::<bool>(&script).await? {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                debug!("No element matched {} within {}s", selector, timeout.as_secs());
                return Ok(false);
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    /// Close the browser and wait for the process to exit.
    pub async fn close(mut self) -> Result<()> {
        for observer in self.observers.drain(..) {
            observer.abort();
        }

        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            warn!("Failed waiting for browser process to exit: {}", e);
        }
        self.handler.abort();

        debug!("Browser session closed");
        closed.map(|_| ()).map_err(Error::from)
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        for observer in &self.observers {
            observer.abort();
        }
        self.handler.abort();
    }
}

fn browser_config(settings: &BrowserSettings) -> Result<BrowserConfig> {
    let mut builder = BrowserConfig::builder()
        .request_timeout(settings.page_load_timeout())
        .window_size(settings.viewport_width, settings.viewport_height)
        .no_sandbox()
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-dev-shm-usage")
        .arg(format!("--lang={}", settings.locale));

    if !settings.headless {
        builder = builder.with_head();
    }
    if let Some(executable) = &settings.executable {
        builder = builder.chrome_executable(executable);
    }
    for arg in &settings.chrome_args {
        builder = builder.arg(arg.clone());
    }

    builder.build().map_err(Error::browser)
}

/// Script returning whether `selector` currently matches an element
fn presence_script(selector: &str) -> Result<String> {
    Ok(format!(
        "!!document.querySelector({})",
        serde_json::to_string(selector)?
    ))
}
