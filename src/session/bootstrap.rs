//! Bearer token bootstrap
//!
//! Drives a browser to the pharmacy homepage and captures the bearer token the
//! site's own scripts attach to their API requests.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::browser::BrowserSession;
use crate::{Error, Result, config::BrowserSettings, types::BearerToken};

/// A freshly acquired token together with the session that produced it
#[derive(Debug)]
pub struct AcquiredSession<S> {
    pub token: BearerToken,
    pub session: S,
}

/// Source of bearer tokens.
///
/// Implemented by [`TokenBootstrap`] for real browser sessions; tests
/// substitute scripted providers.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Session kept alive alongside a token
    type Session: Send;

    /// Produce a new token and its session
    async fn acquire_token(&self) -> Result<AcquiredSession<Self::Session>>;

    /// Tear down a session that is no longer needed
    async fn close_session(&self, session: Self::Session);
}

/// Captures bearer tokens by driving a real browser
#[derive(Debug, Clone)]
pub struct TokenBootstrap {
    settings: BrowserSettings,
}

impl TokenBootstrap {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    /// Open a fresh session on `target_url` and wait up to `budget` for a
    /// request carrying a bearer token.
    ///
    /// On failure the session is closed before returning.
    pub async fn acquire_token_from(
        &self,
        target_url: &str,
        budget: Duration,
    ) -> Result<AcquiredSession<BrowserSession>> {
        info!("Bootstrapping session on {}", target_url);
        let mut session = BrowserSession::launch(&self.settings).await?;

        match self.capture(&mut session, target_url, budget).await {
            Ok(token) => {
                info!("Session ready, token: {}", token.preview());
                Ok(AcquiredSession { token, session })
            }
            Err(e) => {
                if let Err(close_err) = session.close().await {
                    warn!("Failed to close browser session: {}", close_err);
                }
                Err(e)
            }
        }
    }

    async fn capture(
        &self,
        session: &mut BrowserSession,
        target_url: &str,
        budget: Duration,
    ) -> Result<BearerToken> {
        let mut tokens = session.observe_request_headers(extract_bearer).await?;

        match session
            .navigate(target_url, self.settings.page_load_timeout())
            .await
        {
            Ok(()) => {}
            // Requests fired before the timeout may already carry the token
            Err(e @ Error::Timeout { .. }) => warn!("{}, still waiting for token", e),
            Err(e) => return Err(e),
        }

        wait_for_token(&mut tokens, self.settings.poll_interval(), budget).await
    }
}

#[async_trait]
impl TokenProvider for TokenBootstrap {
    type Session = BrowserSession;

    async fn acquire_token(&self) -> Result<AcquiredSession<BrowserSession>> {
        self.acquire_token_from(&self.settings.homepage_url, self.settings.token_wait())
            .await
    }

    async fn close_session(&self, session: BrowserSession) {
        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {}", e);
        }
    }
}

/// Bearer credential from a request header map, if present.
///
/// Header names are matched case-insensitively; the value must use the
/// `Bearer` scheme.
pub fn extract_bearer(headers: &serde_json::Value) -> Option<BearerToken> {
    let value = headers
        .as_object()?
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("authorization"))?
        .1
        .as_str()?;

    if value.starts_with("Bearer ") {
        BearerToken::new(value)
    } else {
        None
    }
}

/// Poll `tokens` every `poll` until a token arrives or `budget` elapses.
///
/// All values queued since the previous poll are drained and the latest one
/// wins, since early requests may carry a provisional credential.
pub async fn wait_for_token(
    tokens: &mut mpsc::UnboundedReceiver<BearerToken>,
    poll: Duration,
    budget: Duration,
) -> Result<BearerToken> {
    let started = Instant::now();
    let deadline = started + budget;

    loop {
        let mut latest = None;
        while let Ok(token) = tokens.try_recv() {
            latest = Some(token);
        }
        if let Some(token) = latest {
            debug!(
                "Token captured after {}ms",
                started.elapsed().as_millis()
            );
            return Ok(token);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(Error::TokenNotFound {
                waited_ms: started.elapsed().as_millis() as u64,
            });
        }
        tokio::time::sleep(poll.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!({"authorization": "Bearer abc123"}), Some("abc123"))]
    #[case(json!({"Authorization": "Bearer abc123"}), Some("abc123"))]
    #[case(json!({"accept": "*/*", "AUTHORIZATION": "Bearer  padded  "}), Some("padded"))]
    #[case(json!({"authorization": "Basic dXNlcjpwYXNz"}), None)]
    #[case(json!({"authorization": "Bearer "}), None)]
    #[case(json!({"content-type": "application/json"}), None)]
    #[case(json!({"authorization": 42}), None)]
    #[case(json!("not a header map"), None)]
    fn test_extract_bearer(#[case] headers: serde_json::Value, #[case] expected: Option<&str>) {
        let token = extract_bearer(&headers);
        assert_eq!(token.as_ref().map(BearerToken::as_str), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_at_budget() {
        let (_tx, mut rx) = mpsc::unbounded_channel();
        let started = Instant::now();

        let result = wait_for_token(
            &mut rx,
            Duration::from_millis(500),
            Duration::from_secs(30),
        )
        .await;

        let elapsed = started.elapsed();
        assert!(matches!(result, Err(Error::TokenNotFound { waited_ms: 30_000 })));
        assert!(elapsed >= Duration::from_secs(30));
        assert!(elapsed < Duration::from_millis(30_500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_with_closed_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel::<BearerToken>();
        drop(tx);
        let started = Instant::now();

        let result =
            wait_for_token(&mut rx, Duration::from_millis(500), Duration::from_secs(2)).await;

        assert!(result.unwrap_err().is_fatal());
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_keeps_latest_token() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1200)).await;
            tx.send(BearerToken::new("provisional").unwrap()).unwrap();
            tx.send(BearerToken::new("final").unwrap()).unwrap();
        });

        let started = Instant::now();
        let token = wait_for_token(&mut rx, Duration::from_millis(500), Duration::from_secs(30))
            .await
            .unwrap();

        assert_eq!(token.as_str(), "final");
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_immediately_when_token_queued() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(BearerToken::new("Bearer ready").unwrap()).unwrap();

        let started = Instant::now();
        let token = wait_for_token(&mut rx, Duration::from_millis(500), Duration::from_secs(30))
            .await
            .unwrap();

        assert_eq!(token.as_str(), "ready");
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
