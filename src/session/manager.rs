//! # Session Management Module
//!
//! Owns the current bearer token and the browser session that produced it,
//! and wraps authenticated calls with a one-shot refresh on token expiry.
//!
//! ## Lifecycle
//!
//! ```text
//! [NoToken] --acquire ok--> [Valid]
//! [Valid] --call ok / other error--> [Valid]
//! [Valid] --TokenExpired--> [Refreshing] --acquire ok--> [Valid] (new token)
//!                                        --acquire fails--> [Failed] (terminal)
//! ```
//!
//! A call whose retry is also rejected as expired invalidates the token, so
//! no further call is attempted with a credential known to be dead.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use pharmascrape::session::SessionManager;
//! use pharmascrape::config::Settings;
//!
//! # tokio_test::block_on(async {
//! let settings = Settings::default();
//! let manager = SessionManager::new(&settings);
//!
//! let token = manager
//!     .call_with_refresh(|token| async move { Ok(token.preview()) })
//!     .await?;
//! println!("Using token {}", token);
//! manager.close().await;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::bootstrap::{TokenBootstrap, TokenProvider};
use crate::{Error, Result, config::Settings, types::BearerToken};

/// Convenience type alias for a manager backed by a real browser
pub type SessionManager = SessionManagerGeneric<TokenBootstrap>;

/// Externally visible token state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    NoToken,
    Valid,
    Failed,
}

enum Slot<S> {
    NoToken,
    Valid { token: BearerToken, session: S },
    Failed { reason: String },
}

struct TokenState<S> {
    slot: Slot<S>,
    /// Bumped whenever the current token is replaced or dropped
    generation: u64,
}

/// Token/session owner for authenticated calls
pub struct SessionManagerGeneric<P: TokenProvider> {
    provider: Arc<P>,
    state: Mutex<TokenState<P::Session>>,
    refreshes: AtomicU64,
}

impl<P: TokenProvider> std::fmt::Debug for SessionManagerGeneric<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("refreshes", &self.refresh_count())
            .finish_non_exhaustive()
    }
}

impl SessionManagerGeneric<TokenBootstrap> {
    /// Creates a manager that bootstraps tokens with a real browser.
    pub fn new(settings: &Settings) -> Self {
        Self::new_with_provider(TokenBootstrap::new(settings.browser.clone()))
    }
}

impl<P: TokenProvider> SessionManagerGeneric<P> {
    /// Creates a manager with a custom token provider
    pub fn new_with_provider(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
            state: Mutex::new(TokenState {
                slot: Slot::NoToken,
                generation: 0,
            }),
            refreshes: AtomicU64::new(0),
        }
    }

    /// The token provider in use
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Number of refreshes triggered by expired tokens
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Current token state
    pub async fn status(&self) -> TokenStatus {
        match &self.state.lock().await.slot {
            Slot::NoToken => TokenStatus::NoToken,
            Slot::Valid { .. } => TokenStatus::Valid,
            Slot::Failed { .. } => TokenStatus::Failed,
        }
    }

    /// Current token, acquiring one first if there is none.
    ///
    /// Returns the token with the generation it belongs to.
    pub async fn current_token(&self) -> Result<(BearerToken, u64)> {
        let mut state = self.state.lock().await;

        match &state.slot {
            Slot::Valid { token, .. } => return Ok((token.clone(), state.generation)),
            Slot::Failed { reason } => return Err(failed(reason)),
            Slot::NoToken => {}
        }

        debug!("No current token, acquiring one");
        let acquired = self.provider.acquire_token().await?;
        state.generation += 1;
        state.slot = Slot::Valid {
            token: acquired.token.clone(),
            session: acquired.session,
        };

        Ok((acquired.token, state.generation))
    }

    /// Replace the token of generation `stale_generation` with a fresh one.
    ///
    /// If another caller already replaced it, the newer token is returned
    /// without a second acquisition. A failed acquisition is terminal.
    pub async fn refresh(&self, stale_generation: u64) -> Result<(BearerToken, u64)> {
        let mut state = self.state.lock().await;

        if state.generation != stale_generation {
            match &state.slot {
                Slot::Valid { token, .. } => {
                    debug!("Token already refreshed by another caller");
                    return Ok((token.clone(), state.generation));
                }
                Slot::Failed { reason } => return Err(failed(reason)),
                Slot::NoToken => {}
            }
        } else if let Slot::Failed { reason } = &state.slot {
            return Err(failed(reason));
        }

        info!("Refreshing session");
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        if !self.release(&mut state).await {
            state.generation += 1;
        }

        match self.provider.acquire_token().await {
            Ok(acquired) => {
                state.slot = Slot::Valid {
                    token: acquired.token.clone(),
                    session: acquired.session,
                };
                Ok((acquired.token, state.generation))
            }
            Err(e) => {
                error!("Session refresh failed: {}", e);
                let reason = e.to_string();
                state.slot = Slot::Failed {
                    reason: reason.clone(),
                };
                Err(failed(&reason))
            }
        }
    }

    /// Drop the token of generation `dead_generation` and close its session.
    ///
    /// A newer token installed by another caller is left alone.
    pub async fn invalidate(&self, dead_generation: u64) {
        let mut state = self.state.lock().await;
        if state.generation != dead_generation {
            debug!("Token already replaced, nothing to invalidate");
            return;
        }
        if self.release(&mut state).await {
            warn!("Invalidated current token");
        }
    }

    /// Close the current session, keeping a terminal failure in place.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        self.release(&mut state).await;
    }

    /// Move a valid slot back to `NoToken`, closing its session.
    async fn release(&self, state: &mut TokenState<P::Session>) -> bool {
        if !matches!(state.slot, Slot::Valid { .. }) {
            return false;
        }
        if let Slot::Valid { session, .. } = std::mem::replace(&mut state.slot, Slot::NoToken) {
            state.generation += 1;
            self.provider.close_session(session).await;
        }
        true
    }

    /// Run `operation` with the current token, refreshing once on expiry.
    ///
    /// Errors other than [`Error::TokenExpired`] are returned as-is without
    /// touching the token. If the retry with the fresh token is rejected as
    /// expired too, the token is invalidated and the error surfaced.
    pub async fn call_with_refresh<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn(BearerToken) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let (token, generation) = self.current_token().await?;

        match operation(token).await {
            Err(e) if e.is_token_expired() => {
                warn!("Token rejected ({}), refreshing and retrying once", e);
                let (token, generation) = self.refresh(generation).await?;

                match operation(token).await {
                    Err(e) if e.is_token_expired() => {
                        warn!("Fresh token rejected as well: {}", e);
                        self.invalidate(generation).await;
                        Err(e)
                    }
                    result => result,
                }
            }
            result => result,
        }
    }
}

fn failed(reason: &str) -> Error {
    Error::session_failed(format!("Token refresh failed: {}", reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::bootstrap::AcquiredSession;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicUsize;

    /// Hands out `token-1`, `token-2`, ... and records closed sessions
    #[derive(Default)]
    struct ScriptedProvider {
        issued: AtomicUsize,
        fail_from: Option<usize>,
        closed: StdMutex<Vec<usize>>,
    }

    #[async_trait]
    impl TokenProvider for ScriptedProvider {
        type Session = usize;

        async fn acquire_token(&self) -> Result<AcquiredSession<usize>> {
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_from.is_some_and(|from| n >= from) {
                return Err(Error::TokenNotFound { waited_ms: 30_000 });
            }
            Ok(AcquiredSession {
                token: BearerToken::new(format!("token-{}", n)).unwrap(),
                session: n,
            })
        }

        async fn close_session(&self, session: usize) {
            self.closed.lock().unwrap().push(session);
        }
    }

    /// Replays a fixed sequence of outcomes and records the tokens used
    struct ScriptedCalls {
        outcomes: StdMutex<VecDeque<Result<&'static str>>>,
        seen: StdMutex<Vec<String>>,
    }

    impl ScriptedCalls {
        fn new(outcomes: Vec<Result<&'static str>>) -> Self {
            Self {
                outcomes: StdMutex::new(outcomes.into()),
                seen: StdMutex::new(Vec::new()),
            }
        }

        async fn call(&self, token: BearerToken) -> Result<&'static str> {
            self.seen.lock().unwrap().push(token.as_str().to_string());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted outcome left")
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn test_expired_then_success_refreshes_once() {
        let manager = SessionManagerGeneric::new_with_provider(ScriptedProvider::default());
        let calls = ScriptedCalls::new(vec![Err(Error::token_expired("HTTP 401")), Ok("sku-data")]);

        let result = manager.call_with_refresh(|t| calls.call(t)).await;

        assert_eq!(result.unwrap(), "sku-data");
        assert_eq!(manager.refresh_count(), 1);
        assert_eq!(calls.seen(), vec!["token-1", "token-2"]);
        assert_eq!(*manager.provider.closed.lock().unwrap(), vec![1]);
        assert_eq!(manager.status().await, TokenStatus::Valid);
    }

    #[tokio::test]
    async fn test_expired_twice_surfaces_without_second_refresh() {
        let manager = SessionManagerGeneric::new_with_provider(ScriptedProvider::default());
        let calls = ScriptedCalls::new(vec![
            Err(Error::token_expired("HTTP 401")),
            Err(Error::token_expired("UNAUTHENTICATED")),
        ]);

        let result = manager.call_with_refresh(|t| calls.call(t)).await;

        assert!(result.unwrap_err().is_token_expired());
        assert_eq!(manager.refresh_count(), 1);
        assert_eq!(manager.provider.issued.load(Ordering::SeqCst), 2);
        assert_eq!(manager.status().await, TokenStatus::NoToken);
        assert_eq!(*manager.provider.closed.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_other_error_surfaces_without_refresh() {
        let manager = SessionManagerGeneric::new_with_provider(ScriptedProvider::default());
        let calls = ScriptedCalls::new(vec![Err(Error::api(Some(500), "Internal error"))]);

        let err = manager.call_with_refresh(|t| calls.call(t)).await.unwrap_err();

        assert!(matches!(err, Error::Api { status: Some(500), .. }));
        assert_eq!(manager.refresh_count(), 0);
        assert_eq!(calls.seen(), vec!["token-1"]);
        assert_eq!(manager.status().await, TokenStatus::Valid);
    }

    #[tokio::test]
    async fn test_token_reused_across_calls() {
        let manager = SessionManagerGeneric::new_with_provider(ScriptedProvider::default());
        let calls = ScriptedCalls::new(vec![Ok("a"), Ok("b")]);

        manager.call_with_refresh(|t| calls.call(t)).await.unwrap();
        manager.call_with_refresh(|t| calls.call(t)).await.unwrap();

        assert_eq!(calls.seen(), vec!["token-1", "token-1"]);
        assert_eq!(manager.provider.issued.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_is_terminal() {
        let provider = ScriptedProvider {
            fail_from: Some(2),
            ..Default::default()
        };
        let manager = SessionManagerGeneric::new_with_provider(provider);
        let calls = ScriptedCalls::new(vec![Err(Error::token_expired("HTTP 401"))]);

        let err = manager.call_with_refresh(|t| calls.call(t)).await.unwrap_err();
        assert!(matches!(err, Error::SessionFailed(_)));
        assert!(err.is_fatal());
        assert_eq!(manager.status().await, TokenStatus::Failed);

        // No further acquisition or call once failed
        let err = manager.call_with_refresh(|t| calls.call(t)).await.unwrap_err();
        assert!(matches!(err, Error::SessionFailed(_)));
        assert_eq!(manager.provider.issued.load(Ordering::SeqCst), 2);
        assert_eq!(calls.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_initial_acquire_failure_surfaces() {
        let provider = ScriptedProvider {
            fail_from: Some(1),
            ..Default::default()
        };
        let manager = SessionManagerGeneric::new_with_provider(provider);
        let calls = ScriptedCalls::new(vec![]);

        let err = manager.call_with_refresh(|t| calls.call(t)).await.unwrap_err();
        assert!(matches!(err, Error::TokenNotFound { .. }));
        assert_eq!(manager.status().await, TokenStatus::NoToken);
        assert!(calls.seen().is_empty());
    }

    #[tokio::test]
    async fn test_stale_refresh_is_deduplicated() {
        let manager = SessionManagerGeneric::new_with_provider(ScriptedProvider::default());
        let (_, generation) = manager.current_token().await.unwrap();

        let (first, _) = manager.refresh(generation).await.unwrap();
        let (second, _) = manager.refresh(generation).await.unwrap();

        assert_eq!(first.as_str(), "token-2");
        assert_eq!(second.as_str(), "token-2");
        assert_eq!(manager.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_expiry_triggers_single_refresh() {
        let manager = Arc::new(SessionManagerGeneric::new_with_provider(
            ScriptedProvider::default(),
        ));
        let (_, generation) = manager.current_token().await.unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move { manager.refresh(generation).await.unwrap().0 })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().as_str(), "token-2");
        }
        assert_eq!(manager.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_invalidate_keeps_newer_token() {
        let manager = SessionManagerGeneric::new_with_provider(ScriptedProvider::default());
        let (_, first) = manager.current_token().await.unwrap();
        let (_, second) = manager.refresh(first).await.unwrap();

        // A caller still holding the first generation must not drop token-2
        manager.invalidate(first).await;
        assert_eq!(manager.status().await, TokenStatus::Valid);
        assert_eq!(manager.current_token().await.unwrap().0.as_str(), "token-2");
        assert_eq!(*manager.provider.closed.lock().unwrap(), vec![1]);

        manager.invalidate(second).await;
        assert_eq!(manager.status().await, TokenStatus::NoToken);
        assert_eq!(*manager.provider.closed.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_close_releases_session() {
        let manager = SessionManagerGeneric::new_with_provider(ScriptedProvider::default());
        manager.current_token().await.unwrap();

        manager.close().await;
        manager.close().await;

        assert_eq!(manager.status().await, TokenStatus::NoToken);
        assert_eq!(*manager.provider.closed.lock().unwrap(), vec![1]);
    }
}
