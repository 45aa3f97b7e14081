//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

/// Test helper functions
pub mod helpers {
    use async_trait::async_trait;
    use pharmascrape::{
        BearerToken, Error, Result,
        api::{ApolloClient, AuthenticatedClient},
        config::{ApiSettings, Settings},
        session::{AcquiredSession, SessionManagerGeneric, TokenProvider},
    };
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Issues `token-1`, `token-2`, ... without a browser and records which
    /// sessions were closed. Fails once `fail_after` tokens have been issued.
    #[derive(Debug, Default)]
    pub struct CountingProvider {
        issued: AtomicUsize,
        closed: Mutex<Vec<usize>>,
        fail_after: Option<usize>,
    }

    impl CountingProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_after(issued: usize) -> Self {
            Self {
                fail_after: Some(issued),
                ..Self::default()
            }
        }

        pub fn closed(&self) -> Vec<usize> {
            self.closed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TokenProvider for CountingProvider {
        type Session = usize;

        async fn acquire_token(&self) -> Result<AcquiredSession<usize>> {
            let issued = self.issued.load(Ordering::SeqCst);
            if self.fail_after.is_some_and(|limit| issued >= limit) {
                return Err(Error::TokenNotFound { waited_ms: 30_000 });
            }

            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(AcquiredSession {
                token: BearerToken::new(format!("token-{}", n)).unwrap(),
                session: n,
            })
        }

        async fn close_session(&self, session: usize) {
            self.closed.lock().unwrap().push(session);
        }
    }

    /// Settings pointing the API at `endpoint`
    pub fn create_test_settings(endpoint: &str) -> Settings {
        let mut settings = Settings::default();
        settings.api = ApiSettings {
            endpoint: endpoint.to_string(),
            request_timeout_secs: 5,
            default_pincode: "500032".to_string(),
            ..ApiSettings::default()
        };
        settings
    }

    /// Authenticated client against `endpoint` with a browserless provider
    pub fn create_test_client(
        endpoint: &str,
        provider: CountingProvider,
    ) -> AuthenticatedClient<CountingProvider> {
        let settings = create_test_settings(endpoint);
        AuthenticatedClient::new(
            ApolloClient::new(settings.api).unwrap(),
            SessionManagerGeneric::new_with_provider(provider),
        )
    }
}
