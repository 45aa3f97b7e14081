//! Authenticated API access with token refresh
//!
//! Pairs the GraphQL client with a session manager so every call carries the
//! current bearer token and recovers from expiry once.

use tracing::info;

use super::client::ApolloClient;
use crate::{
    Result,
    config::Settings,
    session::{SessionManagerGeneric, TokenBootstrap, TokenProvider},
    types::{GraphqlRequest, ProductInfo, SearchResult, SkuInfo, SkuQuery},
};

/// Authenticated client backed by a real browser bootstrap
pub type BrowserAuthenticatedClient = AuthenticatedClient<TokenBootstrap>;

/// GraphQL client that owns its token lifecycle
#[derive(Debug)]
pub struct AuthenticatedClient<P: TokenProvider> {
    api: ApolloClient,
    sessions: SessionManagerGeneric<P>,
}

impl AuthenticatedClient<TokenBootstrap> {
    /// Client using the configured API endpoint and browser bootstrap
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(
            ApolloClient::new(settings.api.clone())?,
            SessionManagerGeneric::new(settings),
        ))
    }
}

impl<P: TokenProvider> AuthenticatedClient<P> {
    pub fn new(api: ApolloClient, sessions: SessionManagerGeneric<P>) -> Self {
        Self { api, sessions }
    }

    /// The underlying session manager
    pub fn sessions(&self) -> &SessionManagerGeneric<P> {
        &self.sessions
    }

    /// Execute any GraphQL request with refresh-on-expiry
    pub async fn execute<T>(&self, request: &GraphqlRequest) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.sessions
            .call_with_refresh(|token| async move { self.api.call(request, &token).await })
            .await
    }

    /// `getSkuInfo` for `sku` delivered to `pincode`
    pub async fn sku_info(&self, sku: &str, pincode: &str) -> Result<SkuInfo> {
        self.execute(&GraphqlRequest::sku_info(&SkuQuery::new(sku, pincode)))
            .await
    }

    /// Product view for `sku`: pricing, availability and product page URL
    pub async fn product_info(&self, sku: &str, pincode: &str) -> Result<ProductInfo> {
        let info = self.sku_info(sku, pincode).await?;
        Ok(ProductInfo::from_sku_info(
            sku,
            &self.api.settings().product_base_url,
            &info,
        ))
    }

    /// First page of `searchMedicineProducts` results
    pub async fn search_products(&self, search_text: &str, page_size: u32) -> Result<SearchResult> {
        let result: SearchResult = self
            .execute(&GraphqlRequest::search_products(search_text, page_size, 0))
            .await?;
        info!(
            "Search '{}' returned {} products (total {:?})",
            search_text,
            result.products.len(),
            result.total_count
        );
        Ok(result)
    }

    /// Close the current browser session
    pub async fn close(&self) {
        self.sessions.close().await;
    }
}
