//! GraphQL API client
//!
//! Issues single authenticated requests against the pharmacy API and
//! classifies the outcome. Refresh-and-retry lives in
//! [`AuthenticatedClient`](super::AuthenticatedClient).

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, ORIGIN, REFERER};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    Error, Result,
    config::ApiSettings,
    types::{BearerToken, GraphqlRequest, GraphqlResponse, SearchResult, SkuInfo, SkuQuery},
};

/// Structured error code the API uses for rejected credentials
pub const UNAUTHENTICATED_CODE: &str = "UNAUTHENTICATED";

/// Longest body excerpt kept in error messages
const BODY_EXCERPT_LEN: usize = 200;

/// Pharmacy GraphQL client
#[derive(Debug, Clone)]
pub struct ApolloClient {
    /// HTTP client
    client: Client,
    settings: ApiSettings,
}

impl ApolloClient {
    /// Create a client with the configured timeout and identity headers
    pub fn new(settings: ApiSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self { client, settings })
    }

    /// API settings in use
    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    /// Send `request` with `token` and decode the operation's payload.
    ///
    /// Fails with [`Error::TokenExpired`] on HTTP 401 or an `UNAUTHENTICATED`
    /// error code in the body, whatever the transport status. Every other
    /// failure is returned as a non-expiry error.
    pub async fn call<T: DeserializeOwned>(
        &self,
        request: &GraphqlRequest,
        token: &BearerToken,
    ) -> Result<T> {
        debug!(
            "POST {} operation={} token={}",
            self.settings.endpoint,
            request.operation_name,
            token.preview()
        );

        let response = self
            .client
            .post(&self.settings.endpoint)
            .header(AUTHORIZATION, token.header_value())
            .header(ORIGIN, &self.settings.origin)
            .header(REFERER, &self.settings.referer)
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        classify_response(status, &body, &request.operation_name)
    }

    /// `getSkuInfo` for one SKU
    pub async fn get_sku_info(&self, query: &SkuQuery, token: &BearerToken) -> Result<SkuInfo> {
        self.call(&GraphqlRequest::sku_info(query), token).await
    }

    /// `searchMedicineProducts` first page
    pub async fn search_products(
        &self,
        search_text: &str,
        page_size: u32,
        token: &BearerToken,
    ) -> Result<SearchResult> {
        self.call(
            &GraphqlRequest::search_products(search_text, page_size, 0),
            token,
        )
        .await
    }
}

/// Classify a raw API response and decode `data.<operation>`.
pub fn classify_response<T: DeserializeOwned>(
    status: u16,
    body: &str,
    operation: &str,
) -> Result<T> {
    if status == 401 {
        return Err(Error::token_expired(format!(
            "HTTP 401 for {}",
            operation
        )));
    }

    let parsed = serde_json::from_str::<GraphqlResponse>(body).ok();

    if let Some(response) = &parsed {
        if response
            .errors
            .iter()
            .any(|e| e.code() == Some(UNAUTHENTICATED_CODE))
        {
            return Err(Error::token_expired(response.error_summary()));
        }
    }

    if !(200..300).contains(&status) {
        let message = match &parsed {
            Some(response) if !response.errors.is_empty() => response.error_summary(),
            _ => excerpt(body),
        };
        return Err(Error::api(Some(status), message));
    }

    let response = parsed.ok_or_else(|| {
        Error::api(
            Some(status),
            format!("malformed response body: {}", excerpt(body)),
        )
    })?;

    if !response.errors.is_empty() {
        return Err(Error::api(Some(status), response.error_summary()));
    }

    let payload = response
        .data
        .and_then(|mut data| data.get_mut(operation).map(serde_json::Value::take))
        .filter(|payload| !payload.is_null())
        .ok_or_else(|| Error::api(Some(status), format!("no data for {}", operation)))?;

    serde_json::from_value(payload).map_err(|e| {
        Error::api(
            Some(status),
            format!("unexpected {} payload: {}", operation, e),
        )
    })
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() > BODY_EXCERPT_LEN {
        let cut: String = trimmed.chars().take(BODY_EXCERPT_LEN).collect();
        format!("{}...", cut)
    } else {
        trimmed.to_string()
    }
}
