//! Transport to the remote search endpoint.
//!
//! The core only needs the [`SearchTransport`] capability; [`HttpTransport`]
//! implements it over reqwest with bearer auth and the protocol headers
//! (client version tag, caller-resolved locale, per-request correlation id).
//!
//! A non-success status or malformed payload propagates to the caller
//! unmodified; no retry, no partial-result salvage. Callers own
//! cancellation and supersession policy.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::request::SearchRequestBody;
use crate::response::SearchResponse;

pub const STABLE_ENDPOINT: &str = "https://graph.microsoft.com/v1.0/search/query";
pub const BETA_ENDPOINT: &str = "https://graph.microsoft.com/beta/search/query";

/// Fixed protocol/client version tag sent with every request.
pub const CLIENT_TAG: &str = concat!("searchwire/", env!("CARGO_PKG_VERSION"));

/// Resolve the endpoint once from configuration. A configuration change
/// that flips the beta flag takes effect on the next invocation.
pub fn endpoint_for(use_beta_endpoint: bool) -> &'static str {
    if use_beta_endpoint {
        BETA_ENDPOINT
    } else {
        STABLE_ENDPOINT
    }
}

/// Per-invocation header inputs the caller derives externally.
#[derive(Debug, Clone, Default)]
pub struct RequestHeaders {
    /// Locale for `Accept-Language`, e.g. `en-us`.
    pub locale: Option<String>,
}

/// Capability of posting one compiled request and returning the raw reply.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    async fn post(
        &self,
        endpoint: &str,
        body: &SearchRequestBody,
        headers: &RequestHeaders,
    ) -> Result<SearchResponse>;
}

/// HTTP implementation over reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
    bearer_token: String,
}

impl HttpTransport {
    pub fn new(bearer_token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            bearer_token: bearer_token.into(),
        })
    }
}

#[async_trait]
impl SearchTransport for HttpTransport {
    async fn post(
        &self,
        endpoint: &str,
        body: &SearchRequestBody,
        headers: &RequestHeaders,
    ) -> Result<SearchResponse> {
        let mut request = self
            .client
            .post(endpoint)
            .bearer_auth(&self.bearer_token)
            .header("Content-Type", "application/json")
            .header("SdkVersion", CLIENT_TAG)
            .header("client-request-id", uuid::Uuid::new_v4().to_string());

        if let Some(locale) = &headers.locale {
            request = request.header("Accept-Language", locale);
        }

        let response = request
            .json(body)
            .send()
            .await
            .context("search request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Search API error {}: {}", status, body_text);
        }

        response
            .json::<SearchResponse>()
            .await
            .context("failed to parse search response")
    }
}
