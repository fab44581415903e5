//! HTTP transport for the FMP API.
//!
//! A thin wrapper around `reqwest` behind the [`Transport`] trait, which
//! is the seam the request pipeline is tested through. The production
//! implementation injects the API-key credential as a fixed query
//! parameter on every request; the key never appears in per-call
//! parameters, cache keys, or logs.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Url};
use std::time::Duration;

use crate::errors::FmpError;

/// Default HTTP request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of one HTTP exchange.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

/// One HTTP GET against the remote API.
///
/// Network-layer failures (DNS, connection refused, timeout) surface as
/// [`FmpError::Network`]; the pipeline does not retry those.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET for `url` with `params` as the query string.
    async fn get(&self, url: &str, params: &[(String, String)])
        -> Result<HttpResponse, FmpError>;
}

/// Production transport over a shared `reqwest` client.
pub struct HttpTransport {
    client: Client,
    api_key: String,
}

impl HttpTransport {
    /// Create a transport that authenticates with `api_key`.
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, api_key }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<HttpResponse, FmpError> {
        let mut all_params: Vec<(&str, &str)> = params
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();
        all_params.push(("apikey", &self.api_key));

        let full_url = Url::parse_with_params(url, &all_params)
            .map_err(|e| FmpError::InvalidArgument(format!("failed to build URL: {e}")))?;

        debug!(
            "FMP request: {}",
            full_url.as_str().replace(&self.api_key, "***")
        );

        let response = self.client.get(full_url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(HttpResponse { status, body })
    }
}
