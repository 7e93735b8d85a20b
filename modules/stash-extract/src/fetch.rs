// Outbound HTTP seam. Resolvers only ever see `HttpFetcher`, so tests swap in
// a URL-keyed mock and never touch the network.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use stash_common::ExtractConfig;
use tracing::debug;

use crate::error::FetchError;

/// Bodies beyond this are cut off; the head of a page is all any resolver reads.
const MAX_BODY_BYTES: usize = 3_000_000;

#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// GET a URL and return the body as text. Non-2xx is an error.
    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;

    /// Follow redirects from `url` and return the final location.
    async fn resolve_redirects(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;
}

/// GET a URL and decode the body as JSON into `T`.
pub async fn get_json<T: DeserializeOwned>(
    fetcher: &dyn HttpFetcher,
    url: &str,
    timeout: Duration,
) -> Result<T, FetchError> {
    let body = fetcher.get_text(url, timeout).await?;
    Ok(serde_json::from_str(&body)?)
}

/// Production fetcher backed by reqwest.
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(config: &ExtractConfig) -> anyhow::Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US,en;q=0.5"),
        );

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(config.page_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        debug!(url, timeout_ms = timeout.as_millis() as u64, "fetch: GET");

        let request = async {
            let resp = self
                .client
                .get(url)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| request_error(e, timeout))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }
            let body = resp.bytes().await.map_err(|e| request_error(e, timeout))?;
            let body = &body[..body.len().min(MAX_BODY_BYTES)];
            Ok(String::from_utf8_lossy(body).into_owned())
        };

        match tokio::time::timeout(timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(timeout)),
        }
    }

    async fn resolve_redirects(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        debug!(url, "fetch: resolving redirects");

        let request = async {
            let resp = self
                .client
                .get(url)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| request_error(e, timeout))?;
            Ok::<_, FetchError>(resp.url().to_string())
        };

        match tokio::time::timeout(timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(timeout)),
        }
    }
}

fn request_error(err: reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(timeout)
    } else {
        FetchError::Network(err.to_string())
    }
}
