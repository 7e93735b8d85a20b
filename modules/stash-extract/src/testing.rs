// Test mocks for the extraction stack.
//
// MockFetcher (HttpFetcher): URL→response map with failure and hang routes
// and a log of every URL requested, so tests can assert fallback order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use stash_common::ExtractConfig;

use crate::error::FetchError;
use crate::extractor::ContentExtractor;
use crate::fetch::HttpFetcher;

#[derive(Debug, Clone)]
enum Route {
    Body(String),
    Status(u16),
    /// Never answers; the caller's timeout decides.
    Hang,
}

/// HashMap-based fetcher. Unregistered URLs answer 404.
/// Routes match the exact URL first, then the longest registered prefix, so
/// tests can register endpoints without spelling out every query parameter.
/// Builder pattern: `.on_text()`, `.on_json()`, `.on_error()`, `.on_hang()`, `.on_redirect()`.
#[derive(Default)]
pub struct MockFetcher {
    routes: HashMap<String, Route>,
    redirects: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_text(mut self, url: &str, body: impl Into<String>) -> Self {
        self.routes.insert(url.to_string(), Route::Body(body.into()));
        self
    }

    pub fn on_json(self, url: &str, body: serde_json::Value) -> Self {
        self.on_text(url, body.to_string())
    }

    pub fn on_error(mut self, url: &str, status: u16) -> Self {
        self.routes.insert(url.to_string(), Route::Status(status));
        self
    }

    pub fn on_hang(mut self, url: &str) -> Self {
        self.routes.insert(url.to_string(), Route::Hang);
        self
    }

    pub fn on_redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    /// Every URL requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Requests whose URL starts with `prefix`.
    pub fn calls_to(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|url| url.starts_with(prefix))
            .collect()
    }

    fn record(&self, url: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.to_string());
        }
    }

    fn route(&self, url: &str) -> Option<&Route> {
        self.routes.get(url).or_else(|| {
            self.routes
                .iter()
                .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
                .max_by_key(|(prefix, _)| prefix.len())
                .map(|(_, route)| route)
        })
    }
}

#[async_trait]
impl HttpFetcher for MockFetcher {
    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        self.record(url);
        match self.route(url).cloned() {
            Some(Route::Body(body)) => Ok(body),
            Some(Route::Status(status)) => Err(FetchError::Status {
                status,
                url: url.to_string(),
            }),
            Some(Route::Hang) => {
                let _ = tokio::time::timeout(timeout, std::future::pending::<()>()).await;
                Err(FetchError::Timeout(timeout))
            }
            None => Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }

    async fn resolve_redirects(&self, url: &str, _timeout: Duration) -> Result<String, FetchError> {
        self.record(url);
        self.redirects
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Network(format!("MockFetcher: no redirect registered for {url}")))
    }
}

/// Config with short timeouts so hang routes fail fast in tests.
pub fn fast_config() -> ExtractConfig {
    ExtractConfig {
        short_timeout: Duration::from_millis(200),
        standard_timeout: Duration::from_millis(200),
        page_timeout: Duration::from_millis(200),
        ..ExtractConfig::default()
    }
}

/// Extractor over a mock fetcher. Returns the fetcher too, for call assertions.
pub fn mock_extractor(fetcher: MockFetcher) -> (ContentExtractor, Arc<MockFetcher>) {
    let fetcher = Arc::new(fetcher);
    let extractor = ContentExtractor::new(fetcher.clone(), fast_config());
    (extractor, fetcher)
}
