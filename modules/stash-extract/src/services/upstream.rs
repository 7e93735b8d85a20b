// Shared upstream access for every platform service: the fetcher, timeouts,
// and the small typed decoders for formats several platforms share (oEmbed,
// the metadata-extraction proxy, Open Graph). Every decoder yields `Ok(None)`
// when the upstream answered with nothing usable.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use stash_common::ExtractConfig;

use crate::error::FetchError;
use crate::fallback::AttemptResult;
use crate::fetch::{get_json, HttpFetcher};
use crate::meta::{extract_meta, PageMeta};

#[derive(Clone)]
pub(crate) struct Upstream {
    pub fetcher: Arc<dyn HttpFetcher>,
    pub config: Arc<ExtractConfig>,
}

impl Upstream {
    pub(crate) fn new(fetcher: Arc<dyn HttpFetcher>, config: Arc<ExtractConfig>) -> Self {
        Self { fetcher, config }
    }

    pub(crate) fn short(&self) -> Duration {
        self.config.short_timeout
    }

    pub(crate) fn standard(&self) -> Duration {
        self.config.standard_timeout
    }

    pub(crate) fn page(&self) -> Duration {
        self.config.page_timeout
    }

    pub(crate) async fn text(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        self.fetcher.get_text(url, timeout).await
    }

    pub(crate) async fn json<T: DeserializeOwned>(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<T, FetchError> {
        get_json(self.fetcher.as_ref(), url, timeout).await
    }

    /// Fetch a platform's own oEmbed endpoint.
    pub(crate) async fn oembed(&self, endpoint: &str, timeout: Duration) -> AttemptResult<OEmbed> {
        let payload: OEmbed = self.json(endpoint, timeout).await?;
        Ok(payload.usable())
    }

    /// Third-party oEmbed proxy for platforms whose own endpoint needs auth.
    pub(crate) async fn oembed_proxy(&self, target: &str) -> AttemptResult<OEmbed> {
        let endpoint = format!("{}?url={}", self.config.oembed_proxy_url, encode(target));
        self.oembed(&endpoint, self.standard()).await
    }

    /// Generic metadata-extraction proxy.
    pub(crate) async fn metadata_proxy(&self, target: &str) -> AttemptResult<ProxyData> {
        let endpoint = format!(
            "{}/?url={}",
            self.config.metadata_proxy_url.trim_end_matches('/'),
            encode(target)
        );
        let envelope: ProxyEnvelope = self.json(&endpoint, self.standard()).await?;
        if envelope.status.as_deref().is_some_and(|s| s != "success") {
            return Ok(None);
        }
        Ok(envelope.data.filter(|d| !d.is_empty()))
    }

    /// Direct fetch of the target page, reading only its meta tags.
    pub(crate) async fn open_graph(&self, target: &str) -> AttemptResult<PageMeta> {
        let html = self.text(target, self.page()).await?;
        let meta = extract_meta(&html);
        Ok((!meta.is_empty()).then_some(meta))
    }
}

pub(crate) fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

// --- oEmbed ---

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct OEmbed {
    pub title: Option<String>,
    pub author_name: Option<String>,
    pub author_url: Option<String>,
    /// TikTok's bare handle.
    pub author_unique_id: Option<String>,
    pub html: Option<String>,
    pub thumbnail_url: Option<String>,
    /// Proxies report upstream failure in-band.
    pub error: Option<String>,
}

impl OEmbed {
    fn usable(self) -> Option<Self> {
        if self.error.is_some() {
            return None;
        }
        let has_any = [&self.title, &self.author_name, &self.html, &self.thumbnail_url]
            .iter()
            .any(|f| f.as_deref().is_some_and(|v| !v.trim().is_empty()));
        has_any.then_some(self)
    }
}

// --- metadata proxy ---

#[derive(Debug, Deserialize)]
struct ProxyEnvelope {
    status: Option<String>,
    data: Option<ProxyData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ProxyData {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub image: Option<ProxyMedia>,
    pub video: Option<ProxyMedia>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ProxyMedia {
    pub url: Option<String>,
}

impl ProxyData {
    pub(crate) fn image_url(&self) -> Option<String> {
        self.image.as_ref().and_then(|m| m.url.clone()).filter(|u| !u.is_empty())
    }

    pub(crate) fn video_url(&self) -> Option<String> {
        self.video.as_ref().and_then(|m| m.url.clone()).filter(|u| !u.is_empty())
    }

    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.image_url().is_none()
            && self.video_url().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oembed_with_error_is_unusable() {
        let payload: OEmbed =
            serde_json::from_str(r#"{"error":"no matching providers found"}"#).unwrap();
        assert!(payload.usable().is_none());
    }

    #[test]
    fn oembed_tolerates_unknown_fields() {
        let payload: OEmbed = serde_json::from_str(
            r#"{"version":"1.0","type":"video","title":"Clip","author_name":"bob","width":320}"#,
        )
        .unwrap();
        let payload = payload.usable().unwrap();
        assert_eq!(payload.title.as_deref(), Some("Clip"));
    }

    #[test]
    fn proxy_payload_reads_nested_media() {
        let envelope: ProxyEnvelope = serde_json::from_str(
            r#"{"status":"success","data":{"title":"T","image":{"url":"https://i/x.png","width":10},"video":null}}"#,
        )
        .unwrap();
        let data = envelope.data.unwrap();
        assert_eq!(data.image_url().as_deref(), Some("https://i/x.png"));
        assert_eq!(data.video_url(), None);
    }

    #[test]
    fn encode_escapes_query_characters() {
        assert_eq!(encode("https://a.com/?x=1&y=2"), "https%3A%2F%2Fa.com%2F%3Fx%3D1%26y%3D2");
    }
}
