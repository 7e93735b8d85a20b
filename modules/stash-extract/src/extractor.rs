// ContentExtractor: the single entry point for turning a URL into
// `ExtractedContent`. Callers never pick a resolver; the URL's host does.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use stash_common::{ExtractConfig, ExtractedContent, PlatformKind};
use tracing::{info, warn};

use crate::error::{ExtractError, Result};
use crate::fetch::{HttpFetcher, ReqwestFetcher};
use crate::router::{classify, parse_lenient};
use crate::services::instagram::InstagramService;
use crate::services::linkedin::LinkedinService;
use crate::services::page::PageService;
use crate::services::reddit::RedditService;
use crate::services::tiktok::TiktokService;
use crate::services::twitter::TwitterService;
use crate::services::upstream::Upstream;
use crate::services::youtube::YoutubeService;

/// Anything that can turn a URL into extracted content. The pipeline depends
/// on this rather than on `ContentExtractor`, so tests can substitute it.
#[async_trait]
pub trait ContentExtraction: Send + Sync {
    async fn extract(&self, url: &str) -> Result<ExtractedContent>;
}

pub struct ContentExtractor {
    twitter: TwitterService,
    instagram: InstagramService,
    linkedin: LinkedinService,
    tiktok: TiktokService,
    youtube: YoutubeService,
    reddit: RedditService,
    page: PageService,
}

impl ContentExtractor {
    pub fn new(fetcher: Arc<dyn HttpFetcher>, config: ExtractConfig) -> Self {
        let upstream = Upstream::new(fetcher, Arc::new(config));
        Self {
            twitter: TwitterService::new(upstream.clone()),
            instagram: InstagramService::new(upstream.clone()),
            linkedin: LinkedinService::new(upstream.clone()),
            tiktok: TiktokService::new(upstream.clone()),
            youtube: YoutubeService::new(upstream.clone()),
            reddit: RedditService::new(upstream.clone()),
            page: PageService::new(upstream),
        }
    }

    /// Production extractor over a real HTTP client.
    pub fn from_config(config: ExtractConfig) -> anyhow::Result<Self> {
        let fetcher = ReqwestFetcher::new(&config)?;
        Ok(Self::new(Arc::new(fetcher), config))
    }

    async fn dispatch(&self, platform: PlatformKind, url: &str) -> Result<ExtractedContent> {
        match platform {
            PlatformKind::Twitter => self.twitter.resolve(url).await,
            PlatformKind::Instagram => self.instagram.resolve(url).await,
            PlatformKind::Linkedin => self.linkedin.resolve(url).await,
            PlatformKind::Tiktok => self.tiktok.resolve(url).await,
            PlatformKind::Youtube => self.youtube.resolve(url).await,
            PlatformKind::Reddit => self.reddit.resolve(url).await,
            PlatformKind::Generic => self.page.resolve(url).await,
        }
    }
}

#[async_trait]
impl ContentExtraction for ContentExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractedContent> {
        if parse_lenient(url).is_none() {
            return Err(ExtractError::InvalidUrl(url.to_string()));
        }
        let platform = classify(url);
        let started = Instant::now();

        let result = self
            .dispatch(platform, url)
            .await
            .and_then(|content| well_formed(platform, content));
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(content) => info!(
                url,
                %platform,
                elapsed_ms,
                has_text = content.has_text(),
                has_media = content.has_media(),
                placeholder = content.is_placeholder,
                "Extraction complete"
            ),
            Err(e) => warn!(url, %platform, elapsed_ms, error = %e, "Extraction failed"),
        }
        result
    }
}

/// No resolver may hand back an item with neither text nor media unless it is
/// an explicit placeholder.
fn well_formed(platform: PlatformKind, content: ExtractedContent) -> Result<ExtractedContent> {
    if content.is_well_formed() {
        Ok(content)
    } else {
        Err(ExtractError::exhausted(
            platform,
            "the source answered but carried no text or media",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_results_become_exhausted() {
        let empty = ExtractedContent::new("Headline only", "  ", "example.com");
        let err = well_formed(PlatformKind::Generic, empty).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Exhausted {
                platform: PlatformKind::Generic,
                ..
            }
        ));

        let placeholder = ExtractedContent::placeholder("Post", "", "linkedin.com");
        assert!(well_formed(PlatformKind::Linkedin, placeholder).is_ok());
    }
}
