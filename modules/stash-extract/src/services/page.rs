// Generic article extraction for hosts no platform resolver claims.
// Fetch the HTML, prefer readability output, then fall back through the
// page's own description and finally its visible text.

use stash_common::{ExtractedContent, ImageProvenance, PlatformKind};
use tracing::{debug, info};
use url::Url;

use crate::canonical::canonicalize;
use crate::error::{ExtractError, Result};
use crate::fallback::{AttemptResult, FallbackChain};
use crate::meta::extract_meta;
use crate::readability::readable_markdown;
use crate::router::source_domain;
use crate::services::upstream::Upstream;
use crate::text_extract::{strip_html, truncate_chars};

const PLATFORM: PlatformKind = PlatformKind::Generic;

/// Readability output shorter than this is treated as a miss.
const MIN_READABLE_CHARS: usize = 100;
/// Article bodies are cut to this many characters.
const MAX_BODY_CHARS: usize = 5000;

pub(crate) struct PageService {
    upstream: Upstream,
}

impl PageService {
    pub(crate) fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    pub(crate) async fn resolve(&self, url: &str) -> Result<ExtractedContent> {
        let canonical = canonicalize(url);
        info!(url = canonical.as_str(), "page: extracting article");

        let html = FallbackChain::new(PLATFORM, "html")
            .attempt("direct_fetch", self.upstream.page(), self.fetch_html(&canonical))
            .run()
            .await;

        if let Some(html) = html {
            return extract_article(&canonical, &html).ok_or_else(|| {
                ExtractError::exhausted(PLATFORM, "the page had no readable text or preview image")
            });
        }

        debug!(url = canonical.as_str(), "page: direct fetch failed, trying metadata proxy");
        let proxy = FallbackChain::new(PLATFORM, "metadata")
            .attempt(
                "metadata_proxy",
                self.upstream.standard(),
                self.upstream.metadata_proxy(&canonical),
            )
            .run()
            .await
            .ok_or_else(|| {
                ExtractError::exhausted(
                    PLATFORM,
                    "the page could not be fetched and the metadata proxy had nothing; the site may block automated requests",
                )
            })?;

        let source = source_domain(&canonical);
        let image = proxy.image_url();
        let video = proxy.video_url();
        let content = proxy.description.clone().unwrap_or_default();
        let title = proxy.title.clone().unwrap_or_else(|| source.clone());
        let result = ExtractedContent::new(title, content, source)
            .with_author(proxy.author.clone().or(proxy.publisher.clone()))
            .with_image(image, ImageProvenance::MetadataProxy)
            .with_video(video);
        if !result.is_well_formed() {
            return Err(ExtractError::exhausted(PLATFORM, "the metadata proxy returned no text or media"));
        }
        Ok(result)
    }

    async fn fetch_html(&self, url: &str) -> AttemptResult<String> {
        let html = self.upstream.text(url, self.upstream.page()).await?;
        Ok(Some(html).filter(|h| !h.trim().is_empty()))
    }
}

/// Build the article from fetched HTML. `None` when the page yields neither
/// text nor an image.
pub(crate) fn extract_article(url: &str, html: &str) -> Option<ExtractedContent> {
    let meta = extract_meta(html);
    let source = source_domain(url);

    let readable = readable_markdown(html, url)
        .filter(|text| text.chars().count() >= MIN_READABLE_CHARS);
    let content = match readable {
        Some(text) => text,
        None => match meta.description.clone() {
            Some(description) => description,
            None => strip_html(html),
        },
    };
    let content = truncate_chars(&content, MAX_BODY_CHARS);

    let title = meta
        .best_title()
        .map(str::to_string)
        .unwrap_or_else(|| source.clone());
    let image = meta.image.as_deref().and_then(|src| absolutize(url, src));
    let video = meta.video.as_deref().and_then(|src| absolutize(url, src));

    let article = ExtractedContent::new(title, content, source)
        .with_author(meta.author.clone())
        .with_image(image, ImageProvenance::OpenGraph)
        .with_video(video);
    (article.has_text() || article.image_url.is_some()).then_some(article)
}

/// og:image is often relative; resolve it against the page URL.
fn absolutize(page: &str, src: &str) -> Option<String> {
    match Url::parse(src) {
        Ok(abs) => Some(abs.to_string()),
        Err(_) => Url::parse(page).ok()?.join(src).ok().map(|u| u.to_string()),
    }
}
