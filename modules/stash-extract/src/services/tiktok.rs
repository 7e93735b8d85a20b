// TikTok resolver. Short links are expanded first; oEmbed supplies caption,
// author and the embed player, and the metadata proxy fills whatever oEmbed
// left out. A post with neither a caption nor an image is a failure.

use stash_common::{ExtractedContent, ImageProvenance, PlatformKind};
use tracing::{debug, info, warn};

use crate::canonical::{canonicalize, is_tiktok_short_link, url_handle};
use crate::error::{ExtractError, Result};
use crate::fallback::FallbackChain;
use crate::services::upstream::{encode, OEmbed, ProxyData, Upstream};
use crate::text_extract::first_line;

const PLATFORM: PlatformKind = PlatformKind::Tiktok;
const OEMBED_ENDPOINT: &str = "https://www.tiktok.com/oembed";

pub(crate) struct TiktokService {
    upstream: Upstream,
}

impl TiktokService {
    pub(crate) fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    pub(crate) async fn resolve(&self, url: &str) -> Result<ExtractedContent> {
        let target = self.expand(url).await;
        info!(url = target.as_str(), "tiktok: resolving video");

        let oembed_url = format!("{OEMBED_ENDPOINT}?url={}", encode(&target));
        let oembed = FallbackChain::new(PLATFORM, "oembed")
            .attempt(
                "oembed",
                self.upstream.standard(),
                self.upstream.oembed(&oembed_url, self.upstream.standard()),
            )
            .run()
            .await
            .unwrap_or_default();

        let mut caption = oembed.title.clone().filter(|t| !t.trim().is_empty());
        let mut author = oembed_author(&oembed);
        let mut image = oembed
            .thumbnail_url
            .clone()
            .map(|u| (u, ImageProvenance::OEmbed));
        let mut video = None;

        if caption.is_none() || author.is_none() || image.is_none() {
            debug!(url = target.as_str(), "tiktok: filling gaps from metadata proxy");
            let proxy = FallbackChain::new(PLATFORM, "metadata")
                .attempt(
                    "metadata_proxy",
                    self.upstream.standard(),
                    self.upstream.metadata_proxy(&target),
                )
                .run()
                .await;
            if let Some(data) = proxy {
                fill_from_proxy(&data, &mut caption, &mut author, &mut image);
                video = data.video_url();
            }
        }

        if caption.is_none() && image.is_none() {
            return Err(ExtractError::exhausted(
                PLATFORM,
                "no caption or thumbnail available; the video may be private or removed",
            ));
        }

        let author = author.or_else(|| url_handle(&target, PLATFORM));
        let text = caption.unwrap_or_default();
        let title = match (first_line(&text, 80), &author) {
            (Some(line), _) => line,
            (None, Some(author)) => format!("TikTok by {author}"),
            (None, None) => "TikTok video".to_string(),
        };
        let (image, provenance) = match image {
            Some((url, provenance)) => (Some(url), provenance),
            None => (None, ImageProvenance::None),
        };

        Ok(ExtractedContent::new(title, text, "tiktok.com")
            .with_author(author)
            .with_image(image, provenance)
            .with_video(video)
            .with_embed(oembed.html))
    }

    /// Short links only resolve through a redirect. A failed expansion falls
    /// back to the link as submitted.
    async fn expand(&self, url: &str) -> String {
        if !is_tiktok_short_link(url) {
            return canonicalize(url);
        }
        match self
            .upstream
            .fetcher
            .resolve_redirects(url, self.upstream.short())
            .await
        {
            Ok(resolved) => {
                debug!(from = url, to = resolved.as_str(), "tiktok: expanded short link");
                canonicalize(&resolved)
            }
            Err(e) => {
                warn!(url, error = %e, "tiktok: short link expansion failed");
                url.to_string()
            }
        }
    }
}

fn oembed_author(oembed: &OEmbed) -> Option<String> {
    oembed
        .author_unique_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .map(|id| format!("@{}", id.trim_start_matches('@')))
        .or_else(|| oembed.author_name.clone().filter(|a| !a.trim().is_empty()))
}

fn fill_from_proxy(
    data: &ProxyData,
    caption: &mut Option<String>,
    author: &mut Option<String>,
    image: &mut Option<(String, ImageProvenance)>,
) {
    if caption.is_none() {
        *caption = data
            .description
            .clone()
            .or_else(|| data.title.clone())
            .filter(|c| !c.trim().is_empty());
    }
    if author.is_none() {
        *author = data.author.clone().filter(|a| !a.trim().is_empty());
    }
    if image.is_none() {
        *image = data.image_url().map(|u| (u, ImageProvenance::MetadataProxy));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_id_is_preferred_author() {
        let oembed = OEmbed {
            author_name: Some("Bob Smith".to_string()),
            author_unique_id: Some("bobsmith".to_string()),
            ..Default::default()
        };
        assert_eq!(oembed_author(&oembed).as_deref(), Some("@bobsmith"));

        let oembed = OEmbed {
            author_name: Some("Bob Smith".to_string()),
            ..Default::default()
        };
        assert_eq!(oembed_author(&oembed).as_deref(), Some("Bob Smith"));
    }

    #[test]
    fn proxy_only_fills_missing_fields() {
        let data: ProxyData = serde_json::from_str(
            r#"{"title":"Proxy title","description":"Proxy caption","author":"proxy","image":{"url":"https://p/img.jpg"}}"#,
        )
        .unwrap();
        let mut caption = Some("Original caption".to_string());
        let mut author = None;
        let mut image = None;
        fill_from_proxy(&data, &mut caption, &mut author, &mut image);
        assert_eq!(caption.as_deref(), Some("Original caption"));
        assert_eq!(author.as_deref(), Some("proxy"));
        assert_eq!(
            image,
            Some(("https://p/img.jpg".to_string(), ImageProvenance::MetadataProxy))
        );
    }
}
