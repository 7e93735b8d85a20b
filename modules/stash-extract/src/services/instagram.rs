// Instagram resolver. Four independent sources, first success wins:
// the public captioned embed page, a third-party oEmbed proxy, the post's own
// Open Graph tags, and the metadata proxy. The author is always recoverable
// from the URL path, so even a total miss yields a labeled placeholder.

use std::sync::LazyLock;

use regex::Regex;
use stash_common::{ExtractedContent, ImageProvenance, PlatformKind};
use tracing::{info, warn};

use crate::canonical::{canonicalize, instagram_post, url_handle};
use crate::error::Result;
use crate::fallback::{AttemptResult, FallbackChain};
use crate::services::upstream::Upstream;
use crate::text_extract::{decode_entities, first_line, strip_html};

const PLATFORM: PlatformKind = PlatformKind::Instagram;

static DISPLAY_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""display_url"\s*:\s*"([^"]+)""#).expect("valid regex"));
static VIDEO_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""video_url"\s*:\s*"([^"]+)""#).expect("valid regex"));
static OWNER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""owner"\s*:\s*\{[^}]*?"username"\s*:\s*"([^"]+)""#).expect("valid regex")
});
static EMBED_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<img[^>]*class="[^"]*EmbeddedMediaImage[^"]*"[^>]*?\ssrc="([^"]+)""#)
        .expect("valid regex")
});
static CAPTION_USER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)class="CaptionUsername"[^>]*>([^<]+)<"#).expect("valid regex")
});
static CAPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<div class="Caption">(.*?)<div class="CaptionComments">"#)
        .expect("valid regex")
});
// og:title reads `Name on Instagram: "caption"`.
static OG_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)^(.+?) on Instagram:\s*"?(.*?)"?\s*$"#).expect("valid regex")
});

/// Whatever one source told us about the post.
#[derive(Debug, Clone, Default, PartialEq)]
struct InstagramPost {
    caption: Option<String>,
    author: Option<String>,
    image: Option<String>,
    video: Option<String>,
    embed_html: Option<String>,
    provenance: ImageProvenance,
}

impl InstagramPost {
    fn usable(self) -> Option<Self> {
        (self.caption.is_some() || self.image.is_some() || self.video.is_some()).then_some(self)
    }
}

pub(crate) struct InstagramService {
    upstream: Upstream,
}

impl InstagramService {
    pub(crate) fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    pub(crate) async fn resolve(&self, url: &str) -> Result<ExtractedContent> {
        let canonical = canonicalize(url);
        info!(url = canonical.as_str(), "instagram: resolving post");

        // The handle only survives in the submitted URL; canonical form drops it.
        let url_author = url_handle(url, PLATFORM);

        let post = FallbackChain::new(PLATFORM, "post")
            .attempt("embed_page", self.upstream.standard(), self.embed_page(&canonical))
            .attempt("oembed_proxy", self.upstream.standard(), self.oembed_proxy(&canonical))
            .attempt("open_graph", self.upstream.page(), self.open_graph(&canonical))
            .attempt("metadata_proxy", self.upstream.standard(), self.metadata_proxy(&canonical))
            .run()
            .await;

        let Some(post) = post else {
            warn!(url = canonical.as_str(), "instagram: every source failed, saving placeholder");
            return Ok(placeholder(url_author));
        };

        let author = post.author.clone().or(url_author);
        let caption = post.caption.clone().unwrap_or_default();
        let title = match (&author, first_line(&caption, 80)) {
            (_, Some(line)) => line,
            (Some(author), None) => format!("Instagram post by {author}"),
            (None, None) => "Instagram post".to_string(),
        };

        Ok(ExtractedContent::new(title, caption, "instagram.com")
            .with_author(author)
            .with_image(post.image, post.provenance)
            .with_video(post.video)
            .with_embed(post.embed_html))
    }

    async fn embed_page(&self, canonical: &str) -> AttemptResult<InstagramPost> {
        let Some((kind, code)) = instagram_post(canonical) else {
            return Ok(None);
        };
        let embed_url = format!("https://www.instagram.com/{kind}/{code}/embed/captioned/");
        let html = self.upstream.text(&embed_url, self.upstream.standard()).await?;
        Ok(parse_embed_page(&html))
    }

    async fn oembed_proxy(&self, canonical: &str) -> AttemptResult<InstagramPost> {
        let Some(oembed) = self.upstream.oembed_proxy(canonical).await? else {
            return Ok(None);
        };
        Ok(InstagramPost {
            caption: oembed.title.filter(|t| !t.trim().is_empty()),
            author: oembed.author_name.map(|a| handle(&a)),
            image: oembed.thumbnail_url,
            video: None,
            embed_html: oembed.html,
            provenance: ImageProvenance::OEmbed,
        }
        .usable())
    }

    async fn open_graph(&self, canonical: &str) -> AttemptResult<InstagramPost> {
        let Some(meta) = self.upstream.open_graph(canonical).await? else {
            return Ok(None);
        };
        let (author, caption) = match meta.title.as_deref().and_then(split_og_title) {
            Some((author, caption)) => (Some(author), Some(caption)),
            None => (None, meta.description.clone()),
        };
        Ok(InstagramPost {
            caption: caption.filter(|c| !c.is_empty()),
            author,
            image: meta.image,
            video: meta.video,
            embed_html: None,
            provenance: ImageProvenance::OpenGraph,
        }
        .usable())
    }

    async fn metadata_proxy(&self, canonical: &str) -> AttemptResult<InstagramPost> {
        let Some(data) = self.upstream.metadata_proxy(canonical).await? else {
            return Ok(None);
        };
        let image = data.image_url();
        let video = data.video_url();
        Ok(InstagramPost {
            caption: data.description.or(data.title).filter(|c| !c.is_empty()),
            author: data.author.map(|a| handle(&a)),
            image,
            video,
            embed_html: None,
            provenance: ImageProvenance::MetadataProxy,
        }
        .usable())
    }
}

fn placeholder(author: Option<String>) -> ExtractedContent {
    let title = match &author {
        Some(author) => format!("Instagram post by {author}"),
        None => "Instagram post".to_string(),
    };
    ExtractedContent::placeholder(
        title,
        "Instagram did not share this post's details. Open the original link to view it.",
        "instagram.com",
    )
    .with_author(author)
}

fn handle(name: &str) -> String {
    let name = name.trim();
    if name.starts_with('@') || name.contains(' ') {
        name.to_string()
    } else {
        format!("@{name}")
    }
}

/// JSON-escaped URLs inside the embed page's inline script.
fn unescape_json_url(raw: &str) -> String {
    raw.replace("\\/", "/").replace("\\u0026", "&")
}

fn parse_embed_page(html: &str) -> Option<InstagramPost> {
    let image = DISPLAY_URL_RE
        .captures(html)
        .map(|c| unescape_json_url(&c[1]))
        .or_else(|| EMBED_IMAGE_RE.captures(html).map(|c| decode_entities(&c[1])));
    let video = VIDEO_URL_RE.captures(html).map(|c| unescape_json_url(&c[1]));
    let author = OWNER_RE
        .captures(html)
        .map(|c| c[1].to_string())
        .or_else(|| CAPTION_USER_RE.captures(html).map(|c| c[1].trim().to_string()))
        .filter(|a| !a.is_empty());

    let caption = CAPTION_RE.captures(html).map(|c| {
        let text = strip_html(&c[1]);
        // The caption block opens with the username link.
        match &author {
            Some(a) => text.strip_prefix(a.as_str()).unwrap_or(&text).trim().to_string(),
            None => text,
        }
    });

    InstagramPost {
        caption: caption.filter(|c| !c.is_empty()),
        author: author.map(|a| handle(&a)),
        image,
        video,
        embed_html: None,
        provenance: ImageProvenance::EmbedPage,
    }
    .usable()
}

fn split_og_title(title: &str) -> Option<(String, String)> {
    let caps = OG_TITLE_RE.captures(title)?;
    Some((caps[1].trim().to_string(), caps[2].trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_page_yields_media_author_and_caption() {
        let html = r#"<html><body>
            <img class="EmbeddedMediaImage" alt="x" src="https://scontent.cdninstagram.com/a.jpg?x=1&amp;y=2">
            <div class="Caption"><a class="CaptionUsername" href="/jane">jane</a> Sunset over the bay<br>#travel<div class="CaptionComments"></div></div>
        </body></html>"#;
        let post = parse_embed_page(html).unwrap();
        assert_eq!(post.image.as_deref(), Some("https://scontent.cdninstagram.com/a.jpg?x=1&y=2"));
        assert_eq!(post.author.as_deref(), Some("@jane"));
        assert_eq!(post.caption.as_deref(), Some("Sunset over the bay\n#travel"));
        assert_eq!(post.provenance, ImageProvenance::EmbedPage);
    }

    #[test]
    fn embed_page_prefers_inline_json() {
        let html = r#"<script>{"display_url":"https:\/\/cdn\/full.jpg","video_url":"https:\/\/cdn\/v.mp4?a=1&b=2","owner":{"id":"1","username":"bob"}}</script>"#;
        let post = parse_embed_page(html).unwrap();
        assert_eq!(post.image.as_deref(), Some("https://cdn/full.jpg"));
        assert_eq!(post.video.as_deref(), Some("https://cdn/v.mp4?a=1&b=2"));
        assert_eq!(post.author.as_deref(), Some("@bob"));
    }

    #[test]
    fn login_page_is_not_a_post() {
        assert!(parse_embed_page("<html><title>Login • Instagram</title></html>").is_none());
    }

    #[test]
    fn og_title_splits_author_and_caption() {
        assert_eq!(
            split_og_title(r#"Jane Doe on Instagram: "Sunset""#),
            Some(("Jane Doe".to_string(), "Sunset".to_string()))
        );
        assert_eq!(split_og_title("Instagram"), None);
    }

    #[test]
    fn placeholder_keeps_url_author() {
        let content = placeholder(Some("@jane".to_string()));
        assert!(content.is_placeholder);
        assert_eq!(content.title, "Instagram post by @jane");
        assert_eq!(content.author.as_deref(), Some("@jane"));
        assert!(content.is_well_formed());
    }
}
