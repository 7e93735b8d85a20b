// Reddit resolver. The `.json` listing is tried against each mirror host with
// a short timeout; when every mirror fails, the legacy HTML page is scraped.
// A post with no answer from any of them is a failure.

use std::collections::BTreeMap;

use serde::Deserialize;
use stash_common::{ExtractedContent, ImageProvenance, PlatformKind};
use tracing::{debug, info};
use url::Url;

use crate::canonical::canonicalize;
use crate::error::{ExtractError, Result};
use crate::fallback::{AttemptResult, FallbackChain};
use crate::meta::extract_meta;
use crate::router::parse_lenient;
use crate::services::upstream::Upstream;
use crate::text_extract::decode_entities;

const PLATFORM: PlatformKind = PlatformKind::Reddit;
const LEGACY_HOST: &str = "old.reddit.com";
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];

/// Titles of Reddit pages that carry no post (front page, interstitials).
const GENERIC_TITLES: &[&str] = &[
    "reddit",
    "reddit.com",
    "reddit - dive into anything",
    "reddit - the heart of the internet",
    "reddit: the front page of the internet",
    "blocked",
    "too many requests",
];

pub(crate) struct RedditService {
    upstream: Upstream,
}

impl RedditService {
    pub(crate) fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    pub(crate) async fn resolve(&self, url: &str) -> Result<ExtractedContent> {
        let canonical = canonicalize(url);
        let path = post_path(&canonical)
            .ok_or_else(|| ExtractError::InvalidUrl(url.to_string()))?;
        info!(url = canonical.as_str(), path = path.as_str(), "reddit: resolving post");

        let mut listing = FallbackChain::new(PLATFORM, "listing");
        for mirror in &self.upstream.config.reddit_mirrors {
            listing = listing.attempt(
                "listing_json",
                self.upstream.short(),
                self.listing(mirror, &path),
            );
        }
        if let Some(post) = listing.run().await {
            return Ok(post.into_content());
        }

        FallbackChain::new(PLATFORM, "legacy_page")
            .attempt("legacy_html", self.upstream.page(), self.legacy_page(&path))
            .run()
            .await
            .ok_or_else(|| {
                ExtractError::exhausted(
                    PLATFORM,
                    "every mirror and the legacy page failed; the post may be removed, private, or rate limited",
                )
            })
    }

    async fn listing(&self, mirror: &str, path: &str) -> AttemptResult<RedditPost> {
        let endpoint = format!("https://{mirror}{}.json", path.trim_end_matches('/'));
        debug!(endpoint = endpoint.as_str(), "reddit: fetching listing");
        let response: ListingResponse = self.upstream.json(&endpoint, self.upstream.short()).await?;
        Ok(response.first_post())
    }

    async fn legacy_page(&self, path: &str) -> AttemptResult<ExtractedContent> {
        let page_url = format!("https://{LEGACY_HOST}{path}");
        let html = self.upstream.text(&page_url, self.upstream.page()).await?;
        Ok(parse_legacy_page(&html))
    }
}

/// Post path on reddit.com. `redd.it/<id>` short links become `/comments/<id>`.
fn post_path(canonical: &str) -> Option<String> {
    let parsed = parse_lenient(canonical)?;
    let host = parsed.host_str()?.to_lowercase();
    let path = parsed.path();
    if host.ends_with("redd.it") && !host.starts_with("i.") && !host.starts_with("v.") {
        let id = path.trim_matches('/');
        return (!id.is_empty() && !id.contains('/')).then(|| format!("/comments/{id}/"));
    }
    (path.len() > 1).then(|| path.to_string())
}

fn parse_legacy_page(html: &str) -> Option<ExtractedContent> {
    let meta = extract_meta(html);
    let title = meta.best_title()?.trim().to_string();
    if title.is_empty() || GENERIC_TITLES.contains(&title.to_lowercase().as_str()) {
        return None;
    }
    let lower = title.to_lowercase();
    if lower.contains("log in") || lower.contains("whoa there") {
        return None;
    }
    let description = meta.description.clone().unwrap_or_default();
    if description.is_empty() && meta.image.is_none() {
        return None;
    }
    Some(
        ExtractedContent::new(title, description, "reddit.com")
            .with_image(meta.image.clone(), ImageProvenance::OpenGraph),
    )
}

fn is_image_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// `imgur.com/<id>` page links point at a single image we can address directly.
fn imgur_direct(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    if host != "imgur.com" && host != "www.imgur.com" && host != "m.imgur.com" {
        return None;
    }
    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());
    let id = segments.next()?;
    if segments.next().is_some() || matches!(id, "a" | "gallery" | "t" | "user") {
        return None;
    }
    let id = id.split('.').next().unwrap_or(id);
    Some(format!("https://i.imgur.com/{id}.jpg"))
}

fn is_reddit_host(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .is_some_and(|h| h.contains("reddit.com") || h.contains("redd.it"))
}

// --- listing payload ---

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListingResponse {
    /// Post pages answer with [post listing, comments listing].
    Thread(Vec<Listing>),
    Single(Listing),
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    kind: Option<String>,
    data: RedditPost,
}

impl ListingResponse {
    fn first_post(self) -> Option<RedditPost> {
        let listings = match self {
            ListingResponse::Thread(listings) => listings,
            ListingResponse::Single(listing) => vec![listing],
        };
        listings
            .into_iter()
            .flat_map(|l| l.data.children)
            .find(|c| c.kind.as_deref() == Some("t3"))
            .map(|c| c.data)
            .filter(|p| p.title.as_deref().is_some_and(|t| !t.trim().is_empty()))
    }
}

#[derive(Debug, Default, Deserialize)]
struct RedditPost {
    title: Option<String>,
    author: Option<String>,
    subreddit: Option<String>,
    selftext: Option<String>,
    url: Option<String>,
    thumbnail: Option<String>,
    preview: Option<Preview>,
    media_metadata: Option<BTreeMap<String, MediaMetadata>>,
    gallery_data: Option<GalleryData>,
    media: Option<Media>,
    secure_media: Option<Media>,
}

#[derive(Debug, Deserialize)]
struct Preview {
    #[serde(default)]
    images: Vec<PreviewImage>,
}

#[derive(Debug, Deserialize)]
struct PreviewImage {
    source: Option<ImageSource>,
}

#[derive(Debug, Deserialize)]
struct ImageSource {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaMetadata {
    s: Option<MediaSource>,
}

#[derive(Debug, Deserialize)]
struct MediaSource {
    u: Option<String>,
    gif: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GalleryData {
    #[serde(default)]
    items: Vec<GalleryItem>,
}

#[derive(Debug, Deserialize)]
struct GalleryItem {
    media_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Media {
    reddit_video: Option<RedditVideo>,
}

#[derive(Debug, Deserialize)]
struct RedditVideo {
    fallback_url: Option<String>,
}

impl RedditPost {
    /// Image priority: direct image link, known image-host rewrite, preview
    /// source, first gallery item, thumbnail, then the raw outbound link.
    fn image(&self) -> Option<(String, ImageProvenance)> {
        let link = self.url.as_deref().filter(|u| is_http(u));

        if let Some(link) = link.filter(|u| is_image_url(u)) {
            return Some((decode_entities(link), ImageProvenance::ListingJson));
        }
        if let Some(direct) = link.and_then(imgur_direct) {
            return Some((direct, ImageProvenance::Derived));
        }
        if let Some(preview) = self
            .preview
            .as_ref()
            .and_then(|p| p.images.first())
            .and_then(|i| i.source.as_ref())
            .and_then(|s| s.url.as_deref())
        {
            return Some((decode_entities(preview), ImageProvenance::ListingPreview));
        }
        if let Some(gallery) = self.first_gallery_image() {
            return Some((decode_entities(&gallery), ImageProvenance::ListingJson));
        }
        if let Some(thumb) = self.thumbnail.as_deref().filter(|t| is_http(t)) {
            return Some((decode_entities(thumb), ImageProvenance::ListingJson));
        }
        link.filter(|u| !is_reddit_host(u))
            .map(|u| (decode_entities(u), ImageProvenance::ListingJson))
    }

    /// Gallery order when the listing gives one, otherwise the first entry.
    fn first_gallery_image(&self) -> Option<String> {
        let metadata = self.media_metadata.as_ref()?;
        let ordered = self
            .gallery_data
            .as_ref()
            .and_then(|g| g.items.iter().find_map(|i| i.media_id.as_ref()))
            .and_then(|id| metadata.get(id));
        ordered
            .into_iter()
            .chain(metadata.values())
            .filter_map(|m| m.s.as_ref())
            .find_map(|s| s.u.clone().or_else(|| s.gif.clone()))
    }

    fn video(&self) -> Option<String> {
        self.media
            .as_ref()
            .or(self.secure_media.as_ref())
            .and_then(|m| m.reddit_video.as_ref())
            .and_then(|v| v.fallback_url.clone())
    }

    fn into_content(self) -> ExtractedContent {
        let (image, provenance) = match self.image() {
            Some((url, provenance)) => (Some(url), provenance),
            None => (None, ImageProvenance::None),
        };
        let video = self.video();
        let author = self
            .author
            .filter(|a| !a.is_empty() && a != "[deleted]")
            .map(|a| format!("u/{a}"));
        let title = self.title.map(|t| decode_entities(&t)).unwrap_or_default();
        let body = self
            .selftext
            .map(|s| decode_entities(s.trim()))
            .filter(|s| !s.is_empty());
        let content = match (body, &self.subreddit) {
            (Some(body), _) => body,
            _ if image.is_some() || video.is_some() => String::new(),
            (None, Some(sub)) => format!("{title} (posted in r/{sub})"),
            (None, None) => title.clone(),
        };

        ExtractedContent::new(title, content, "reddit.com")
            .with_author(author)
            .with_image(image, provenance)
            .with_video(video)
    }
}
