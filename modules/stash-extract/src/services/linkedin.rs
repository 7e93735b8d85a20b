// LinkedIn resolver. Public posts are mostly behind a login wall, so every
// source is checked for wall markers before it counts. Never authenticates.

use std::sync::LazyLock;

use regex::Regex;
use stash_common::{ExtractedContent, ImageProvenance, PlatformKind};
use tracing::{info, warn};

use crate::canonical::{canonicalize, url_handle};
use crate::error::Result;
use crate::fallback::{AttemptResult, FallbackChain};
use crate::services::upstream::Upstream;

const PLATFORM: PlatformKind = PlatformKind::Linkedin;

const WALL_PHRASES: &[&str] = &["sign in", "sign up", "join now", "log in to linkedin"];

static MEMBER_COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d[\d,.]*\s*(?:million|billion|thousand|[kmb])?\+?\s+members\b").expect("valid regex")
});
// "Jane Doe on LinkedIn: caption" / "Jane Doe posted on LinkedIn"
static AUTHOR_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(.+?)\s+(?:posted\s+)?on LinkedIn(?::\s*(.*))?$").expect("valid regex")
});

#[derive(Debug, Clone, PartialEq)]
struct LinkedinPost {
    title: Option<String>,
    description: Option<String>,
    author: Option<String>,
    image: Option<String>,
    provenance: ImageProvenance,
}

pub(crate) struct LinkedinService {
    upstream: Upstream,
}

impl LinkedinService {
    pub(crate) fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    pub(crate) async fn resolve(&self, url: &str) -> Result<ExtractedContent> {
        let canonical = canonicalize(url);
        info!(url = canonical.as_str(), "linkedin: resolving post");

        let post = FallbackChain::new(PLATFORM, "post")
            .attempt("metadata_proxy", self.upstream.standard(), self.metadata_proxy(&canonical))
            .attempt("open_graph", self.upstream.page(), self.open_graph(&canonical))
            .run()
            .await;

        let url_author = url_handle(&canonical, PLATFORM);
        let Some(post) = post else {
            warn!(url = canonical.as_str(), "linkedin: login wall on every source, saving placeholder");
            return Ok(placeholder(url_author));
        };

        let (title_author, title_caption) = post
            .title
            .as_deref()
            .and_then(split_author_title)
            .unwrap_or((None, None));
        let author = post.author.clone().or(title_author).or(url_author);
        let title = post
            .title
            .clone()
            .unwrap_or_else(|| "LinkedIn post".to_string());
        // Articles often expose only a headline; it is still the post's text.
        let content = post
            .description
            .clone()
            .filter(|d| !d.trim().is_empty())
            .or(title_caption)
            .unwrap_or_else(|| title.clone());

        Ok(ExtractedContent::new(title, content, "linkedin.com")
            .with_author(author)
            .with_image(post.image, post.provenance))
    }

    async fn metadata_proxy(&self, canonical: &str) -> AttemptResult<LinkedinPost> {
        let Some(data) = self.upstream.metadata_proxy(canonical).await? else {
            return Ok(None);
        };
        let image = data.image_url();
        Ok(checked(LinkedinPost {
            title: data.title,
            description: data.description,
            author: data.author,
            image,
            provenance: ImageProvenance::MetadataProxy,
        }))
    }

    async fn open_graph(&self, canonical: &str) -> AttemptResult<LinkedinPost> {
        let Some(meta) = self.upstream.open_graph(canonical).await? else {
            return Ok(None);
        };
        Ok(checked(LinkedinPost {
            title: meta.title.or(meta.html_title),
            description: meta.description,
            author: meta.author,
            image: meta.image,
            provenance: ImageProvenance::OpenGraph,
        }))
    }
}

/// A source that answered with the login wall counts as a failure.
fn checked(post: LinkedinPost) -> Option<LinkedinPost> {
    if is_login_wall(post.title.as_deref(), post.description.as_deref()) {
        warn!(title = ?post.title, "linkedin: login wall detected");
        return None;
    }
    (post.title.is_some() || post.description.is_some()).then_some(post)
}

pub(crate) fn is_login_wall(title: Option<&str>, description: Option<&str>) -> bool {
    if title.is_some_and(|t| t.trim().eq_ignore_ascii_case("linkedin")) {
        return true;
    }
    [title, description].into_iter().flatten().any(|text| {
        let lower = text.to_lowercase();
        WALL_PHRASES.iter().any(|p| lower.contains(p)) || MEMBER_COUNT_RE.is_match(text)
    })
}

fn split_author_title(title: &str) -> Option<(Option<String>, Option<String>)> {
    let caps = AUTHOR_TITLE_RE.captures(title)?;
    let author = caps.get(1).map(|m| m.as_str().trim().to_string());
    let caption = caps
        .get(2)
        .map(|m| m.as_str().trim().to_string())
        .filter(|c| !c.is_empty());
    Some((author, caption))
}

fn placeholder(author: Option<String>) -> ExtractedContent {
    let title = match &author {
        Some(author) => format!("LinkedIn post by {author}"),
        None => "LinkedIn post".to_string(),
    };
    ExtractedContent::placeholder(
        title,
        "LinkedIn keeps this post behind a sign-in page. Open the original link to read it.",
        "linkedin.com",
    )
    .with_author(author)
}
