// Twitter/X resolver. Text and author come from the public embed endpoint;
// media has its own chain, ending at the embed's thumbnail.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use stash_common::{ExtractedContent, ImageProvenance, PlatformKind};
use tracing::info;

use crate::canonical::{canonicalize, tweet_id, url_handle};
use crate::error::{ExtractError, Result};
use crate::fallback::{AttemptResult, FallbackChain};
use crate::services::upstream::{encode, OEmbed, Upstream};
use crate::text_extract::{first_line, strip_html};

const PLATFORM: PlatformKind = PlatformKind::Twitter;
const EMBED_ENDPOINT: &str = "https://publish.twitter.com/oembed";
const SYNDICATION_ENDPOINT: &str = "https://cdn.syndication.twimg.com/tweet-result";

static TWEET_BODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p[^>]*>(.*?)</p>").expect("valid regex"));

/// Image and video for a tweet, plus which source produced them.
#[derive(Debug, Clone, Default, PartialEq)]
struct TweetMedia {
    image: Option<String>,
    video: Option<String>,
    provenance: ImageProvenance,
}

pub(crate) struct TwitterService {
    upstream: Upstream,
}

impl TwitterService {
    pub(crate) fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    pub(crate) async fn resolve(&self, url: &str) -> Result<ExtractedContent> {
        let canonical = canonicalize(url);
        info!(url = canonical.as_str(), "twitter: resolving tweet");

        let embed_url = format!(
            "{EMBED_ENDPOINT}?url={}&omit_script=true&dnt=true",
            encode(&canonical)
        );
        let embed = FallbackChain::new(PLATFORM, "text")
            .attempt(
                "embed_endpoint",
                self.upstream.standard(),
                self.upstream.oembed(&embed_url, self.upstream.standard()),
            )
            .run()
            .await
            .ok_or_else(|| unavailable("the embed endpoint returned nothing"))?;

        let text = embed.html.as_deref().map(tweet_text).unwrap_or_default();
        if text.is_empty() {
            return Err(unavailable("the embed markup carried no text"));
        }

        let author = embed
            .author_name
            .clone()
            .filter(|a| !a.trim().is_empty())
            .or_else(|| url_handle(&canonical, PLATFORM));
        let media = self.media(&canonical, &embed).await;

        let title = match (&author, first_line(&text, 80)) {
            (Some(author), Some(line)) => format!("{author} on Twitter: \"{line}\""),
            (None, Some(line)) => line,
            (_, None) => "Tweet".to_string(),
        };

        Ok(ExtractedContent::new(title, text, "twitter.com")
            .with_author(author)
            .with_image(media.image, media.provenance)
            .with_video(media.video)
            .with_embed(embed.html))
    }

    /// Media never fails the tweet; an empty `TweetMedia` is a valid answer.
    async fn media(&self, canonical: &str, embed: &OEmbed) -> TweetMedia {
        let thumbnail = embed.thumbnail_url.clone();

        FallbackChain::new(PLATFORM, "media")
            .attempt(
                "syndication",
                self.upstream.standard(),
                self.syndication(canonical),
            )
            .attempt(
                "metadata_proxy",
                self.upstream.standard(),
                self.proxy_media(canonical),
            )
            .attempt("embed_thumbnail", self.upstream.short(), async move {
                Ok(thumbnail.map(|image| TweetMedia {
                    image: Some(image),
                    video: None,
                    provenance: ImageProvenance::OEmbed,
                }))
            })
            .run()
            .await
            .unwrap_or_default()
    }

    async fn syndication(&self, canonical: &str) -> AttemptResult<TweetMedia> {
        let Some(id) = tweet_id(canonical) else {
            return Ok(None);
        };
        let token = syndication_token(&id).unwrap_or_else(|| "0".to_string());
        let endpoint = format!("{SYNDICATION_ENDPOINT}?id={id}&lang=en&token={token}");
        let payload: SyndicationTweet = self.upstream.json(&endpoint, self.upstream.standard()).await?;
        Ok(payload.media())
    }

    async fn proxy_media(&self, canonical: &str) -> AttemptResult<TweetMedia> {
        let Some(data) = self.upstream.metadata_proxy(canonical).await? else {
            return Ok(None);
        };
        let media = TweetMedia {
            image: data.image_url(),
            video: data.video_url(),
            provenance: ImageProvenance::MetadataProxy,
        };
        Ok((media.image.is_some() || media.video.is_some()).then_some(media))
    }
}

fn unavailable(detail: &str) -> ExtractError {
    ExtractError::exhausted(
        PLATFORM,
        format!("tweet text unavailable ({detail}); the tweet may be deleted or protected"),
    )
}

/// Tweet body from embed markup: the `<p>` inside the blockquote, with line
/// breaks kept. Falls back to the whole blockquote minus its byline.
fn tweet_text(html: &str) -> String {
    if let Some(body) = TWEET_BODY_RE.captures(html) {
        return strip_html(&body[1]);
    }
    let stripped = strip_html(html);
    match stripped.rfind('\u{2014}') {
        Some(byline) => stripped[..byline].trim().to_string(),
        None => stripped,
    }
}

/// The syndication endpoint wants a token derived from the tweet id:
/// base-36 of `id / 1e15 * PI` with zeros and the point removed.
fn syndication_token(id: &str) -> Option<String> {
    let id: f64 = id.parse().ok()?;
    let token = to_base36((id / 1e15) * std::f64::consts::PI).replace(['0', '.'], "");
    (!token.is_empty()).then_some(token)
}

fn to_base36(value: f64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    let mut int = value.trunc() as u64;
    let mut frac = value.fract();
    let mut out = Vec::new();
    loop {
        out.push(DIGITS[(int % 36) as usize]);
        int /= 36;
        if int == 0 {
            break;
        }
    }
    out.reverse();

    if frac > 0.0 {
        out.push(b'.');
        for _ in 0..11 {
            frac *= 36.0;
            let digit = frac.trunc() as usize;
            out.push(DIGITS[digit.min(35)]);
            frac -= digit as f64;
            if frac <= 0.0 {
                break;
            }
        }
    }
    out.into_iter().map(char::from).collect()
}

// --- syndication payload ---

#[derive(Debug, Default, Deserialize)]
struct SyndicationTweet {
    #[serde(default)]
    photos: Vec<SyndicationPhoto>,
    #[serde(default, rename = "mediaDetails")]
    media_details: Vec<SyndicationMedia>,
}

#[derive(Debug, Deserialize)]
struct SyndicationPhoto {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SyndicationMedia {
    media_url_https: Option<String>,
    video_info: Option<VideoInfo>,
}

#[derive(Debug, Deserialize)]
struct VideoInfo {
    #[serde(default)]
    variants: Vec<VideoVariant>,
}

#[derive(Debug, Deserialize)]
struct VideoVariant {
    bitrate: Option<u64>,
    content_type: Option<String>,
    url: Option<String>,
}

impl SyndicationTweet {
    fn media(&self) -> Option<TweetMedia> {
        let video = self
            .media_details
            .iter()
            .filter_map(|m| m.video_info.as_ref())
            .flat_map(|info| info.variants.iter())
            .filter(|v| v.content_type.as_deref() == Some("video/mp4"))
            .filter_map(|v| v.url.as_ref().map(|url| (v.bitrate.unwrap_or(0), url)))
            .max_by_key(|(bitrate, _)| *bitrate)
            .map(|(_, url)| url.clone());

        let image = self
            .photos
            .iter()
            .find_map(|p| p.url.clone())
            .or_else(|| self.media_details.iter().find_map(|m| m.media_url_https.clone()));

        if image.is_none() && video.is_none() {
            return None;
        }
        Some(TweetMedia {
            image,
            video,
            provenance: ImageProvenance::Syndication,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tweet_text_keeps_line_breaks() {
        let html = r#"<blockquote class="twitter-tweet"><p lang="en" dir="ltr">First line<br>second &amp; last <a href="https://t.co/x">pic.twitter.com/x</a></p>&mdash; Acme (@acme) <a href="https://twitter.com/acme/status/1">May 1, 2024</a></blockquote>"#;
        assert_eq!(tweet_text(html), "First line\nsecond & last pic.twitter.com/x");
    }

    #[test]
    fn tweet_text_without_paragraph_drops_byline() {
        let html = "<blockquote>Just text &mdash; Acme (@acme) May 1</blockquote>";
        assert_eq!(tweet_text(html), "Just text");
    }

    #[test]
    fn highest_bitrate_mp4_wins() {
        let payload: SyndicationTweet = serde_json::from_str(
            r#"{"mediaDetails":[{"media_url_https":"https://pbs.twimg.com/thumb.jpg","video_info":{"variants":[
                {"content_type":"application/x-mpegURL","url":"https://video.twimg.com/pl.m3u8"},
                {"bitrate":256000,"content_type":"video/mp4","url":"https://video.twimg.com/low.mp4"},
                {"bitrate":2176000,"content_type":"video/mp4","url":"https://video.twimg.com/high.mp4"}
            ]}}]}"#,
        )
        .unwrap();
        let media = payload.media().unwrap();
        assert_eq!(media.video.as_deref(), Some("https://video.twimg.com/high.mp4"));
        assert_eq!(media.image.as_deref(), Some("https://pbs.twimg.com/thumb.jpg"));
        assert_eq!(media.provenance, ImageProvenance::Syndication);
    }

    #[test]
    fn photos_take_priority_over_media_thumbnails() {
        let payload: SyndicationTweet = serde_json::from_str(
            r#"{"photos":[{"url":"https://pbs.twimg.com/media/a.jpg"}],"mediaDetails":[{"media_url_https":"https://pbs.twimg.com/b.jpg"}]}"#,
        )
        .unwrap();
        assert_eq!(
            payload.media().unwrap().image.as_deref(),
            Some("https://pbs.twimg.com/media/a.jpg")
        );
    }

    #[test]
    fn empty_syndication_has_no_media() {
        let payload: SyndicationTweet = serde_json::from_str("{}").unwrap();
        assert!(payload.media().is_none());
    }

    #[test]
    fn token_has_no_zeros_or_points() {
        let token = syndication_token("1790000000000000000").unwrap();
        assert!(!token.is_empty());
        assert!(!token.contains('0') && !token.contains('.'));
        assert_eq!(syndication_token("abc"), None);
    }

    #[test]
    fn base36_of_integers() {
        assert_eq!(to_base36(35.0), "z");
        assert_eq!(to_base36(36.0), "10");
        assert_eq!(to_base36(0.5), "0.i");
    }
}
