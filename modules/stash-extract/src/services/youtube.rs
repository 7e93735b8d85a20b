// YouTube resolver. Best-effort throughout: oEmbed gives title and author,
// timedtext gives the transcript. Never fails.

use std::sync::LazyLock;

use regex::Regex;
use stash_common::{ExtractedContent, ImageProvenance, PlatformKind};
use tracing::info;

use crate::canonical::{canonicalize, youtube_id};
use crate::error::Result;
use crate::fallback::{AttemptResult, FallbackChain};
use crate::services::upstream::{encode, Upstream};
use crate::text_extract::{decode_entities, normalize_whitespace};

const PLATFORM: PlatformKind = PlatformKind::Youtube;
const OEMBED_ENDPOINT: &str = "https://www.youtube.com/oembed";
const TIMEDTEXT_ENDPOINT: &str = "https://www.youtube.com/api/timedtext";

static CUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<text\b[^>]*>(.*?)</text>").expect("valid regex"));

pub(crate) struct YoutubeService {
    upstream: Upstream,
}

impl YoutubeService {
    pub(crate) fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    pub(crate) async fn resolve(&self, url: &str) -> Result<ExtractedContent> {
        let canonical = canonicalize(url);
        let video_id = youtube_id(&canonical);
        info!(url = canonical.as_str(), video_id = ?video_id, "youtube: resolving video");

        let oembed_url = format!("{OEMBED_ENDPOINT}?url={}&format=json", encode(&canonical));
        let oembed = FallbackChain::new(PLATFORM, "metadata")
            .attempt(
                "oembed",
                self.upstream.standard(),
                self.upstream.oembed(&oembed_url, self.upstream.standard()),
            )
            .run()
            .await
            .unwrap_or_default();

        let transcript = match &video_id {
            Some(id) => FallbackChain::new(PLATFORM, "transcript")
                .attempt("timedtext", self.upstream.standard(), self.transcript(id))
                .run()
                .await,
            None => None,
        };

        let title = oembed
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "YouTube video".to_string());
        let author = oembed.author_name.clone().filter(|a| !a.trim().is_empty());
        let content = transcript.unwrap_or_else(|| missing_transcript(&title, author.as_deref()));

        let (image, provenance) = match (oembed.thumbnail_url.clone(), &video_id) {
            (Some(thumb), _) => (Some(thumb), ImageProvenance::OEmbed),
            (None, Some(id)) => (Some(derived_thumbnail(id)), ImageProvenance::Derived),
            (None, None) => (None, ImageProvenance::None),
        };
        let embed = oembed
            .html
            .clone()
            .or_else(|| video_id.as_deref().map(embed_iframe));

        Ok(ExtractedContent::new(title, content, "youtube.com")
            .with_author(author)
            .with_image(image, provenance)
            .with_embed(embed))
    }

    async fn transcript(&self, video_id: &str) -> AttemptResult<String> {
        let endpoint = format!("{TIMEDTEXT_ENDPOINT}?lang=en&v={video_id}");
        let xml = self.upstream.text(&endpoint, self.upstream.standard()).await?;
        Ok(parse_transcript(&xml))
    }
}

/// Join the cues of a timedtext XML document. Cue text is entity-encoded
/// twice (`&amp;#39;`), so it is decoded twice. Videos without captions
/// answer with an empty body.
fn parse_transcript(xml: &str) -> Option<String> {
    let cues: Vec<String> = CUE_RE
        .captures_iter(xml)
        .map(|c| decode_entities(&decode_entities(&c[1])))
        .map(|cue| cue.replace('\n', " ").trim().to_string())
        .filter(|cue| !cue.is_empty())
        .collect();
    let text = normalize_whitespace(&cues.join(" "));
    (!text.is_empty()).then_some(text)
}

fn missing_transcript(title: &str, author: Option<&str>) -> String {
    match author {
        Some(author) => format!("{title} by {author} \u{2014} transcript unavailable"),
        None => format!("{title} \u{2014} transcript unavailable"),
    }
}

fn derived_thumbnail(video_id: &str) -> String {
    format!("https://i.ytimg.com/vi/{video_id}/hqdefault.jpg")
}

fn embed_iframe(video_id: &str) -> String {
    format!(
        r#"<iframe width="560" height="315" src="https://www.youtube.com/embed/{video_id}" frameborder="0" allowfullscreen></iframe>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_joins_and_decodes_cues() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript>
            <text start="0.1" dur="2.0">Hello &amp;amp; welcome</text>
            <text start="2.1" dur="1.5">it&amp;#39;s
            a test</text>
            <text start="4" dur="1"></text>
        </transcript>"#;
        assert_eq!(
            parse_transcript(xml).as_deref(),
            Some("Hello & welcome it's a test")
        );
    }

    #[test]
    fn empty_transcript_is_none() {
        assert_eq!(parse_transcript(""), None);
        assert_eq!(parse_transcript("<transcript></transcript>"), None);
    }

    #[test]
    fn synthesized_body_names_title_and_author() {
        assert_eq!(
            missing_transcript("Rust in 100 Seconds", Some("Fireship")),
            "Rust in 100 Seconds by Fireship \u{2014} transcript unavailable"
        );
        assert_eq!(
            missing_transcript("Clip", None),
            "Clip \u{2014} transcript unavailable"
        );
    }

    #[test]
    fn derived_media_uses_video_id() {
        assert_eq!(
            derived_thumbnail("dQw4w9WgXcQ"),
            "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg"
        );
        assert!(embed_iframe("dQw4w9WgXcQ").contains("/embed/dQw4w9WgXcQ"));
    }
}
