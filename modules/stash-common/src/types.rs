use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use uuid::Uuid;

// --- Platforms ---

/// Which extraction family a URL belongs to. Determined from the hostname alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Twitter,
    Instagram,
    Linkedin,
    Tiktok,
    Youtube,
    Reddit,
    Generic,
}

impl PlatformKind {
    pub const ALL: [PlatformKind; 7] = [
        PlatformKind::Twitter,
        PlatformKind::Instagram,
        PlatformKind::Linkedin,
        PlatformKind::Tiktok,
        PlatformKind::Youtube,
        PlatformKind::Reddit,
        PlatformKind::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::Twitter => "twitter",
            PlatformKind::Instagram => "instagram",
            PlatformKind::Linkedin => "linkedin",
            PlatformKind::Tiktok => "tiktok",
            PlatformKind::Youtube => "youtube",
            PlatformKind::Reddit => "reddit",
            PlatformKind::Generic => "generic",
        }
    }

    /// Human-facing name, used in placeholder text and error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            PlatformKind::Twitter => "Twitter",
            PlatformKind::Instagram => "Instagram",
            PlatformKind::Linkedin => "LinkedIn",
            PlatformKind::Tiktok => "TikTok",
            PlatformKind::Youtube => "YouTube",
            PlatformKind::Reddit => "Reddit",
            PlatformKind::Generic => "Web",
        }
    }
}

impl std::fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Extraction ---

/// Which fallback produced `ExtractedContent::image_url`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageProvenance {
    #[default]
    None,
    /// Scraped from a platform embed page (CDN URL).
    EmbedPage,
    /// Platform syndication JSON (photo/video variant arrays).
    Syndication,
    #[serde(rename = "oembed")]
    OEmbed,
    OpenGraph,
    /// Third-party metadata-extraction proxy.
    MetadataProxy,
    /// Platform JSON listing endpoint (direct media URL).
    ListingJson,
    /// Preview/gallery/thumbnail objects inside a listing.
    ListingPreview,
    /// Constructed from a known URL pattern rather than fetched.
    Derived,
}

/// Transient result of running a resolver against one URL.
///
/// Content may be empty only when a media field is populated or the result is
/// an explicit placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub title: String,
    pub content: String,
    /// Source domain, e.g. "twitter.com".
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_html: Option<String>,
    #[serde(default)]
    pub image_provenance: ImageProvenance,
    #[serde(default)]
    pub is_placeholder: bool,
}

impl ExtractedContent {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            source: source.into(),
            author: None,
            image_url: None,
            video_url: None,
            embed_html: None,
            image_provenance: ImageProvenance::None,
            is_placeholder: false,
        }
    }

    /// A labeled stand-in for content the platform would not give us.
    pub fn placeholder(
        title: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            is_placeholder: true,
            ..Self::new(title, content, source)
        }
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author.filter(|a| !a.trim().is_empty());
        self
    }

    pub fn with_image(mut self, url: Option<String>, provenance: ImageProvenance) -> Self {
        match url.filter(|u| !u.trim().is_empty()) {
            Some(url) => {
                self.image_url = Some(url);
                self.image_provenance = provenance;
            }
            None => {
                self.image_url = None;
                self.image_provenance = ImageProvenance::None;
            }
        }
        self
    }

    pub fn with_video(mut self, url: Option<String>) -> Self {
        self.video_url = url.filter(|u| !u.trim().is_empty());
        self
    }

    pub fn with_embed(mut self, html: Option<String>) -> Self {
        self.embed_html = html.filter(|h| !h.trim().is_empty());
        self
    }

    pub fn has_media(&self) -> bool {
        self.image_url.is_some() || self.video_url.is_some() || self.embed_html.is_some()
    }

    pub fn has_text(&self) -> bool {
        !self.content.trim().is_empty()
    }

    /// True when the empty-content invariant holds.
    pub fn is_well_formed(&self) -> bool {
        self.has_text() || self.has_media() || self.is_placeholder
    }
}

// --- Submissions ---

/// Where a submission came from. Email items carry their text with them and
/// never touch the network extractors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubmissionOrigin {
    #[default]
    Web,
    Email {
        body: String,
        sender_domain: String,
        subject: String,
    },
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct Submission {
    #[builder(setter(into))]
    pub url: String,
    #[builder(default, setter(strip_option, into))]
    pub note: Option<String>,
    pub user_id: Uuid,
    #[builder(default)]
    pub origin: SubmissionOrigin,
}

impl Submission {
    pub fn is_email(&self) -> bool {
        matches!(self.origin, SubmissionOrigin::Email { .. })
    }
}

// --- Saved items ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    New,
    Enriched,
    ProcessingFailed,
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::New => write!(f, "new"),
            ItemStatus::Enriched => write!(f, "enriched"),
            ItemStatus::ProcessingFailed => write!(f, "processing_failed"),
        }
    }
}

/// The durable record. Owned by the persistence layer; the pipeline writes it
/// once on creation and once more with either enrichment or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub canonical_url: String,
    pub note: Option<String>,
    pub source: String,
    pub status: ItemStatus,
    pub title: Option<String>,
    /// Newline-joined summary bullets.
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub item_type: Option<String>,
    pub category: Option<String>,
    pub raw_content: Option<String>,
    pub image_url: Option<String>,
    pub domain_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SavedItem {
    /// Build the "new" state record from a stub request.
    pub fn from_new(id: Uuid, new: NewSavedItem) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id: new.user_id,
            url: new.url,
            canonical_url: new.canonical_url,
            note: new.note,
            source: new.source,
            status: ItemStatus::New,
            title: None,
            summary: None,
            tags: Vec::new(),
            item_type: None,
            category: None,
            raw_content: None,
            image_url: None,
            domain_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_enrichment(&mut self, enrichment: Enrichment) {
        self.status = ItemStatus::Enriched;
        self.title = Some(enrichment.title);
        self.summary = Some(enrichment.summary);
        self.tags = enrichment.tags;
        self.item_type = Some(enrichment.item_type);
        self.category = Some(enrichment.category);
        self.raw_content = Some(enrichment.raw_content);
        self.source = enrichment.source;
        self.image_url = enrichment.image_url;
        self.domain_id = enrichment.domain_id;
        self.updated_at = Utc::now();
    }

    pub fn apply_failure(&mut self, failure: FailureRecord) {
        self.status = ItemStatus::ProcessingFailed;
        self.title = Some(failure.title);
        self.summary = Some(failure.summary);
        self.tags = failure.tags;
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, TypedBuilder)]
pub struct NewSavedItem {
    pub user_id: Uuid,
    #[builder(setter(into))]
    pub url: String,
    #[builder(setter(into))]
    pub canonical_url: String,
    #[builder(default)]
    pub note: Option<String>,
    #[builder(setter(into))]
    pub source: String,
}

/// Every enrichment field, written in a single update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub title: String,
    pub summary: String,
    pub tags: Vec<String>,
    pub item_type: String,
    pub category: String,
    pub raw_content: String,
    pub source: String,
    pub image_url: Option<String>,
    pub domain_id: Option<Uuid>,
}

/// The one terminal failure shape, regardless of which stage broke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub title: String,
    pub summary: String,
    pub tags: Vec<String>,
}

impl FailureRecord {
    pub const TAG: &'static str = "processing_failed";
    pub const MESSAGE: &'static str = "Failed to process this URL. The original link is still saved \
and can be opened directly.";

    pub fn for_url(url: &str) -> Self {
        Self {
            title: url.to_string(),
            summary: Self::MESSAGE.to_string(),
            tags: vec![Self::TAG.to_string()],
        }
    }
}

// --- Summarization ---

/// Structured output of the summarizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Summary {
    pub title: String,
    /// Bullet points, most important first.
    pub summary: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Content type, e.g. "article", "video", "thread".
    #[serde(rename = "type")]
    pub item_type: String,
    pub category: String,
}

impl Summary {
    pub const FAILURE_TAG: &'static str = "summarization_failed";

    /// The tagged payload a summarizer returns instead of erroring.
    pub fn failure(title: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: vec![reason.into()],
            tags: vec![Self::FAILURE_TAG.to_string()],
            item_type: "unknown".to_string(),
            category: "uncategorized".to_string(),
        }
    }

    pub fn joined(&self) -> String {
        self.summary.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_kind_serializes_lowercase() {
        let json = serde_json::to_string(&PlatformKind::Tiktok).unwrap();
        assert_eq!(json, "\"tiktok\"");
        for kind in PlatformKind::ALL {
            assert_eq!(kind.to_string(), kind.as_str());
        }
    }

    #[test]
    fn media_only_content_is_well_formed() {
        let content = ExtractedContent::new("Photo", "", "instagram.com").with_image(
            Some("https://cdn.example.com/a.jpg".into()),
            ImageProvenance::EmbedPage,
        );
        assert!(content.is_well_formed());
        assert!(!content.has_text());
    }

    #[test]
    fn empty_content_without_media_is_not_well_formed() {
        let content = ExtractedContent::new("Nothing", "   ", "example.com");
        assert!(!content.is_well_formed());
        let placeholder = ExtractedContent::placeholder("Nothing", "", "example.com");
        assert!(placeholder.is_well_formed());
    }

    #[test]
    fn blank_image_clears_provenance() {
        let content = ExtractedContent::new("t", "c", "s")
            .with_image(Some("  ".into()), ImageProvenance::OpenGraph);
        assert_eq!(content.image_url, None);
        assert_eq!(content.image_provenance, ImageProvenance::None);
    }

    #[test]
    fn oembed_provenance_uses_single_word() {
        let json = serde_json::to_string(&ImageProvenance::OEmbed).unwrap();
        assert_eq!(json, "\"oembed\"");
    }

    #[test]
    fn summary_type_field_is_renamed() {
        let json = r#"{"title":"T","summary":["a","b"],"tags":["x"],"type":"article","category":"tech"}"#;
        let summary: Summary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.item_type, "article");
        assert_eq!(summary.joined(), "a\nb");
    }

    #[test]
    fn failure_record_points_at_url() {
        let failure = FailureRecord::for_url("https://example.com/x");
        assert_eq!(failure.title, "https://example.com/x");
        assert_eq!(failure.tags, vec!["processing_failed"]);
    }

    #[test]
    fn applying_failure_keeps_url() {
        let new = NewSavedItem::builder()
            .user_id(Uuid::new_v4())
            .url("https://example.com/x")
            .canonical_url("https://example.com/x")
            .source("example.com")
            .build();
        let mut item = SavedItem::from_new(Uuid::new_v4(), new);
        item.apply_failure(FailureRecord::for_url("https://example.com/x"));
        assert_eq!(item.status, ItemStatus::ProcessingFailed);
        assert_eq!(item.url, "https://example.com/x");
        assert_eq!(item.title.as_deref(), Some("https://example.com/x"));
    }
}
