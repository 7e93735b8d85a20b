// Content validation: reject extraction or summarization results that are
// empty or carry a failure signature. Pure; the first failing rule wins.

use stash_common::{ExtractedContent, FailureRecord, Summary};

/// Minimum characters of content for an item to count as extracted.
pub const MIN_CONTENT_CHARS: usize = 20;

/// Phrases upstream tools and summarizers use when they produced nothing.
pub const FAILURE_PHRASES: &[&str] = &[
    "could not be extracted",
    "failed to extract",
    "unable to extract",
    "error extracting",
    "content could not be retrieved",
    "no content could be found",
];

/// Summarizer tags that mark the whole result as a failure.
pub const FAILURE_TAGS: &[&str] = &[
    FailureRecord::TAG,
    "extraction_failed",
    Summary::FAILURE_TAG,
    "error",
];

const UNKNOWN_AUTHOR: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    EmptyContent,
    FailurePhrase,
    UnknownAuthor,
    TooShort,
    FailureTag,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub is_valid: bool,
    pub error: Option<String>,
    pub reason: Option<ValidationReason>,
}

impl Validation {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            error: None,
            reason: None,
        }
    }

    fn invalid(reason: ValidationReason, error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(error.into()),
            reason: Some(reason),
        }
    }
}

pub fn validate(content: &ExtractedContent, summary: &Summary) -> Validation {
    let text = validated_text(content, summary);
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Validation::invalid(ValidationReason::EmptyContent, "No content was extracted");
    }

    let lower = trimmed.to_lowercase();
    if let Some(phrase) = FAILURE_PHRASES.iter().find(|p| lower.contains(*p)) {
        return Validation::invalid(
            ValidationReason::FailurePhrase,
            format!("Content reports an extraction failure (\"{phrase}\")"),
        );
    }

    if content.author.as_deref() == Some(UNKNOWN_AUTHOR) {
        return Validation::invalid(ValidationReason::UnknownAuthor, "Author could not be determined");
    }

    let chars = trimmed.chars().count();
    if chars < MIN_CONTENT_CHARS {
        return Validation::invalid(
            ValidationReason::TooShort,
            format!("Content too short ({chars} < {MIN_CONTENT_CHARS} characters)"),
        );
    }

    if let Some(tag) = summary
        .tags
        .iter()
        .find(|t| FAILURE_TAGS.iter().any(|f| t.trim().eq_ignore_ascii_case(f)))
    {
        return Validation::invalid(
            ValidationReason::FailureTag,
            format!("Summarizer tagged the result as failed ({tag})"),
        );
    }

    Validation::valid()
}

/// The extracted text, unless the item is media-only or a placeholder, in
/// which case the summary is what the user will actually read.
fn validated_text(content: &ExtractedContent, summary: &Summary) -> String {
    if content.has_text() {
        content.content.clone()
    } else if content.has_media() || content.is_placeholder {
        summary.joined()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use stash_common::ImageProvenance;

    use super::*;

    fn summary(tags: &[&str]) -> Summary {
        Summary {
            title: "Title".to_string(),
            summary: vec!["A perfectly reasonable summary line.".to_string()],
            tags: tags.iter().map(|t| t.to_string()).collect(),
            item_type: "article".to_string(),
            category: "technology".to_string(),
        }
    }

    fn text(body: &str) -> ExtractedContent {
        ExtractedContent::new("Title", body, "example.com")
    }

    #[test]
    fn nineteen_chars_is_too_short_twenty_is_enough() {
        let nineteen = "a".repeat(19);
        let twenty = "a".repeat(20);

        let result = validate(&text(&nineteen), &summary(&[]));
        assert!(!result.is_valid);
        assert_eq!(result.reason, Some(ValidationReason::TooShort));

        assert!(validate(&text(&twenty), &summary(&[])).is_valid);
    }

    #[test]
    fn unknown_author_is_always_invalid() {
        let content = text("Plenty of perfectly good article content here.")
            .with_author(Some("Unknown".to_string()));
        let result = validate(&content, &summary(&["rust"]));
        assert_eq!(result.reason, Some(ValidationReason::UnknownAuthor));

        let content = text("Plenty of perfectly good article content here.")
            .with_author(Some("unknown person".to_string()));
        assert!(validate(&content, &summary(&[])).is_valid);
    }

    #[test]
    fn empty_content_comes_first() {
        let content = text("   ").with_author(Some("Unknown".to_string()));
        let result = validate(&content, &summary(&["processing_failed"]));
        assert_eq!(result.reason, Some(ValidationReason::EmptyContent));
        assert!(result.error.is_some());
    }

    #[test]
    fn failure_phrases_are_case_insensitive() {
        let content = text("Sorry, the content COULD NOT BE EXTRACTED from this page.");
        let result = validate(&content, &summary(&[]));
        assert_eq!(result.reason, Some(ValidationReason::FailurePhrase));
    }

    #[test]
    fn failure_tags_reject_the_summary() {
        let content = text("Plenty of perfectly good article content here.");
        let result = validate(&content, &summary(&["news", "Summarization_Failed"]));
        assert_eq!(result.reason, Some(ValidationReason::FailureTag));
    }

    #[test]
    fn media_only_items_validate_their_summary() {
        let content = ExtractedContent::new("Photo", "", "instagram.com").with_image(
            Some("https://cdn.example.com/a.jpg".to_string()),
            ImageProvenance::EmbedPage,
        );
        assert!(validate(&content, &summary(&["photo"])).is_valid);

        let mut thin = summary(&[]);
        thin.summary = vec!["Photo.".to_string()];
        assert_eq!(validate(&content, &thin).reason, Some(ValidationReason::TooShort));
    }

    #[test]
    fn text_free_items_without_media_are_empty() {
        let result = validate(&text(""), &summary(&[]));
        assert_eq!(result.reason, Some(ValidationReason::EmptyContent));
    }
}
