// Open Graph / Twitter-card / <title> / meta-description parsing from raw HTML.
// Regex-based on purpose: works on truncated or malformed pages.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::text_extract::decode_entities;

/// Only the head matters for meta tags; bound the scan on huge pages.
const HEAD_LIMIT: usize = 200_000;

// property/name before content. Each quote style is matched on its own so an
// apostrophe inside a double-quoted value does not end it.
static META_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<meta\s+(?:[^>]*?\s)?(?:property|name)\s*=\s*["']([\w:.-]+)["'][^>]*?\scontent\s*=\s*(?:"([^"]*)"|'([^']*)')[^>]*>"#,
    )
    .expect("valid regex")
});

// content before property/name
static META_REV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<meta\s+(?:[^>]*?\s)?content\s*=\s*(?:"([^"]*)"|'([^']*)')[^>]*?\s(?:property|name)\s*=\s*["']([\w:.-]+)["'][^>]*>"#,
    )
    .expect("valid regex")
});

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid regex"));

/// Everything a page says about itself in its head.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub video: Option<String>,
    pub author: Option<String>,
    /// Contents of the `<title>` element, kept separately from og:title.
    pub html_title: Option<String>,
}

impl PageMeta {
    /// og:title, then twitter:title, then `<title>`.
    pub fn best_title(&self) -> Option<&str> {
        self.title.as_deref().or(self.html_title.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.image.is_none()
            && self.html_title.is_none()
    }
}

pub fn extract_meta(html: &str) -> PageMeta {
    let bounded = &html[..floor_char_boundary(html, HEAD_LIMIT)];
    let head = match bounded.find("</head>") {
        Some(end) => &bounded[..end],
        None => bounded,
    };

    let mut meta = PageMeta::default();

    let pairs = META_RE
        .captures_iter(head)
        .map(|c| (c[1].to_lowercase(), quoted(&c, 2, 3)))
        .chain(
            META_REV_RE
                .captures_iter(head)
                .map(|c| (c[3].to_lowercase(), quoted(&c, 1, 2))),
        );

    for (key, raw) in pairs {
        let value = decode_entities(raw.trim());
        if value.is_empty() {
            continue;
        }
        let slot = match key.as_str() {
            "og:title" | "twitter:title" => &mut meta.title,
            "og:description" | "twitter:description" | "description" => &mut meta.description,
            "og:image" | "og:image:url" | "og:image:secure_url" | "twitter:image"
            | "twitter:image:src" => &mut meta.image,
            "og:video" | "og:video:url" | "og:video:secure_url" => &mut meta.video,
            "author" | "article:author" | "twitter:creator" => &mut meta.author,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    meta.html_title = TITLE_RE
        .captures(head)
        .map(|c| decode_entities(c[1].trim()))
        .filter(|t| !t.is_empty());

    meta
}

/// Value of whichever quote-style group matched.
fn quoted(caps: &Captures<'_>, double: usize, single: usize) -> String {
    caps.get(double)
        .or_else(|| caps.get(single))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    let mut idx = max;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_og_tags_in_both_attribute_orders() {
        let html = r#"<html><head>
            <meta property="og:title" content="Hello &amp; welcome">
            <meta content="https://cdn.example.com/a.jpg" property="og:image" />
            <meta name="description" content="Plain description">
            <title>Fallback title</title>
        </head><body></body></html>"#;
        let meta = extract_meta(html);
        assert_eq!(meta.title.as_deref(), Some("Hello & welcome"));
        assert_eq!(meta.image.as_deref(), Some("https://cdn.example.com/a.jpg"));
        assert_eq!(meta.description.as_deref(), Some("Plain description"));
        assert_eq!(meta.html_title.as_deref(), Some("Fallback title"));
    }

    #[test]
    fn first_value_wins_and_title_falls_back() {
        let html = r#"<head><meta name="twitter:image" content="first.jpg">
            <meta property="og:image" content="second.jpg"><title> Only title </title></head>"#;
        let meta = extract_meta(html);
        assert_eq!(meta.image.as_deref(), Some("first.jpg"));
        assert_eq!(meta.best_title(), Some("Only title"));
    }

    #[test]
    fn ignores_body_meta_after_head() {
        let html = r#"<head><title>T</title></head><body><meta property="og:title" content="Body"></body>"#;
        let meta = extract_meta(html);
        assert_eq!(meta.title, None);
    }

    #[test]
    fn apostrophes_survive_in_both_attribute_orders() {
        let html = r#"<head>
            <meta property="og:description" content="Here's how we rebuilt our search stack">
            <meta content="Jane's notes on shipping" property="og:title">
            <meta name='author' content='Ana "the builder" Ruiz'>
        </head>"#;
        let meta = extract_meta(html);
        assert_eq!(meta.description.as_deref(), Some("Here's how we rebuilt our search stack"));
        assert_eq!(meta.title.as_deref(), Some("Jane's notes on shipping"));
        assert_eq!(meta.author.as_deref(), Some("Ana \"the builder\" Ruiz"));
    }

    #[test]
    fn empty_page_has_no_meta() {
        assert!(extract_meta("").is_empty());
    }
}
