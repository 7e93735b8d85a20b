// Platform detection: hostname pattern matching only, no HTTP.

use stash_common::PlatformKind;
use url::Url;

/// Classify a URL into a platform family. Never fails: anything unparseable
/// or unrecognized is `Generic`.
pub fn classify(url: &str) -> PlatformKind {
    match host_of(url) {
        Some(host) => classify_host(&host),
        None => PlatformKind::Generic,
    }
}

/// Classify a bare hostname. Case-insensitive substring matching; the families
/// do not overlap, so order is irrelevant.
pub fn classify_host(host: &str) -> PlatformKind {
    let host = host.to_lowercase();

    if host.contains("tiktok.com") {
        return PlatformKind::Tiktok;
    }
    if host.contains("instagram.com") || host.contains("instagr.am") {
        return PlatformKind::Instagram;
    }
    if host.contains("linkedin.com") || host.contains("lnkd.in") {
        return PlatformKind::Linkedin;
    }
    if host.contains("reddit.com") || host.contains("redd.it") {
        return PlatformKind::Reddit;
    }
    if host.contains("youtube.com") || host.contains("youtu.be") || host.contains("youtube-nocookie.com") {
        return PlatformKind::Youtube;
    }
    // "x.com" as a substring would catch box.com, dropbox.com, etc.
    if host.contains("twitter.com") || host == "x.com" || host.ends_with(".x.com") {
        return PlatformKind::Twitter;
    }
    PlatformKind::Generic
}

/// Lowercased hostname, tolerating a missing scheme ("tiktok.com/@user").
pub(crate) fn host_of(url: &str) -> Option<String> {
    parse_lenient(url)?.host_str().map(|h| h.to_lowercase())
}

/// Parse a URL, retrying with an https:// prefix when the scheme is missing.
pub(crate) fn parse_lenient(url: &str) -> Option<Url> {
    let trimmed = url.trim();
    if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
        return None;
    }
    match Url::parse(trimmed) {
        Ok(parsed) if parsed.host_str().is_some() => Some(parsed),
        Ok(_) => None,
        Err(_) if !trimmed.contains("://") => Url::parse(&format!("https://{trimmed}"))
            .ok()
            .filter(|u| u.host_str().is_some_and(|h| h.contains('.'))),
        Err(_) => None,
    }
}

/// Registrable-ish source label: host without a leading "www.".
pub fn source_domain(url: &str) -> String {
    host_of(url)
        .map(|h| h.trim_start_matches("www.").to_string())
        .unwrap_or_else(|| url.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiktok_host_wins_regardless_of_path() {
        for url in [
            "https://www.tiktok.com/@user/video/123",
            "https://vm.tiktok.com/ZMabc/",
            "https://tiktok.com/",
            "https://m.tiktok.com/v/123.html?x=instagram.com",
        ] {
            assert_eq!(classify(url), PlatformKind::Tiktok, "{url}");
        }
    }

    #[test]
    fn unparseable_input_is_generic() {
        assert_eq!(classify("not a url at all"), PlatformKind::Generic);
        assert_eq!(classify(""), PlatformKind::Generic);
        assert_eq!(classify("http://"), PlatformKind::Generic);
        assert_eq!(classify("::::"), PlatformKind::Generic);
    }

    #[test]
    fn twitter_and_x_urls() {
        for url in ["https://twitter.com/handle", "https://x.com/handle", "https://mobile.x.com/h/status/1"] {
            assert_eq!(classify(url), PlatformKind::Twitter, "{url}");
        }
    }

    #[test]
    fn x_suffix_does_not_capture_other_hosts() {
        assert_eq!(classify("https://box.com/s/abc"), PlatformKind::Generic);
        assert_eq!(classify("https://www.dropbox.com/s/abc"), PlatformKind::Generic);
    }

    #[test]
    fn each_family_by_host() {
        assert_eq!(classify("https://www.instagram.com/p/ABC/"), PlatformKind::Instagram);
        assert_eq!(classify("https://www.linkedin.com/posts/jane_x"), PlatformKind::Linkedin);
        assert_eq!(classify("https://old.reddit.com/r/rust/"), PlatformKind::Reddit);
        assert_eq!(classify("https://redd.it/abc123"), PlatformKind::Reddit);
        assert_eq!(classify("https://youtu.be/dQw4w9WgXcQ"), PlatformKind::Youtube);
        assert_eq!(classify("https://city.gov/about"), PlatformKind::Generic);
    }

    #[test]
    fn host_match_is_case_insensitive() {
        assert_eq!(classify("HTTPS://WWW.YOUTUBE.COM/watch?v=abc"), PlatformKind::Youtube);
    }

    #[test]
    fn schemeless_url_still_classifies() {
        assert_eq!(classify("tiktok.com/@user"), PlatformKind::Tiktok);
    }

    #[test]
    fn source_domain_strips_www() {
        assert_eq!(source_domain("https://www.example.com/a"), "example.com");
        assert_eq!(source_domain("https://blog.example.com/a"), "blog.example.com");
    }
}
