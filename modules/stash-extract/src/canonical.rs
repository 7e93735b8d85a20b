// URL canonicalization: one stable form per platform-specific URL variant.
//
// Fail-open: anything we cannot parse comes back unchanged. Every rule is
// idempotent, so canonicalizing a canonical URL is a no-op.

use stash_common::PlatformKind;
use url::Url;

use crate::router::{classify_host, parse_lenient};

const GENERIC_TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "msclkid", "ref", "source"];
const LINKEDIN_TRACKING_PARAMS: &[&str] = &["trk", "trackingId"];
const REDDIT_DROPPED_PARAMS: &[&str] = &["context", "share_id"];
const YOUTUBE_KEPT_PARAMS: &[&str] = &["v", "t"];

/// Canonicalize a URL for its platform family.
pub fn canonicalize(raw: &str) -> String {
    let Some(parsed) = parse_lenient(raw) else {
        return raw.to_string();
    };
    let Some(host) = parsed.host_str().map(|h| h.to_lowercase()) else {
        return raw.to_string();
    };

    let canonical = match classify_host(&host) {
        PlatformKind::Twitter => canonical_twitter(&parsed),
        PlatformKind::Instagram => canonical_instagram(&parsed),
        PlatformKind::Reddit => canonical_reddit(&parsed, &host),
        PlatformKind::Youtube => canonical_youtube(&parsed, &host),
        PlatformKind::Tiktok => canonical_tiktok(&parsed, &host),
        PlatformKind::Linkedin => canonical_linkedin(parsed, &host),
        PlatformKind::Generic => canonical_generic(parsed, &host),
    };

    canonical.unwrap_or_else(|| raw.to_string())
}

fn canonical_twitter(parsed: &Url) -> Option<String> {
    let path = match twitter_status(parsed) {
        Some((handle, id)) => format!("/{handle}/status/{id}"),
        None => parsed.path().to_string(),
    };
    Some(format!("https://twitter.com{path}"))
}

fn canonical_instagram(parsed: &Url) -> Option<String> {
    let path = match instagram_shortcode(parsed) {
        Some((kind, code)) => format!("/{kind}/{code}/"),
        None => parsed.path().to_string(),
    };
    Some(format!("https://instagram.com{path}"))
}

fn canonical_reddit(parsed: &Url, host: &str) -> Option<String> {
    let host = match host {
        "www.reddit.com" | "old.reddit.com" | "new.reddit.com" | "np.reddit.com"
        | "m.reddit.com" => "reddit.com",
        other => other,
    };
    let query = filtered_query(parsed, |key| {
        !REDDIT_DROPPED_PARAMS.contains(&key) && !key.starts_with("utm_")
    });
    Some(assemble(host, parsed.path(), query))
}

fn canonical_youtube(parsed: &Url, host: &str) -> Option<String> {
    if let Some(id) = youtube_video_id(parsed, host) {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query.append_pair("v", &id);
        if let Some((_, t)) = parsed.query_pairs().find(|(k, _)| k == "t") {
            query.append_pair("t", &t);
        }
        return Some(format!("https://youtube.com/watch?{}", query.finish()));
    }
    let query = filtered_query(parsed, |key| YOUTUBE_KEPT_PARAMS.contains(&key));
    Some(assemble("youtube.com", parsed.path(), query))
}

fn canonical_tiktok(parsed: &Url, host: &str) -> Option<String> {
    if is_tiktok_short_link_host(host, parsed.path()) {
        // Only a redirect knows where these go; leave the host for the resolver.
        return Some(assemble(host, parsed.path(), None));
    }
    let path = match tiktok_video(parsed) {
        Some((user, id)) => format!("/@{user}/video/{id}"),
        None => parsed.path().to_string(),
    };
    Some(format!("https://tiktok.com{path}"))
}

fn canonical_linkedin(mut parsed: Url, host: &str) -> Option<String> {
    strip_www(&mut parsed, host)?;
    let query = filtered_query(&parsed, |key| {
        !LINKEDIN_TRACKING_PARAMS.contains(&key) && !key.starts_with("utm_")
    });
    parsed.set_query(query.as_deref());
    Some(parsed.to_string())
}

fn canonical_generic(mut parsed: Url, host: &str) -> Option<String> {
    strip_www(&mut parsed, host)?;
    let query = filtered_query(&parsed, |key| {
        !GENERIC_TRACKING_PARAMS.contains(&key) && !key.starts_with("utm_")
    });
    parsed.set_query(query.as_deref());
    parsed.set_fragment(None);
    Some(parsed.to_string())
}

// --- helpers ---

fn strip_www(parsed: &mut Url, host: &str) -> Option<()> {
    if let Some(bare) = host.strip_prefix("www.") {
        parsed.set_host(Some(bare)).ok()?;
    }
    Some(())
}

/// Re-serialize the query keeping only pairs whose key passes `keep`.
/// `None` when nothing survives, so no dangling "?" is left behind.
fn filtered_query(parsed: &Url, keep: impl Fn(&str) -> bool) -> Option<String> {
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| keep(k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if pairs.is_empty() {
        return None;
    }
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    serializer.extend_pairs(pairs);
    Some(serializer.finish())
}

fn assemble(host: &str, path: &str, query: Option<String>) -> String {
    match query {
        Some(q) => format!("https://{host}{path}?{q}"),
        None => format!("https://{host}{path}"),
    }
}

fn segments(parsed: &Url) -> Vec<&str> {
    parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default()
}

// --- platform identifiers (shared with the resolvers) ---

/// (handle, status id) from a tweet URL.
pub(crate) fn twitter_status(parsed: &Url) -> Option<(String, String)> {
    let segs = segments(parsed);
    let idx = segs.iter().position(|s| *s == "status" || *s == "statuses")?;
    let id = segs.get(idx + 1)?;
    if idx == 0 || !id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((segs[idx - 1].to_string(), id.to_string()))
}

pub fn tweet_id(url: &str) -> Option<String> {
    twitter_status(&parse_lenient(url)?).map(|(_, id)| id)
}

/// ("p" | "reel" | "tv", shortcode) from an Instagram URL.
pub(crate) fn instagram_shortcode(parsed: &Url) -> Option<(&'static str, String)> {
    let segs = segments(parsed);
    segs.iter().enumerate().find_map(|(i, seg)| {
        let kind = match *seg {
            "p" => "p",
            "reel" | "reels" => "reel",
            "tv" => "tv",
            _ => return None,
        };
        segs.get(i + 1).map(|code| (kind, code.to_string()))
    })
}

pub fn instagram_post(url: &str) -> Option<(&'static str, String)> {
    instagram_shortcode(&parse_lenient(url)?)
}

pub(crate) fn youtube_video_id(parsed: &Url, host: &str) -> Option<String> {
    let segs = segments(parsed);
    let id = if host.ends_with("youtu.be") {
        segs.first().map(|s| s.to_string())
    } else if let Some((_, v)) = parsed.query_pairs().find(|(k, _)| k == "v") {
        Some(v.into_owned())
    } else {
        match segs.as_slice() {
            [kind, id, ..] if matches!(*kind, "shorts" | "embed" | "live" | "v") => {
                Some(id.to_string())
            }
            _ => None,
        }
    };
    id.filter(|id| is_youtube_id(id))
}

pub fn youtube_id(url: &str) -> Option<String> {
    let parsed = parse_lenient(url)?;
    let host = parsed.host_str()?.to_lowercase();
    youtube_video_id(&parsed, &host)
}

fn is_youtube_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 20
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// (username without "@", video id) from a TikTok URL.
pub(crate) fn tiktok_video(parsed: &Url) -> Option<(String, String)> {
    let segs = segments(parsed);
    let user_idx = segs.iter().position(|s| s.starts_with('@'))?;
    let kind = segs.get(user_idx + 1)?;
    let id = segs.get(user_idx + 2)?;
    if !matches!(*kind, "video" | "photo") {
        return None;
    }
    Some((segs[user_idx].trim_start_matches('@').to_string(), id.to_string()))
}

pub fn tiktok_post(url: &str) -> Option<(String, String)> {
    tiktok_video(&parse_lenient(url)?)
}

pub(crate) fn is_tiktok_short_link_host(host: &str, path: &str) -> bool {
    host.starts_with("vm.") || host.starts_with("vt.") || path.starts_with("/t/")
}

pub fn is_tiktok_short_link(url: &str) -> bool {
    parse_lenient(url)
        .and_then(|p| {
            let host = p.host_str()?.to_lowercase();
            Some(is_tiktok_short_link_host(&host, p.path()))
        })
        .unwrap_or(false)
}

const INSTAGRAM_RESERVED: &[&str] = &["p", "reel", "reels", "tv", "explore", "stories", "accounts"];

/// Display handle recoverable from the URL path alone: `@user` for Twitter,
/// Instagram and TikTok, `u/name` for Reddit, the profile slug for LinkedIn.
pub fn url_handle(url: &str, kind: PlatformKind) -> Option<String> {
    let parsed = parse_lenient(url)?;
    let segs = segments(&parsed);
    match kind {
        PlatformKind::Twitter => twitter_status(&parsed)
            .map(|(handle, _)| handle)
            .or_else(|| segs.first().map(|s| s.to_string()))
            .filter(|h| !matches!(h.as_str(), "i" | "home" | "search" | "intent"))
            .map(|h| format!("@{h}")),
        PlatformKind::Instagram => segs
            .first()
            .filter(|s| !INSTAGRAM_RESERVED.contains(*s))
            .map(|h| format!("@{h}")),
        PlatformKind::Tiktok => tiktok_video(&parsed)
            .map(|(user, _)| user)
            .or_else(|| {
                segs.iter()
                    .find_map(|s| s.strip_prefix('@').map(str::to_string))
            })
            .map(|h| format!("@{h}")),
        PlatformKind::Reddit => match segs.as_slice() {
            ["u" | "user", name, ..] => Some(format!("u/{name}")),
            _ => None,
        },
        PlatformKind::Linkedin => match segs.as_slice() {
            ["in" | "company", slug, ..] => Some(slug.to_string()),
            // posts/<slug>_<activity text>
            ["posts", rest, ..] => rest
                .split('_')
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            _ => None,
        },
        PlatformKind::Youtube | PlatformKind::Generic => None,
    }
}
