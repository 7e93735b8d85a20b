use std::env;
use std::time::Duration;

use tracing::info;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Extraction configuration loaded from environment variables.
/// Every field has a working default; nothing here is required.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub user_agent: String,
    /// Generic metadata-extraction proxy (microlink-compatible `?url=` API).
    pub metadata_proxy_url: String,
    /// Third-party oEmbed proxy (noembed-compatible `?url=` API).
    pub oembed_proxy_url: String,
    /// Mirror listing endpoints, JSON fetches, redirect resolution.
    pub short_timeout: Duration,
    /// oEmbed, proxy, embed-page scrapes.
    pub standard_timeout: Duration,
    /// Full HTML page fetches.
    pub page_timeout: Duration,
    /// Reddit hosts tried in order for the JSON listing endpoint.
    pub reddit_mirrors: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            metadata_proxy_url: "https://api.microlink.io".to_string(),
            oembed_proxy_url: "https://noembed.com/embed".to_string(),
            short_timeout: Duration::from_secs(5),
            standard_timeout: Duration::from_secs(8),
            page_timeout: Duration::from_secs(10),
            reddit_mirrors: vec![
                "www.reddit.com".to_string(),
                "old.reddit.com".to_string(),
                "api.reddit.com".to_string(),
            ],
        }
    }
}

impl ExtractConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            user_agent: env::var("STASH_USER_AGENT").unwrap_or(defaults.user_agent),
            metadata_proxy_url: env::var("STASH_METADATA_PROXY_URL")
                .unwrap_or(defaults.metadata_proxy_url),
            oembed_proxy_url: env::var("STASH_OEMBED_PROXY_URL")
                .unwrap_or(defaults.oembed_proxy_url),
            short_timeout: secs_env("STASH_SHORT_TIMEOUT_SECS", defaults.short_timeout),
            standard_timeout: secs_env("STASH_STANDARD_TIMEOUT_SECS", defaults.standard_timeout),
            page_timeout: secs_env("STASH_PAGE_TIMEOUT_SECS", defaults.page_timeout),
            reddit_mirrors: env::var("STASH_REDDIT_MIRRORS")
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(|h| h.trim().to_string())
                        .filter(|h| !h.is_empty())
                        .collect::<Vec<_>>()
                })
                .filter(|mirrors| !mirrors.is_empty())
                .unwrap_or(defaults.reddit_mirrors),
        }
    }

    pub fn log_summary(&self) {
        info!(
            metadata_proxy = self.metadata_proxy_url.as_str(),
            oembed_proxy = self.oembed_proxy_url.as_str(),
            short_timeout_ms = self.short_timeout.as_millis() as u64,
            standard_timeout_ms = self.standard_timeout.as_millis() as u64,
            page_timeout_ms = self.page_timeout.as_millis() as u64,
            reddit_mirrors = ?self.reddit_mirrors,
            "Extraction config loaded"
        );
    }
}

/// Orchestrator knobs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Content is truncated to this many characters before summarization.
    pub summary_char_limit: usize,
    /// Below this many characters of text, an item with an image is
    /// summarized from the image instead.
    pub image_mode_threshold: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            summary_char_limit: 4000,
            image_mode_threshold: 100,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            summary_char_limit: usize_env("STASH_SUMMARY_CHAR_LIMIT", defaults.summary_char_limit),
            image_mode_threshold: usize_env(
                "STASH_IMAGE_MODE_THRESHOLD",
                defaults.image_mode_threshold,
            ),
        }
    }
}

fn secs_env(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn usize_env(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_stay_within_timeout_band() {
        let config = ExtractConfig::default();
        for timeout in [config.short_timeout, config.standard_timeout, config.page_timeout] {
            assert!(timeout >= Duration::from_secs(5));
            assert!(timeout <= Duration::from_secs(10));
        }
        assert_eq!(config.reddit_mirrors.len(), 3);
    }

    #[test]
    fn unparseable_env_falls_back_to_default() {
        assert_eq!(
            secs_env("STASH_TEST_UNSET_TIMEOUT_VAR", Duration::from_secs(7)),
            Duration::from_secs(7)
        );
        assert_eq!(usize_env("STASH_TEST_UNSET_LIMIT_VAR", 42), 42);
    }
}
