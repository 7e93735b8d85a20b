use std::time::Duration;

use stash_common::PlatformKind;

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// A resolver gave up: every fallback for a mandatory field came back empty.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("{}: {reason}", platform.display_name())]
    Exhausted {
        platform: PlatformKind,
        reason: String,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ExtractError {
    pub fn exhausted(platform: PlatformKind, reason: impl Into<String>) -> Self {
        ExtractError::Exhausted {
            platform,
            reason: reason.into(),
        }
    }
}

/// One outbound request failed. Never escapes a fallback chain.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}
