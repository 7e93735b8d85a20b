pub mod canonical;
pub mod error;
pub mod extractor;
pub mod fallback;
pub mod fetch;
pub mod meta;
mod readability;
pub mod router;
mod services;
pub mod text_extract;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use canonical::{canonicalize, url_handle};
pub use error::{ExtractError, FetchError, Result};
pub use extractor::{ContentExtraction, ContentExtractor};
pub use fallback::{AttemptResult, FallbackChain};
pub use fetch::{HttpFetcher, ReqwestFetcher};
pub use router::{classify, source_domain};
pub use stash_common::{ExtractedContent, ImageProvenance, PlatformKind};
