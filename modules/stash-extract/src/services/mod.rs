// Platform-specific resolvers. Each service knows how to pull one platform's
// content out of whatever that platform exposes publicly, through an ordered
// chain of fallbacks, and returns the universal `ExtractedContent`.

pub(crate) mod instagram;
pub(crate) mod linkedin;
pub(crate) mod page;
pub(crate) mod reddit;
pub(crate) mod tiktok;
pub(crate) mod twitter;
pub(crate) mod upstream;
pub(crate) mod youtube;
