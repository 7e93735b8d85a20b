pub mod domains;
pub mod error;
pub mod pipeline;
pub mod traits;
pub mod validator;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use domains::{CachedDomainClassifier, DomainCache};
pub use error::{PipelineError, StageError};
pub use pipeline::{EnrichmentPipeline, PipelineOutcome, Stage};
pub use traits::{
    Badge, DomainClassifier, DomainDirectory, DomainEntry, ItemStore, RewardAction, Rewards,
    StreakUpdate, SummaryRequest, Summarizer,
};
pub use validator::{validate, Validation, ValidationReason};
