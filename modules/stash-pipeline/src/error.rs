use stash_extract::ExtractError;

use crate::pipeline::Stage;
use crate::validator::Validation;

/// One stage of enrichment failed. Never escapes `EnrichmentPipeline::process`;
/// every variant ends in the item's terminal failed state.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Validation failed: {}", .0.error.as_deref().unwrap_or("invalid content"))]
    Validation(Validation),

    #[error("Summarizer failed: {0}")]
    Summarizer(anyhow::Error),

    #[error("Domain classifier failed: {0}")]
    DomainClassifier(anyhow::Error),
}

impl StageError {
    /// The stage that was running when this error occurred.
    pub fn stage(&self) -> Stage {
        match self {
            StageError::Extraction(_) => Stage::Extracting,
            StageError::Validation(_) | StageError::Summarizer(_) => Stage::Summarizing,
            StageError::DomainClassifier(_) => Stage::DomainClassifying,
        }
    }
}

/// The record itself could not be written. The only error `process` returns.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Item store error: {0}")]
    Store(anyhow::Error),
}
