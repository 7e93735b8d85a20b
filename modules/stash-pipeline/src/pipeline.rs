// EnrichmentPipeline: turn one submission into a persisted, enriched record.
//
// Created → Extracting → Summarizing → DomainClassifying → Persisted
//
// The stub record is written before any network work, so a save is never
// lost. Any stage error moves that same record to its terminal failed state.
// Reward side effects are isolated: their failures are logged and dropped.

use std::sync::Arc;

use serde_json::json;
use stash_common::{
    Enrichment, ExtractedContent, FailureRecord, NewSavedItem, PipelineConfig, SavedItem,
    Submission, SubmissionOrigin, Summary,
};
use stash_extract::text_extract::truncate_chars;
use stash_extract::{canonicalize, classify, source_domain, ContentExtraction};
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::error::{PipelineError, StageError};
use crate::traits::{DomainClassifier, ItemStore, RewardAction, Rewards, SummaryRequest, Summarizer};
use crate::validator::validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Created,
    Extracting,
    Summarizing,
    DomainClassifying,
    Persisted,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Created => write!(f, "created"),
            Stage::Extracting => write!(f, "extracting"),
            Stage::Summarizing => write!(f, "summarizing"),
            Stage::DomainClassifying => write!(f, "domain_classifying"),
            Stage::Persisted => write!(f, "persisted"),
        }
    }
}

/// Final state of one run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub item: SavedItem,
    /// `Persisted` on success, otherwise the stage that failed.
    pub stage: Stage,
    pub error: Option<String>,
}

impl PipelineOutcome {
    pub fn is_enriched(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything enrichment produced, ready for the single update.
struct Enriched {
    content: ExtractedContent,
    summary: Summary,
    domain_id: Option<Uuid>,
}

#[derive(TypedBuilder)]
pub struct EnrichmentPipeline {
    extractor: Arc<dyn ContentExtraction>,
    summarizer: Arc<dyn Summarizer>,
    domains: Arc<dyn DomainClassifier>,
    store: Arc<dyn ItemStore>,
    rewards: Arc<dyn Rewards>,
    #[builder(default = PipelineConfig::from_env())]
    config: PipelineConfig,
}

impl EnrichmentPipeline {
    pub async fn process(&self, submission: Submission) -> Result<PipelineOutcome, PipelineError> {
        let item = self.create_stub(&submission).await?;
        let item_id = item.id;
        info!(%item_id, url = item.url.as_str(), stage = %Stage::Created, "Item saved");

        self.reward_save(&item).await;

        match self.enrich(&submission, item_id).await {
            Ok(enriched) => {
                let item = self.persist_enriched(item_id, enriched).await?;
                info!(%item_id, stage = %Stage::Persisted, "Item enriched");
                self.reward_process(&item).await;
                Ok(PipelineOutcome {
                    item,
                    stage: Stage::Persisted,
                    error: None,
                })
            }
            Err(e) => {
                let stage = e.stage();
                warn!(%item_id, %stage, error = %e, "Enrichment failed, marking item failed");
                let item = self.persist_failure(&item).await?;
                Ok(PipelineOutcome {
                    item,
                    stage,
                    error: Some(e.to_string()),
                })
            }
        }
    }

    // --- Created ---

    async fn create_stub(&self, submission: &Submission) -> Result<SavedItem, PipelineError> {
        let (canonical_url, source) = match &submission.origin {
            SubmissionOrigin::Email { sender_domain, .. } => {
                (submission.url.clone(), sender_domain.clone())
            }
            SubmissionOrigin::Web => (
                canonicalize(&submission.url),
                source_domain(&submission.url),
            ),
        };
        let stub = NewSavedItem::builder()
            .user_id(submission.user_id)
            .url(submission.url.clone())
            .canonical_url(canonical_url)
            .note(submission.note.clone())
            .source(source)
            .build();
        self.store.create(stub).await.map_err(PipelineError::Store)
    }

    // --- Extracting → Summarizing → DomainClassifying ---

    async fn enrich(&self, submission: &Submission, item_id: Uuid) -> Result<Enriched, StageError> {
        let content = self.extract(submission, item_id).await?;
        let summary = self.summarize(submission, &content, item_id).await?;
        let domain_id = self.classify_domain(&summary, item_id).await?;
        Ok(Enriched {
            content,
            summary,
            domain_id,
        })
    }

    async fn extract(
        &self,
        submission: &Submission,
        item_id: Uuid,
    ) -> Result<ExtractedContent, StageError> {
        match &submission.origin {
            SubmissionOrigin::Email {
                body,
                sender_domain,
                subject,
            } if !body.trim().is_empty() => {
                debug!(%item_id, stage = %Stage::Extracting, "Using attached email body");
                let title = if subject.trim().is_empty() {
                    submission.url.clone()
                } else {
                    subject.clone()
                };
                Ok(ExtractedContent::new(title, body.clone(), sender_domain.clone()))
            }
            // Web submissions, and emails that arrived without body text.
            _ => {
                let platform = classify(&submission.url);
                debug!(%item_id, %platform, stage = %Stage::Extracting, "Extracting");
                Ok(self.extractor.extract(&submission.url).await?)
            }
        }
    }

    async fn summarize(
        &self,
        submission: &Submission,
        content: &ExtractedContent,
        item_id: Uuid,
    ) -> Result<Summary, StageError> {
        let truncated = truncate_chars(&content.content, self.config.summary_char_limit);
        let request = SummaryRequest {
            url: submission.url.clone(),
            title: content.title.clone(),
            content: truncated,
            author: content.author.clone(),
            source: content.source.clone(),
            note: submission.note.clone(),
        };

        let thin = request.content.trim().chars().count() < self.config.image_mode_threshold;
        let summary = match content.image_url.as_deref() {
            Some(image_url) if thin => {
                debug!(%item_id, stage = %Stage::Summarizing, "Summarizing from image");
                self.summarizer.summarize_image(&request, image_url).await
            }
            _ => {
                debug!(%item_id, stage = %Stage::Summarizing, "Summarizing text");
                self.summarizer.summarize(&request).await
            }
        }
        .map_err(StageError::Summarizer)?;

        let validation = validate(content, &summary);
        if !validation.is_valid {
            return Err(StageError::Validation(validation));
        }
        Ok(summary)
    }

    async fn classify_domain(
        &self,
        summary: &Summary,
        item_id: Uuid,
    ) -> Result<Option<Uuid>, StageError> {
        let domain_id = self
            .domains
            .classify(&summary.category, &summary.tags)
            .await
            .map_err(StageError::DomainClassifier)?;
        debug!(%item_id, domain_id = ?domain_id, stage = %Stage::DomainClassifying, "Domain classified");
        Ok(domain_id)
    }

    // --- Persisted ---

    async fn persist_enriched(
        &self,
        item_id: Uuid,
        enriched: Enriched,
    ) -> Result<SavedItem, PipelineError> {
        let Enriched {
            content,
            summary,
            domain_id,
        } = enriched;
        let title = if summary.title.trim().is_empty() {
            content.title.clone()
        } else {
            summary.title.clone()
        };
        let enrichment = Enrichment {
            title,
            summary: summary.joined(),
            tags: summary.tags,
            item_type: summary.item_type,
            category: summary.category,
            raw_content: content.content,
            source: content.source,
            image_url: content.image_url,
            domain_id,
        };
        self.store
            .update_enriched(item_id, enrichment)
            .await
            .map_err(PipelineError::Store)
    }

    async fn persist_failure(&self, item: &SavedItem) -> Result<SavedItem, PipelineError> {
        self.store
            .mark_failed(item.id, FailureRecord::for_url(&item.url))
            .await
            .map_err(PipelineError::Store)
    }

    // --- side effects ---

    async fn reward_save(&self, item: &SavedItem) {
        let metadata = json!({ "url": item.url, "source": item.source });
        if let Err(e) = self
            .rewards
            .award(item.user_id, RewardAction::Save, None, Some(item.id), metadata)
            .await
        {
            warn!(item_id = %item.id, action = %RewardAction::Save, error = %e, "Reward failed");
        }
    }

    async fn reward_process(&self, item: &SavedItem) {
        let metadata = json!({
            "url": item.url,
            "source": item.source,
            "category": item.category,
            "tags": item.tags,
        });
        if let Err(e) = self
            .rewards
            .award(
                item.user_id,
                RewardAction::Process,
                item.domain_id,
                Some(item.id),
                metadata,
            )
            .await
        {
            warn!(item_id = %item.id, action = %RewardAction::Process, error = %e, "Reward failed");
        }

        match self.rewards.update_streak(item.user_id).await {
            Ok(streak) => debug!(
                item_id = %item.id,
                current = streak.current_streak,
                longest = streak.longest_streak,
                maintained = streak.maintained,
                broken = streak.broken,
                "Streak updated"
            ),
            Err(e) => warn!(item_id = %item.id, error = %e, "Streak update failed"),
        }

        match self.rewards.check_badges(item.user_id).await {
            Ok(badges) if !badges.is_empty() => {
                let slugs: Vec<&str> = badges.iter().map(|b| b.slug.as_str()).collect();
                info!(item_id = %item.id, badges = ?slugs, "Badges earned");
            }
            Ok(_) => {}
            Err(e) => warn!(item_id = %item.id, error = %e, "Badge check failed"),
        }
    }
}
