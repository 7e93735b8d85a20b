// Collaborator boundaries for the enrichment pipeline.
//
// ItemStore: the persistence layer that owns SavedItem.
// Rewards: XP and badge bookkeeping. Fire-and-forget from the pipeline.
// DomainClassifier: maps a summary's category and tags to a domain id.
// Summarizer: the LLM. Structured output is `Summary`.
// DomainDirectory: source of the domain names the cache loads.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stash_common::{Enrichment, FailureRecord, NewSavedItem, SavedItem, Summary};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ItemStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Insert the stub record in the `New` state.
    async fn create(&self, item: NewSavedItem) -> Result<SavedItem>;

    /// Write every enrichment field in one update and mark the item enriched.
    async fn update_enriched(&self, id: Uuid, enrichment: Enrichment) -> Result<SavedItem>;

    /// Move the item to its terminal failed state.
    async fn mark_failed(&self, id: Uuid, failure: FailureRecord) -> Result<SavedItem>;
}

// ---------------------------------------------------------------------------
// Rewards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardAction {
    Save,
    Process,
}

impl std::fmt::Display for RewardAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RewardAction::Save => write!(f, "save"),
            RewardAction::Process => write!(f, "process"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakUpdate {
    pub current_streak: u32,
    pub longest_streak: u32,
    /// The streak continued (or was already counted today).
    pub maintained: bool,
    /// A gap reset the streak before this activity.
    pub broken: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub slug: String,
    pub name: String,
}

#[async_trait]
pub trait Rewards: Send + Sync {
    async fn award(
        &self,
        user_id: Uuid,
        action: RewardAction,
        domain_id: Option<Uuid>,
        item_id: Option<Uuid>,
        metadata: serde_json::Value,
    ) -> Result<()>;

    async fn update_streak(&self, user_id: Uuid) -> Result<StreakUpdate>;

    /// Newly earned badges, if any.
    async fn check_badges(&self, user_id: Uuid) -> Result<Vec<Badge>>;
}

// ---------------------------------------------------------------------------
// DomainClassifier
// ---------------------------------------------------------------------------

#[async_trait]
pub trait DomainClassifier: Send + Sync {
    async fn classify(&self, category: &str, tags: &[String]) -> Result<Option<Uuid>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEntry {
    pub id: Uuid,
    pub name: String,
}

#[async_trait]
pub trait DomainDirectory: Send + Sync {
    async fn load_domains(&self) -> Result<Vec<DomainEntry>>;
}

// ---------------------------------------------------------------------------
// Summarizer
// ---------------------------------------------------------------------------

/// What the summarizer sees. `content` is already truncated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRequest {
    pub url: String,
    pub title: String,
    pub content: String,
    pub author: Option<String>,
    pub source: String,
    pub note: Option<String>,
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, request: &SummaryRequest) -> Result<Summary>;

    /// Summarize from the image when the text is too thin to say anything.
    async fn summarize_image(&self, request: &SummaryRequest, image_url: &str) -> Result<Summary>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streak_update_uses_the_rewards_wire_names() {
        let update: StreakUpdate = serde_json::from_str(
            r#"{"currentStreak":1,"longestStreak":9,"maintained":false,"broken":true}"#,
        )
        .unwrap();
        assert_eq!(update.current_streak, 1);
        assert_eq!(update.longest_streak, 9);
        assert!(update.broken && !update.maintained);
    }
}
