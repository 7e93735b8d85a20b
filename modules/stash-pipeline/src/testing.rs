// Test mocks for the enrichment pipeline.
//
// One mock per trait boundary:
// - StaticExtractor (ContentExtraction): fixed result, records URLs
// - MockSummarizer (Summarizer): fixed summary or error, records the mode used
// - MemoryItemStore (ItemStore): in-memory records plus a write log
// - RecordingRewards (Rewards): records calls, optionally failing all of them
// - FixedDomainClassifier (DomainClassifier): fixed id or error

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use stash_common::{Enrichment, ExtractedContent, FailureRecord, NewSavedItem, SavedItem, Summary};
use stash_extract::{ContentExtraction, ExtractError, PlatformKind};
use uuid::Uuid;

use crate::traits::{
    Badge, DomainClassifier, ItemStore, RewardAction, Rewards, StreakUpdate, SummaryRequest,
    Summarizer,
};

// ---------------------------------------------------------------------------
// StaticExtractor
// ---------------------------------------------------------------------------

pub struct StaticExtractor {
    result: std::result::Result<ExtractedContent, String>,
    calls: Mutex<Vec<String>>,
}

impl StaticExtractor {
    pub fn returning(content: ExtractedContent) -> Self {
        Self {
            result: Ok(content),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails as if all fallbacks were exhausted.
    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(reason.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ContentExtraction for StaticExtractor {
    async fn extract(&self, url: &str) -> stash_extract::Result<ExtractedContent> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.to_string());
        }
        match &self.result {
            Ok(content) => Ok(content.clone()),
            Err(reason) => Err(ExtractError::exhausted(PlatformKind::Generic, reason.clone())),
        }
    }
}

// ---------------------------------------------------------------------------
// MockSummarizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryMode {
    Text,
    Image(String),
}

pub struct MockSummarizer {
    result: std::result::Result<Summary, String>,
    requests: Mutex<Vec<(SummaryMode, SummaryRequest)>>,
}

impl MockSummarizer {
    pub fn returning(summary: Summary) -> Self {
        Self {
            result: Ok(summary),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call returns `Err`, like an unreachable LLM.
    pub fn throwing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<(SummaryMode, SummaryRequest)> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn respond(&self, mode: SummaryMode, request: &SummaryRequest) -> Result<Summary> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((mode, request.clone()));
        }
        self.result.clone().map_err(|message| anyhow!(message))
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, request: &SummaryRequest) -> Result<Summary> {
        self.respond(SummaryMode::Text, request)
    }

    async fn summarize_image(&self, request: &SummaryRequest, image_url: &str) -> Result<Summary> {
        self.respond(SummaryMode::Image(image_url.to_string()), request)
    }
}

/// A well-formed summary for tests that only care about the happy path.
pub fn sample_summary() -> Summary {
    Summary {
        title: "A sample title".to_string(),
        summary: vec![
            "The first point of a reasonable summary.".to_string(),
            "A second point.".to_string(),
        ],
        tags: vec!["rust".to_string(), "programming".to_string()],
        item_type: "article".to_string(),
        category: "technology".to_string(),
    }
}

// ---------------------------------------------------------------------------
// MemoryItemStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    Create(Uuid),
    UpdateEnriched(Uuid),
    MarkFailed(Uuid),
}

/// Stateful in-memory store. `failing_creates()` makes every create fail.
#[derive(Default)]
pub struct MemoryItemStore {
    items: Mutex<HashMap<Uuid, SavedItem>>,
    writes: Mutex<Vec<StoreWrite>>,
    fail_creates: bool,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_creates() -> Self {
        Self {
            fail_creates: true,
            ..Self::default()
        }
    }

    pub fn get(&self, id: Uuid) -> Option<SavedItem> {
        self.items.lock().ok()?.get(&id).cloned()
    }

    pub fn writes(&self) -> Vec<StoreWrite> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    fn log(&self, write: StoreWrite) {
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(write);
        }
    }

    fn mutate(&self, id: Uuid, apply: impl FnOnce(&mut SavedItem)) -> Result<SavedItem> {
        let mut items = self.items.lock().map_err(|_| anyhow!("store lock poisoned"))?;
        let item = items
            .get_mut(&id)
            .ok_or_else(|| anyhow!("MemoryItemStore: no item {id}"))?;
        apply(item);
        Ok(item.clone())
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn create(&self, new: NewSavedItem) -> Result<SavedItem> {
        if self.fail_creates {
            bail!("MemoryItemStore: create refused");
        }
        let item = SavedItem::from_new(Uuid::new_v4(), new);
        self.items
            .lock()
            .map_err(|_| anyhow!("store lock poisoned"))?
            .insert(item.id, item.clone());
        self.log(StoreWrite::Create(item.id));
        Ok(item)
    }

    async fn update_enriched(&self, id: Uuid, enrichment: Enrichment) -> Result<SavedItem> {
        let item = self.mutate(id, |item| item.apply_enrichment(enrichment))?;
        self.log(StoreWrite::UpdateEnriched(id));
        Ok(item)
    }

    async fn mark_failed(&self, id: Uuid, failure: FailureRecord) -> Result<SavedItem> {
        let item = self.mutate(id, |item| item.apply_failure(failure))?;
        self.log(StoreWrite::MarkFailed(id));
        Ok(item)
    }
}

// ---------------------------------------------------------------------------
// RecordingRewards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewardCall {
    Award(RewardAction),
    Streak,
    Badges,
}

#[derive(Default)]
pub struct RecordingRewards {
    calls: Mutex<Vec<RewardCall>>,
    fail_all: bool,
}

impl RecordingRewards {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call is recorded and then fails.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<RewardCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: RewardCall) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.clone());
        }
        if self.fail_all {
            bail!("RecordingRewards: {call:?} refused");
        }
        Ok(())
    }
}

#[async_trait]
impl Rewards for RecordingRewards {
    async fn award(
        &self,
        _user_id: Uuid,
        action: RewardAction,
        _domain_id: Option<Uuid>,
        _item_id: Option<Uuid>,
        _metadata: serde_json::Value,
    ) -> Result<()> {
        self.record(RewardCall::Award(action))
    }

    async fn update_streak(&self, _user_id: Uuid) -> Result<StreakUpdate> {
        self.record(RewardCall::Streak)?;
        Ok(StreakUpdate {
            current_streak: 1,
            longest_streak: 1,
            maintained: true,
            broken: false,
        })
    }

    async fn check_badges(&self, _user_id: Uuid) -> Result<Vec<Badge>> {
        self.record(RewardCall::Badges)?;
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// FixedDomainClassifier
// ---------------------------------------------------------------------------

pub struct FixedDomainClassifier {
    result: std::result::Result<Option<Uuid>, String>,
}

impl FixedDomainClassifier {
    pub fn returning(id: Option<Uuid>) -> Self {
        Self { result: Ok(id) }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl DomainClassifier for FixedDomainClassifier {
    async fn classify(&self, _category: &str, _tags: &[String]) -> Result<Option<Uuid>> {
        self.result.clone().map_err(|message| anyhow!(message))
    }
}
