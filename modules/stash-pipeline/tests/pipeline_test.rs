use std::sync::Arc;

use stash_common::{
    ExtractedContent, FailureRecord, ImageProvenance, ItemStatus, Submission, SubmissionOrigin,
    Summary,
};
use stash_pipeline::testing::{
    sample_summary, FixedDomainClassifier, MemoryItemStore, MockSummarizer, RecordingRewards,
    RewardCall, StaticExtractor, StoreWrite, SummaryMode,
};
use stash_pipeline::{EnrichmentPipeline, PipelineError, RewardAction, Stage};
use uuid::Uuid;

struct Harness {
    pipeline: EnrichmentPipeline,
    extractor: Arc<StaticExtractor>,
    summarizer: Arc<MockSummarizer>,
    store: Arc<MemoryItemStore>,
    rewards: Arc<RecordingRewards>,
}

fn harness(
    extractor: StaticExtractor,
    summarizer: MockSummarizer,
    domains: FixedDomainClassifier,
    rewards: RecordingRewards,
) -> Harness {
    let extractor = Arc::new(extractor);
    let summarizer = Arc::new(summarizer);
    let store = Arc::new(MemoryItemStore::new());
    let rewards = Arc::new(rewards);
    let pipeline = EnrichmentPipeline::builder()
        .extractor(extractor.clone())
        .summarizer(summarizer.clone())
        .domains(Arc::new(domains))
        .store(store.clone())
        .rewards(rewards.clone())
        .build();
    Harness {
        pipeline,
        extractor,
        summarizer,
        store,
        rewards,
    }
}

fn article() -> ExtractedContent {
    ExtractedContent::new(
        "How the borrow checker works",
        "A long walk through lifetimes, loans and the rules that keep references valid.",
        "blog.example.com",
    )
    .with_author(Some("Jane Writer".to_string()))
}

fn web(url: &str) -> Submission {
    Submission::builder().url(url).user_id(Uuid::new_v4()).build()
}

#[tokio::test]
async fn successful_run_persists_once_and_rewards() {
    let domain = Uuid::new_v4();
    let h = harness(
        StaticExtractor::returning(article()),
        MockSummarizer::returning(sample_summary()),
        FixedDomainClassifier::returning(Some(domain)),
        RecordingRewards::new(),
    );

    let outcome = h
        .pipeline
        .process(web("https://blog.example.com/borrowck?utm_source=feed"))
        .await
        .unwrap();

    assert!(outcome.is_enriched());
    assert_eq!(outcome.stage, Stage::Persisted);
    let item = outcome.item;
    assert_eq!(item.status, ItemStatus::Enriched);
    assert_eq!(item.canonical_url, "https://blog.example.com/borrowck");
    assert_eq!(item.title.as_deref(), Some("A sample title"));
    assert_eq!(item.domain_id, Some(domain));
    assert_eq!(item.tags, vec!["rust", "programming"]);

    assert_eq!(
        h.store.writes(),
        vec![StoreWrite::Create(item.id), StoreWrite::UpdateEnriched(item.id)]
    );
    assert_eq!(
        h.rewards.calls(),
        vec![
            RewardCall::Award(RewardAction::Save),
            RewardCall::Award(RewardAction::Process),
            RewardCall::Streak,
            RewardCall::Badges,
        ]
    );
}

#[tokio::test]
async fn throwing_summarizer_leaves_a_failed_record() {
    let url = "https://blog.example.com/borrowck";
    let h = harness(
        StaticExtractor::returning(article()),
        MockSummarizer::throwing("model unavailable"),
        FixedDomainClassifier::returning(None),
        RecordingRewards::new(),
    );

    let outcome = h.pipeline.process(web(url)).await.unwrap();

    assert!(!outcome.is_enriched());
    assert_eq!(outcome.stage, Stage::Summarizing);
    assert!(outcome.error.unwrap().contains("model unavailable"));

    let stored = h.store.get(outcome.item.id).unwrap();
    assert_eq!(stored.status, ItemStatus::ProcessingFailed);
    assert_eq!(stored.tags, vec![FailureRecord::TAG]);
    assert_eq!(stored.title.as_deref(), Some(url));
    assert_eq!(stored.url, url);
    assert_eq!(stored.summary.as_deref(), Some(FailureRecord::MESSAGE));
}

#[tokio::test]
async fn tagged_failure_summary_is_rejected() {
    let h = harness(
        StaticExtractor::returning(article()),
        MockSummarizer::returning(Summary::failure("Borrowck", "The model refused this input.")),
        FixedDomainClassifier::returning(None),
        RecordingRewards::new(),
    );

    let outcome = h.pipeline.process(web("https://blog.example.com/b")).await.unwrap();

    assert_eq!(outcome.stage, Stage::Summarizing);
    assert_eq!(outcome.item.status, ItemStatus::ProcessingFailed);
    assert!(outcome.error.unwrap().starts_with("Validation failed"));
}

#[tokio::test]
async fn extraction_failure_marks_the_same_record_failed() {
    let h = harness(
        StaticExtractor::failing("all sources exhausted"),
        MockSummarizer::returning(sample_summary()),
        FixedDomainClassifier::returning(None),
        RecordingRewards::new(),
    );

    let outcome = h
        .pipeline
        .process(web("https://unreachable.example.com/post"))
        .await
        .unwrap();

    assert_eq!(outcome.stage, Stage::Extracting);
    assert_eq!(
        h.store.writes(),
        vec![
            StoreWrite::Create(outcome.item.id),
            StoreWrite::MarkFailed(outcome.item.id)
        ]
    );
    assert!(h.summarizer.requests().is_empty());
}

#[tokio::test]
async fn domain_classifier_error_fails_the_item() {
    let h = harness(
        StaticExtractor::returning(article()),
        MockSummarizer::returning(sample_summary()),
        FixedDomainClassifier::failing("directory offline"),
        RecordingRewards::new(),
    );

    let outcome = h.pipeline.process(web("https://blog.example.com/b")).await.unwrap();

    assert_eq!(outcome.stage, Stage::DomainClassifying);
    assert_eq!(outcome.item.status, ItemStatus::ProcessingFailed);
}

#[tokio::test]
async fn only_the_save_reward_fires_on_failure() {
    let h = harness(
        StaticExtractor::failing("nope"),
        MockSummarizer::returning(sample_summary()),
        FixedDomainClassifier::returning(None),
        RecordingRewards::new(),
    );

    h.pipeline.process(web("https://blog.example.com/b")).await.unwrap();

    assert_eq!(h.rewards.calls(), vec![RewardCall::Award(RewardAction::Save)]);
}

#[tokio::test]
async fn media_only_content_is_summarized_from_the_image() {
    let image = "https://cdn.example.com/photo.jpg";
    let photo = ExtractedContent::new("Photo by @someone", "", "instagram.com")
        .with_image(Some(image.to_string()), ImageProvenance::EmbedPage);
    let h = harness(
        StaticExtractor::returning(photo),
        MockSummarizer::returning(sample_summary()),
        FixedDomainClassifier::returning(None),
        RecordingRewards::new(),
    );

    let outcome = h
        .pipeline
        .process(web("https://www.instagram.com/p/ABC123/"))
        .await
        .unwrap();

    assert!(outcome.is_enriched());
    assert_eq!(outcome.item.image_url.as_deref(), Some(image));
    assert!(!outcome.item.tags.iter().any(|t| t == FailureRecord::TAG));

    let requests = h.summarizer.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, SummaryMode::Image(image.to_string()));
}

#[tokio::test]
async fn long_text_is_summarized_as_text_even_with_an_image() {
    let content = ExtractedContent::new("Essay", "word ".repeat(200), "blog.example.com")
        .with_image(Some("https://cdn.example.com/hero.jpg".to_string()), ImageProvenance::OpenGraph);
    let h = harness(
        StaticExtractor::returning(content),
        MockSummarizer::returning(sample_summary()),
        FixedDomainClassifier::returning(None),
        RecordingRewards::new(),
    );

    h.pipeline.process(web("https://blog.example.com/essay")).await.unwrap();

    assert_eq!(h.summarizer.requests()[0].0, SummaryMode::Text);
}

#[tokio::test]
async fn email_submissions_skip_the_extractor() {
    let h = harness(
        StaticExtractor::failing("should not be called"),
        MockSummarizer::returning(sample_summary()),
        FixedDomainClassifier::returning(None),
        RecordingRewards::new(),
    );
    let submission = Submission::builder()
        .url("https://newsletter.example.com/issue/42?utm_campaign=weekly")
        .user_id(Uuid::new_v4())
        .origin(SubmissionOrigin::Email {
            body: "This week: three long reads on distributed systems and caching.".to_string(),
            sender_domain: "newsletter.example.com".to_string(),
            subject: "Issue 42".to_string(),
        })
        .build();

    let outcome = h.pipeline.process(submission).await.unwrap();

    assert!(outcome.is_enriched());
    assert!(h.extractor.calls().is_empty());
    assert_eq!(outcome.item.source, "newsletter.example.com");
    assert_eq!(
        outcome.item.canonical_url,
        "https://newsletter.example.com/issue/42?utm_campaign=weekly"
    );
    let requests = h.summarizer.requests();
    assert_eq!(requests[0].1.title, "Issue 42");
}

#[tokio::test]
async fn email_without_body_text_is_extracted_from_its_url() {
    let h = harness(
        StaticExtractor::returning(article()),
        MockSummarizer::returning(sample_summary()),
        FixedDomainClassifier::returning(None),
        RecordingRewards::new(),
    );
    let url = "https://blog.example.com/borrowck";
    let submission = Submission::builder()
        .url(url)
        .user_id(Uuid::new_v4())
        .origin(SubmissionOrigin::Email {
            body: "  \n".to_string(),
            sender_domain: "newsletter.example.com".to_string(),
            subject: "Fwd: worth reading".to_string(),
        })
        .build();

    let outcome = h.pipeline.process(submission).await.unwrap();

    assert!(outcome.is_enriched(), "{:?}", outcome.error);
    assert_eq!(h.extractor.calls(), vec![url.to_string()]);
    assert_eq!(outcome.item.source, "blog.example.com");
    assert_eq!(h.summarizer.requests()[0].1.title, "How the borrow checker works");
}

#[tokio::test]
async fn reward_failures_do_not_fail_the_item() {
    let h = harness(
        StaticExtractor::returning(article()),
        MockSummarizer::returning(sample_summary()),
        FixedDomainClassifier::returning(None),
        RecordingRewards::failing(),
    );

    let outcome = h.pipeline.process(web("https://blog.example.com/b")).await.unwrap();

    assert!(outcome.is_enriched());
    assert_eq!(outcome.item.status, ItemStatus::Enriched);
    // Every reward call is still attempted after earlier ones fail.
    assert_eq!(h.rewards.calls().len(), 4);
    let updates = h
        .store
        .writes()
        .into_iter()
        .filter(|w| matches!(w, StoreWrite::UpdateEnriched(_)))
        .count();
    assert_eq!(updates, 1);
}

#[tokio::test]
async fn store_create_failure_is_the_only_error_returned() {
    let pipeline = EnrichmentPipeline::builder()
        .extractor(Arc::new(StaticExtractor::returning(article())))
        .summarizer(Arc::new(MockSummarizer::returning(sample_summary())))
        .domains(Arc::new(FixedDomainClassifier::returning(None)))
        .store(Arc::new(MemoryItemStore::failing_creates()))
        .rewards(Arc::new(RecordingRewards::new()))
        .build();

    let result = pipeline.process(web("https://blog.example.com/b")).await;

    assert!(matches!(result, Err(PipelineError::Store(_))));
}
