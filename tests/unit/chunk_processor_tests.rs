/*!
 * Tests for batch chunk processing and retry classification
 */

use std::sync::Arc;
use std::time::Duration;

use polyglot_mt::batch::{ChunkReport, ChunkState, MtChunkProcessor, RetryDecision, RetryPolicy};
use polyglot_mt::errors::{MtError, ProviderError};
use polyglot_mt::model::{KeyRef, MtServiceType};
use polyglot_mt::translation::MtService;

use crate::common::{FixedSettings, InMemoryCatalog, RecordingTransport, french, german, greeting_key, project};

/// Policy with millisecond delays so requeues stay fast
fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(1, 2, 3)
}

fn processor(catalog: Arc<InMemoryCatalog>, transport: RecordingTransport, policy: RetryPolicy) -> MtChunkProcessor {
    let settings = FixedSettings::new()
        .primary("de", MtServiceType::Google)
        .primary("fr", MtServiceType::Deepl);
    let service = MtService::new(Arc::new(settings), Arc::new(transport), catalog.clone());
    MtChunkProcessor::new(Arc::new(service), catalog.clone(), catalog, policy)
}

fn two_keys() -> InMemoryCatalog {
    InMemoryCatalog::new()
        .with_key(greeting_key(), "Hello")
        .with_key(KeyRef::new(11, "farewell"), "Goodbye")
}

#[test]
fn test_retryPolicy_default_shouldProduceDocumentedDelays() {
    let policy = RetryPolicy::default();

    assert_eq!(policy.delays_ms(), vec![100, 1000, 10000]);
    assert_eq!(policy.delay_for_attempt(3), None);
}

#[tokio::test]
async fn test_process_shouldSaveEveryTranslationAndReportPrice() {
    let catalog = Arc::new(two_keys());
    let processor = processor(catalog.clone(), RecordingTransport::new().with_price(3), fast_policy());
    let mut report = ChunkReport::default();

    processor
        .process(&project(), &[10, 11], &[german(), french()], &mut report)
        .await
        .unwrap();

    assert_eq!(report.processed_keys, vec![10, 11]);
    assert_eq!(report.translations_saved, 4);
    assert_eq!(report.total_price, 12);
    assert!(catalog.saved().contains(&(11, german().id, "de:Goodbye".to_string())));
}

#[tokio::test]
async fn test_process_withAlreadyProcessedKeys_shouldSkipThem() {
    let catalog = Arc::new(two_keys());
    let processor = processor(catalog.clone(), RecordingTransport::new(), fast_policy());
    let mut report = ChunkReport {
        processed_keys: vec![10],
        ..ChunkReport::default()
    };

    processor
        .process(&project(), &[10, 11], &[german()], &mut report)
        .await
        .unwrap();

    assert_eq!(catalog.saved(), vec![(11, german().id, "de:Goodbye".to_string())]);
    assert_eq!(report.processed_keys, vec![10, 11]);
}

#[tokio::test]
async fn test_process_withDeletedKey_shouldSkipAndCountIt() {
    let catalog = Arc::new(two_keys());
    let processor = processor(catalog.clone(), RecordingTransport::new(), fast_policy());
    let mut report = ChunkReport::default();

    processor
        .process(&project(), &[404, 10], &[german()], &mut report)
        .await
        .unwrap();

    assert_eq!(report.processed_keys, vec![404, 10]);
    assert_eq!(report.translations_saved, 1);
}

#[tokio::test]
async fn test_process_withLookupFailure_shouldBeRetryableWithProcessedKeys() {
    let catalog = Arc::new(two_keys().with_broken_key(11));
    let processor = processor(catalog, RecordingTransport::new(), fast_policy());
    let mut report = ChunkReport::default();

    let failure = processor
        .process(&project(), &[10, 11], &[german()], &mut report)
        .await
        .unwrap_err();

    assert!(failure.is_retryable());
    assert_eq!(failure.successful_targets, vec![10]);
}

#[tokio::test]
async fn test_process_withAuthenticationError_shouldBeTerminal() {
    let catalog = Arc::new(two_keys());
    let transport = RecordingTransport::new().failing_with(|| ProviderError::AuthenticationError("bad key".to_string()));
    let processor = processor(catalog, transport, fast_policy());
    let mut report = ChunkReport::default();

    let failure = processor
        .process(&project(), &[10, 11], &[german()], &mut report)
        .await
        .unwrap_err();

    assert!(!failure.is_retryable());
    assert!(failure.successful_targets.is_empty());
    assert_eq!(failure.decide(0), RetryDecision::Fail);
}

#[test]
fn test_classify_shouldSeparateTransientFromPermanentErrors() {
    let catalog = Arc::new(two_keys());
    let processor = processor(catalog, RecordingTransport::new(), RetryPolicy::default());

    let retryable = [
        MtError::Provider(ProviderError::RateLimitExceeded { message: "slow down".to_string(), retry_after_secs: None }),
        MtError::Provider(ProviderError::ConnectionError("reset".to_string())),
        MtError::Provider(ProviderError::ApiError { status_code: 503, message: "unavailable".to_string() }),
        MtError::Provider(ProviderError::OutOfCredits("empty".to_string())),
        MtError::Lookup("database busy".to_string()),
    ];
    for error in retryable {
        let failure = processor.classify(vec![1], error);
        assert!(failure.is_retryable(), "{} should be retryable", failure);
        assert_eq!(
            failure.decide(0),
            RetryDecision::Requeue { delay: Duration::from_millis(100), attempt: 0 }
        );
    }

    let terminal = [
        MtError::Provider(ProviderError::ApiError { status_code: 400, message: "bad request".to_string() }),
        MtError::Provider(ProviderError::AuthenticationError("denied".to_string())),
        MtError::TextTooLong { length: 20, max: 10 },
        MtError::BaseLanguageNotFound,
    ];
    for error in terminal {
        assert!(!processor.classify(vec![], error).is_retryable());
    }
}

#[tokio::test]
async fn test_run_withTransientLookupFailure_shouldRetryThenFail() {
    let catalog = Arc::new(two_keys().with_broken_key(11));
    let processor = processor(catalog.clone(), RecordingTransport::new(), fast_policy());

    let (state, report) = processor.run(&project(), &[10, 11], &[german()]).await;

    assert!(matches!(state, ChunkState::Failed { .. }));
    assert_eq!(report.processed_keys, vec![10]);
    // Key 10 is translated once; requeued runs resume at key 11
    assert_eq!(catalog.saved().len(), 1);
}

#[tokio::test]
async fn test_run_withHealthyChunk_shouldBeDone() {
    let catalog = Arc::new(two_keys());
    let processor = processor(catalog, RecordingTransport::new().with_price(2), fast_policy());

    let (state, report) = processor.run(&project(), &[10, 11], &[german(), french()]).await;

    assert_eq!(state, ChunkState::Done);
    assert_eq!(report.translations_saved, 4);
    assert_eq!(report.total_price, 8);
}

#[tokio::test]
async fn test_run_withWriteFailingMidKey_shouldCountEachTranslationOnce() {
    let catalog = Arc::new(two_keys().with_failing_write_once(10, french().id));
    let processor = processor(catalog.clone(), RecordingTransport::new().with_price(3), fast_policy());

    let (state, report) = processor.run(&project(), &[10], &[german(), french()]).await;

    assert_eq!(state, ChunkState::Done);
    assert_eq!(report.processed_keys, vec![10]);
    // German is written by both runs, French only by the requeued one
    assert_eq!(catalog.saved().len(), 3);
    assert_eq!(report.translations_saved, 2);
    assert_eq!(
        report.saved_pairs.iter().copied().collect::<Vec<_>>(),
        vec![(10, german().id), (10, french().id)]
    );
    assert_eq!(report.total_price, 12);
}
