/*!
 * Tests for the MtService orchestrator
 */

use std::sync::Arc;

use polyglot_mt::errors::{MtError, ProviderError};
use polyglot_mt::model::{KeyRef, MtServiceType};
use polyglot_mt::translation::events::{EventBus, MtEvent};
use polyglot_mt::translation::metadata::MetadataAssembler;
use polyglot_mt::translation::MtService;

use crate::common::{
    CapturingSubscriber, FixedSettings, InMemoryCatalog, ORGANIZATION_ID, RecordingTransport, czech,
    english, french, german, greeting_key, memory_item, project,
};

struct Harness {
    service: MtService,
    transport: Arc<RecordingTransport>,
    events: Arc<CapturingSubscriber>,
}

fn harness(settings: FixedSettings, catalog: InMemoryCatalog, transport: RecordingTransport) -> Harness {
    let catalog = Arc::new(catalog);
    let transport = Arc::new(transport);
    let events = CapturingSubscriber::new();
    let bus = Arc::new(EventBus::new());
    bus.subscribe(events.clone());

    let metadata = MetadataAssembler::new()
        .with_memory(catalog.clone())
        .with_close_keys(catalog.clone(), catalog.clone());

    let service = MtService::new(Arc::new(settings), transport.clone(), catalog)
        .with_metadata(metadata)
        .with_events(bus);

    Harness {
        service,
        transport,
        events,
    }
}

fn two_services_for_german() -> FixedSettings {
    FixedSettings::new().enable("de", &[MtServiceType::Google, MtServiceType::Deepl])
}

#[tokio::test]
async fn test_translateForOneLanguage_withBlankText_shouldReturnBlankResultsWithoutCalls() {
    let h = harness(two_services_for_german(), InMemoryCatalog::new(), RecordingTransport::new());

    let results = h
        .service
        .translate_for_one_language(&project(), None, Some("  \n "), &german(), None)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    for (service, result) in &results {
        assert!(result.base_blank);
        assert_eq!(result.actual_price, 0);
        assert_eq!(result.used_service, *service);
        assert!(result.translated_text.is_none());
    }
    assert_eq!(h.transport.call_count(), 0);
    assert!(h.events.events().is_empty());
}

#[tokio::test]
async fn test_translateForOneLanguage_withKeyWithoutBaseText_shouldReturnBlankResults() {
    let h = harness(two_services_for_german(), InMemoryCatalog::new(), RecordingTransport::new());
    let key = KeyRef::new(99, "untranslated");

    let results = h
        .service
        .translate_for_one_language(&project(), Some(&key), None, &german(), None)
        .await
        .unwrap();

    assert!(results.values().all(|r| r.base_blank));
    assert_eq!(h.transport.call_count(), 0);
}

#[tokio::test]
async fn test_translateForOneLanguage_withTooLongText_shouldFailBeforeEvents() {
    let mut h = harness(two_services_for_german(), InMemoryCatalog::new(), RecordingTransport::new());
    h.service = h.service.with_max_text_length(5);

    let error = h
        .service
        .translate_for_one_language(&project(), None, Some("Hello world"), &german(), None)
        .await
        .unwrap_err();

    assert!(matches!(error, MtError::TextTooLong { length: 11, max: 5 }));
    assert!(error.is_validation());
    assert!(h.events.events().is_empty());
    assert_eq!(h.transport.call_count(), 0);
}

#[tokio::test]
async fn test_translateForOneLanguage_withDesiredServiceNotEnabled_shouldFail() {
    let h = harness(two_services_for_german(), InMemoryCatalog::new(), RecordingTransport::new());

    let error = h
        .service
        .translate_for_one_language(
            &project(),
            None,
            Some("Hello"),
            &german(),
            Some(&[MtServiceType::Google, MtServiceType::Anthropic]),
        )
        .await
        .unwrap_err();

    assert!(matches!(error, MtError::ServiceNotEnabled(MtServiceType::Anthropic)));
    assert_eq!(h.transport.call_count(), 0);
}

#[tokio::test]
async fn test_translateForOneLanguage_withDesiredSubset_shouldOnlyCallThoseServices() {
    let h = harness(two_services_for_german(), InMemoryCatalog::new(), RecordingTransport::new());

    let results = h
        .service
        .translate_for_one_language(&project(), None, Some("Hello"), &german(), Some(&[MtServiceType::Deepl]))
        .await
        .unwrap();

    assert_eq!(results.keys().copied().collect::<Vec<_>>(), vec![MtServiceType::Deepl]);
    assert_eq!(h.transport.call_count(), 1);
}

#[tokio::test]
async fn test_translateForOneLanguage_withMissingBaseLanguage_shouldFail() {
    let h = harness(
        two_services_for_german(),
        InMemoryCatalog::without_base_language(),
        RecordingTransport::new(),
    );

    let error = h
        .service
        .translate_for_one_language(&project(), None, Some("Hello"), &german(), None)
        .await
        .unwrap_err();

    assert!(matches!(error, MtError::BaseLanguageNotFound));
    assert!(h.events.events().is_empty());
}

#[tokio::test]
async fn test_translateForOneLanguage_withPlaceholder_shouldRestoreArgument() {
    let settings = FixedSettings::new().enable("de", &[MtServiceType::Google]);
    let h = harness(settings, InMemoryCatalog::new(), RecordingTransport::new().with_price(7));

    let results = h
        .service
        .translate_for_one_language(&project(), None, Some("Hello {name}"), &german(), None)
        .await
        .unwrap();

    let result = &results[&MtServiceType::Google];
    assert_eq!(result.translated_text.as_deref(), Some("de:Hello {name}"));
    assert!(!result.base_blank);
    assert_eq!(result.actual_price, 7);

    let request = &h.transport.requests()[0];
    assert_eq!(request.text, "Hello {xx0}");
    assert_eq!(request.raw_text, "Hello {name}");
    assert_eq!(request.source_tag, "en");
    assert_eq!(request.target_tags, vec!["de"]);
}

#[tokio::test]
async fn test_translateForOneLanguage_shouldPublishTotalOfResultPrices() {
    let h = harness(two_services_for_german(), InMemoryCatalog::new(), RecordingTransport::new().with_price(12));

    let results = h
        .service
        .translate_for_one_language(&project(), None, Some("Hello"), &german(), None)
        .await
        .unwrap();

    let total: u64 = results.values().map(|r| r.actual_price).sum();
    assert_eq!(total, 24);
    assert_eq!(
        h.events.events(),
        vec![
            MtEvent::BeforeTranslation { organization_id: ORGANIZATION_ID },
            MtEvent::AfterTranslation { organization_id: ORGANIZATION_ID, actual_price: total },
        ]
    );
}

#[tokio::test]
async fn test_translateForOneLanguage_withoutText_shouldUseStoredBaseTranslation() {
    let settings = FixedSettings::new().enable("de", &[MtServiceType::Google]);
    let catalog = InMemoryCatalog::new().with_key(greeting_key(), "Good morning");
    let h = harness(settings, catalog, RecordingTransport::new());

    let results = h
        .service
        .translate_for_one_language(&project(), Some(&greeting_key()), None, &german(), None)
        .await
        .unwrap();

    assert_eq!(
        results[&MtServiceType::Google].translated_text.as_deref(),
        Some("de:Good morning")
    );
    assert_eq!(h.transport.requests()[0].key_name.as_deref(), Some("greeting"));
}

#[tokio::test]
async fn test_translateForOneLanguage_withTransportFailure_shouldPropagate() {
    let settings = FixedSettings::new().enable("de", &[MtServiceType::Google]);
    let transport = RecordingTransport::new().failing_with(|| ProviderError::ConnectionError("refused".to_string()));
    let h = harness(settings, InMemoryCatalog::new(), transport);

    let error = h
        .service
        .translate_for_one_language(&project(), None, Some("Hello"), &german(), None)
        .await
        .unwrap_err();

    assert!(matches!(error, MtError::Provider(ProviderError::ConnectionError(_))));
    assert_eq!(
        h.events.events(),
        vec![MtEvent::BeforeTranslation { organization_id: ORGANIZATION_ID }]
    );
}

#[tokio::test]
async fn test_translateForOneLanguage_withMetadataService_shouldAttachMetadata() {
    let settings = FixedSettings::new().enable("de", &[MtServiceType::Google, MtServiceType::Anthropic]);
    let catalog = InMemoryCatalog::new()
        .with_key(greeting_key(), "Hello")
        .with_key(KeyRef::new(11, "farewell"), "Goodbye")
        .with_translation(11, german().id, "Tschüss")
        .with_close_keys(10, &[11])
        .with_memory(memory_item(10, "greeting", "Hello", "Hallo"))
        .with_memory(memory_item(12, "greeting_short", "Hello!", "Hallo!"));
    let h = harness(settings, catalog, RecordingTransport::new());

    h.service
        .translate_for_one_language(&project(), Some(&greeting_key()), None, &german(), None)
        .await
        .unwrap();

    let requests = h.transport.requests();
    let google = requests.iter().find(|r| r.service.service_type == MtServiceType::Google).unwrap();
    let anthropic = requests.iter().find(|r| r.service.service_type == MtServiceType::Anthropic).unwrap();

    assert!(google.metadata.is_none());
    let metadata = &anthropic.metadata.as_ref().unwrap()["de"];
    assert_eq!(metadata.examples.len(), 1);
    assert_eq!(metadata.examples[0].key, "greeting_short");
    assert_eq!(metadata.close_items.len(), 1);
    assert_eq!(metadata.close_items[0].target, "Tschüss");
}

#[tokio::test]
async fn test_translatePrimaryForManyLanguages_withSharedPrimary_shouldCallOnceInInputOrder() {
    let settings = FixedSettings::new()
        .primary("de", MtServiceType::Google)
        .primary("fr", MtServiceType::Google);
    let catalog = InMemoryCatalog::new().with_key(greeting_key(), "Hello");
    let h = harness(settings, catalog, RecordingTransport::new());

    let results = h
        .service
        .translate_primary_for_many_languages(&project(), &greeting_key(), &[german(), french()], false)
        .await
        .unwrap();

    assert_eq!(h.transport.call_count(), 1);
    assert_eq!(h.transport.requests()[0].target_tags, vec!["de", "fr"]);
    let texts: Vec<_> = results
        .iter()
        .map(|r| r.as_ref().and_then(|r| r.translated_text.clone()))
        .collect();
    assert_eq!(texts, vec![Some("de:Hello".to_string()), Some("fr:Hello".to_string())]);
}

#[tokio::test]
async fn test_translatePrimaryForManyLanguages_withMixedPrimaries_shouldStayIndexAligned() {
    let settings = FixedSettings::new()
        .primary("de", MtServiceType::Google)
        .primary("cs", MtServiceType::Deepl)
        .primary("fr", MtServiceType::Google);
    let catalog = InMemoryCatalog::new().with_key(greeting_key(), "Hello");
    let h = harness(settings, catalog, RecordingTransport::new().with_price(5));

    let targets = [german(), czech(), english(), french()];
    let results = h
        .service
        .translate_primary_for_many_languages(&project(), &greeting_key(), &targets, true)
        .await
        .unwrap();

    assert_eq!(results.len(), targets.len());
    assert_eq!(results[0].as_ref().unwrap().used_service, MtServiceType::Google);
    assert_eq!(results[1].as_ref().unwrap().translated_text.as_deref(), Some("cs:Hello"));
    assert!(results[2].is_none());
    assert_eq!(results[3].as_ref().unwrap().translated_text.as_deref(), Some("fr:Hello"));

    assert_eq!(h.transport.call_count(), 2);
    assert!(h.transport.requests().iter().all(|r| r.is_batch));
    assert_eq!(
        h.events.events().last(),
        Some(&MtEvent::AfterTranslation { organization_id: ORGANIZATION_ID, actual_price: 15 })
    );
}

#[tokio::test]
async fn test_translatePrimaryForManyLanguages_withoutBaseText_shouldReturnAllNone() {
    let settings = FixedSettings::new().primary("de", MtServiceType::Google);
    let h = harness(settings, InMemoryCatalog::new(), RecordingTransport::new());

    let results = h
        .service
        .translate_primary_for_many_languages(&project(), &greeting_key(), &[german(), french()], false)
        .await
        .unwrap();

    assert_eq!(results, vec![None, None]);
    assert_eq!(h.transport.call_count(), 0);
    assert!(h.events.events().is_empty());
}

#[tokio::test]
async fn test_translatePrimaryForManyLanguages_withoutAnyPrimary_shouldPublishNothing() {
    let catalog = InMemoryCatalog::new().with_key(greeting_key(), "Hello");
    let h = harness(FixedSettings::new(), catalog, RecordingTransport::new());

    let results = h
        .service
        .translate_primary_for_many_languages(&project(), &greeting_key(), &[german()], false)
        .await
        .unwrap();

    assert_eq!(results, vec![None]);
    assert!(h.events.events().is_empty());
}

#[tokio::test]
async fn test_translatePrimaryForManyLanguages_withTooLongText_shouldFailBeforeEvents() {
    let settings = FixedSettings::new()
        .primary("de", MtServiceType::Google)
        .primary("fr", MtServiceType::Deepl);
    let catalog = InMemoryCatalog::new().with_key(greeting_key(), "Hello");
    let mut h = harness(settings, catalog, RecordingTransport::new());
    h.service = h.service.with_max_text_length(3);

    let error = h
        .service
        .translate_primary_for_many_languages(&project(), &greeting_key(), &[german(), french()], false)
        .await
        .unwrap_err();

    assert!(matches!(error, MtError::TextTooLong { length: 5, max: 3 }));
    assert!(error.is_validation());
    assert!(h.events.events().is_empty());
    assert_eq!(h.transport.call_count(), 0);
}

#[tokio::test]
async fn test_translatePrimaryForManyLanguages_withMissingBaseLanguage_shouldFail() {
    let settings = FixedSettings::new().primary("de", MtServiceType::Google);
    let catalog = InMemoryCatalog::without_base_language().with_key(greeting_key(), "Hello");
    let h = harness(settings, catalog, RecordingTransport::new());

    let error = h
        .service
        .translate_primary_for_many_languages(&project(), &greeting_key(), &[german(), french()], false)
        .await
        .unwrap_err();

    assert!(matches!(error, MtError::BaseLanguageNotFound));
    assert!(error.is_validation());
    assert!(h.events.events().is_empty());
    assert_eq!(h.transport.call_count(), 0);
}

#[tokio::test]
async fn test_translatePrimaryForManyLanguages_shouldOnlySendMetadataToMetadataServices() {
    let settings = FixedSettings::new()
        .primary("de", MtServiceType::Anthropic)
        .primary("fr", MtServiceType::Deepl);
    let catalog = InMemoryCatalog::new().with_key(greeting_key(), "Hello");
    let h = harness(settings, catalog, RecordingTransport::new());

    h.service
        .translate_primary_for_many_languages(&project(), &greeting_key(), &[german(), french()], false)
        .await
        .unwrap();

    let requests = h.transport.requests();
    let anthropic = requests.iter().find(|r| r.service.service_type == MtServiceType::Anthropic).unwrap();
    let deepl = requests.iter().find(|r| r.service.service_type == MtServiceType::Deepl).unwrap();

    let metadata = anthropic.metadata.as_ref().unwrap();
    assert!(metadata.contains_key("de"));
    assert!(!metadata.contains_key("fr"));
    assert!(deepl.metadata.is_none());
}
