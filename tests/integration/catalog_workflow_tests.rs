/*!
 * End-to-end tests: SQLite catalog, configured settings, mock providers,
 * the orchestrator and the chunk processor working together
 */

use std::sync::Arc;

use polyglot_mt::app_config::Config;
use polyglot_mt::batch::{ChunkState, MtChunkProcessor, RetryPolicy};
use polyglot_mt::database::{CatalogFile, Repository};
use polyglot_mt::model::{ExampleItem, KeyRef, LanguageRef, MtServiceType, ProjectRef};
use polyglot_mt::providers::manager::MtServiceManager;
use polyglot_mt::providers::mock::MockProvider;
use polyglot_mt::translation::cache::TranslationCache;
use polyglot_mt::translation::{ConfigMtServiceSettings, EventBus, MetadataAssembler, MtService, UsageRecorder};

use crate::common::init_logging;

const ORGANIZATION_ID: i64 = 7;

fn catalog() -> CatalogFile {
    serde_json::from_value(serde_json::json!({
        "project": { "id": 1, "organizationId": ORGANIZATION_ID, "aiDescription": "Desktop file manager" },
        "languages": [
            { "tag": "en", "name": "English", "base": true },
            { "tag": "de", "name": "German", "aiDescription": "Informal German" },
            { "tag": "fr", "name": "French" }
        ],
        "keys": [
            {
                "name": "save_file",
                "description": "Toolbar button",
                "translations": { "en": "Save file", "de": "Datei speichern" },
                "closeKeys": ["open_file"]
            },
            {
                "name": "open_file",
                "translations": { "en": "Open file", "de": "Datei öffnen" }
            },
            {
                "name": "empty_label",
                "translations": { "en": "" }
            }
        ]
    }))
    .unwrap()
}

struct Workflow {
    repository: Repository,
    google: MockProvider,
    anthropic: MockProvider,
    usage: Arc<UsageRecorder>,
    service: Arc<MtService>,
}

async fn workflow() -> Workflow {
    init_logging();
    let repository = Repository::new_in_memory().unwrap();
    repository.import_catalog(&catalog()).await.unwrap();

    let mut config = Config::default();
    config.machine_translation.default_enabled_services = vec![MtServiceType::Google, MtServiceType::Anthropic];
    config.machine_translation.default_primary_service = Some(MtServiceType::Google);

    let google = MockProvider::working();
    let anthropic = MockProvider::working().with_service_type(MtServiceType::Anthropic);
    let mut manager = MtServiceManager::new(TranslationCache::new(config.cache_enabled));
    manager.register(Arc::new(google.clone()));
    manager.register(Arc::new(anthropic.clone()));
    let manager = Arc::new(manager);

    let settings = ConfigMtServiceSettings::from_config(&config)
        .with_available_services(manager.available_services())
        .with_language_support(manager.clone());

    let usage = Arc::new(UsageRecorder::new());
    let events = Arc::new(EventBus::new());
    events.subscribe(usage.clone());

    let catalog = Arc::new(repository.clone());
    let metadata = MetadataAssembler::new()
        .with_memory(catalog.clone())
        .with_close_keys(catalog.clone(), catalog.clone());

    let service = MtService::new(Arc::new(settings), manager, catalog)
        .with_metadata(metadata)
        .with_events(events)
        .with_max_text_length(config.max_translation_text_length);

    Workflow {
        repository,
        google,
        anthropic,
        usage,
        service: Arc::new(service),
    }
}

impl Workflow {
    async fn project(&self) -> ProjectRef {
        self.repository.get_project(1).await.unwrap().unwrap().to_ref()
    }

    async fn language(&self, tag: &str) -> LanguageRef {
        self.repository.find_language_by_tag(1, tag).await.unwrap().unwrap().to_ref()
    }

    async fn key(&self, name: &str) -> KeyRef {
        self.repository.find_key_by_name(1, name).await.unwrap().unwrap().to_ref()
    }
}

#[tokio::test]
async fn test_translateForOneLanguage_withImportedCatalog_shouldAttachMetadataForPromptServices() {
    let workflow = workflow().await;
    let project = workflow.project().await;
    let german = workflow.language("de").await;
    let key = workflow.key("save_file").await;

    let results = workflow
        .service
        .translate_for_one_language(&project, Some(&key), Some("Save {file}"), &german, None)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(
        results[&MtServiceType::Google].translated_text.as_deref(),
        Some("[de] Save {file}")
    );

    let google_calls = workflow.google.calls();
    assert_eq!(google_calls[0].text, "Save {xx0}");
    assert!(google_calls[0].metadata.is_none());

    let anthropic_calls = workflow.anthropic.calls();
    let metadata = anthropic_calls[0].metadata.as_ref().unwrap();
    assert_eq!(metadata.close_items, vec![ExampleItem::new("open_file", "Open file", "Datei öffnen")]);
    assert_eq!(metadata.key_description.as_deref(), Some("Toolbar button"));
    assert_eq!(metadata.project_description.as_deref(), Some("Desktop file manager"));
    assert_eq!(metadata.language_description.as_deref(), Some("Informal German"));
    assert!(metadata.examples.iter().all(|e| e.key != "save_file"));
}

#[tokio::test]
async fn test_translatePrimary_withSharedPrimary_shouldCallOnceAndRecordUsage() {
    let workflow = workflow().await;
    let project = workflow.project().await;
    let targets = vec![workflow.language("de").await, workflow.language("fr").await];
    let key = workflow.key("open_file").await;

    let results = workflow
        .service
        .translate_primary_for_many_languages(&project, &key, &targets, false)
        .await
        .unwrap();

    let texts: Vec<_> = results
        .iter()
        .map(|r| r.as_ref().and_then(|r| r.translated_text.clone()))
        .collect();
    assert_eq!(
        texts,
        vec![Some("[de] Open file".to_string()), Some("[fr] Open file".to_string())]
    );
    assert_eq!(workflow.anthropic.request_count(), 0);
    assert_eq!(workflow.usage.calls(ORGANIZATION_ID), 1);
    assert_eq!(workflow.usage.spent(ORGANIZATION_ID), 18);
}

#[tokio::test]
async fn test_chunkProcessor_shouldStoreTranslationsInCatalog() {
    let workflow = workflow().await;
    let project = workflow.project().await;
    let french = workflow.language("fr").await;
    let keys = workflow.repository.get_keys(1).await.unwrap();
    let key_ids: Vec<i64> = keys.iter().map(|k| k.id).collect();

    let catalog = Arc::new(workflow.repository.clone());
    let processor = MtChunkProcessor::new(
        workflow.service.clone(),
        catalog.clone(),
        catalog,
        RetryPolicy::new(1, 2, 1),
    );

    let (state, report) = processor.run(&project, &key_ids, &[french.clone()]).await;

    assert_eq!(state, ChunkState::Done);
    assert_eq!(report.processed_keys.len(), 3);
    assert_eq!(report.translations_saved, 2);

    let save_file = workflow.key("save_file").await;
    let empty_label = workflow.key("empty_label").await;
    assert_eq!(
        workflow.repository.get_translation(save_file.id, french.id).await.unwrap().as_deref(),
        Some("[fr] Save file")
    );
    assert_eq!(workflow.repository.get_translation(empty_label.id, french.id).await.unwrap(), None);
}

#[test]
fn test_importCatalog_twice_shouldNotDuplicateRows() {
    let (summary, stats) = tokio_test::block_on(async {
        let workflow = workflow().await;
        let summary = workflow.repository.import_catalog(&catalog()).await.unwrap();
        (summary, workflow.repository.connection().stats().unwrap())
    });

    assert_eq!(summary.languages, 0);
    assert_eq!(summary.keys, 0);
    assert_eq!(stats.language_count, 3);
    assert_eq!(stats.key_count, 3);
}
