/*!
 * Tests for the provider transport and configuration-driven settings
 */

use std::collections::HashMap;
use std::sync::Arc;

use polyglot_mt::app_config::Config;
use polyglot_mt::errors::ProviderError;
use polyglot_mt::model::{ExampleItem, LanguageRef, Metadata, MtServiceInfo, MtServiceType};
use polyglot_mt::providers::mock::MockProvider;
use polyglot_mt::providers::manager::MtServiceManager;
use polyglot_mt::providers::{TranslationTransport, TransportRequest};
use polyglot_mt::translation::cache::TranslationCache;
use polyglot_mt::translation::settings::{ConfigMtServiceSettings, MtServiceConfig};

fn request(service: MtServiceType, targets: &[&str]) -> TransportRequest {
    TransportRequest {
        text: "Save {xx0}".to_string(),
        raw_text: "Save {file}".to_string(),
        key_name: Some("save_button".to_string()),
        source_tag: "en".to_string(),
        target_tags: targets.iter().map(|t| t.to_string()).collect(),
        service: MtServiceInfo::new(service),
        metadata: None,
        is_batch: false,
    }
}

fn metadata_for(tag: &str) -> HashMap<String, Metadata> {
    let metadata = Metadata {
        examples: vec![ExampleItem::new("open_button", "Open {xx0}", "Öffnen {xx0}")],
        key_description: Some("Toolbar button".to_string()),
        ..Metadata::default()
    };
    HashMap::from([(tag.to_string(), metadata)])
}

#[tokio::test]
async fn test_translate_withMetadata_shouldBypassCacheAndReachProvider() {
    let provider = MockProvider::working().with_service_type(MtServiceType::Anthropic);
    let mut manager = MtServiceManager::new(TranslationCache::new(true));
    manager.register(Arc::new(provider.clone()));

    let mut with_context = request(MtServiceType::Anthropic, &["de"]);
    with_context.metadata = Some(metadata_for("de"));

    manager.translate(&with_context).await.unwrap();
    let second = manager.translate(&with_context).await.unwrap();

    assert_eq!(provider.request_count(), 2);
    assert!(manager.cache().is_empty());
    assert_eq!(second[0].actual_price, 10);

    let calls = provider.calls();
    let received = calls[0].metadata.as_ref().unwrap();
    assert_eq!(received.key_description.as_deref(), Some("Toolbar button"));
    assert_eq!(received.examples[0].target, "Öffnen {xx0}");
}

#[tokio::test]
async fn test_translate_withRepeatedPlainRequest_shouldBeFreeFromCache() {
    let provider = MockProvider::working().with_price_per_char(3);
    let mut manager = MtServiceManager::new(TranslationCache::new(true));
    manager.register(Arc::new(provider.clone()));

    let first = manager.translate(&request(MtServiceType::Google, &["fr"])).await.unwrap();
    let second = manager.translate(&request(MtServiceType::Google, &["fr"])).await.unwrap();

    assert_eq!(provider.request_count(), 1);
    assert_eq!(first[0].actual_price, 30);
    assert_eq!(second[0].actual_price, 0);
    assert_eq!(first[0].translated_text, second[0].translated_text);
    assert_eq!(second[0].used_service, MtServiceType::Google);
}

#[tokio::test]
async fn test_translate_withSeveralTargets_shouldFanOutOneProviderCallPerTarget() {
    let provider = MockProvider::working();
    let mut manager = MtServiceManager::new(TranslationCache::new(false));
    manager.register(Arc::new(provider.clone()));

    let results = manager
        .translate(&request(MtServiceType::Google, &["de", "fr"]))
        .await
        .unwrap();

    let texts: Vec<_> = results.iter().map(|r| r.translated_text.clone()).collect();
    assert_eq!(
        texts,
        vec![Some("[de] Save {xx0}".to_string()), Some("[fr] Save {xx0}".to_string())]
    );
    let targets: Vec<_> = provider.calls().iter().map(|c| c.target_tag.clone()).collect();
    assert_eq!(targets, vec!["de", "fr"]);
}

#[tokio::test]
async fn test_translate_withFailingProvider_shouldSurfaceTypedErrors() {
    let mut manager = MtServiceManager::new(TranslationCache::new(false));
    manager.register(Arc::new(MockProvider::failing()));
    manager.register(Arc::new(MockProvider::unauthorized().with_service_type(MtServiceType::Deepl)));

    let server_error = manager
        .translate(&request(MtServiceType::Google, &["de"]))
        .await
        .unwrap_err();
    let auth_error = manager
        .translate(&request(MtServiceType::Deepl, &["de"]))
        .await
        .unwrap_err();

    assert!(server_error.is_transient());
    assert!(matches!(auth_error, ProviderError::AuthenticationError(_)));
    assert!(!auth_error.is_transient());
}

#[tokio::test]
async fn test_translate_withIntermittentProvider_shouldFailEveryThirdCall() {
    let provider = MockProvider::intermittent(3);
    let mut manager = MtServiceManager::new(TranslationCache::new(false));
    manager.register(Arc::new(provider.clone()));

    let mut outcomes = Vec::new();
    for _ in 0..3 {
        outcomes.push(manager.translate(&request(MtServiceType::Google, &["cs"])).await.is_ok());
    }

    assert_eq!(outcomes, vec![true, true, false]);
    assert_eq!(provider.request_count(), 3);
}

#[test]
fn test_fromConfig_withoutApiKeys_shouldOnlyRegisterLocalServices() {
    let manager = MtServiceManager::from_config(&Config::default()).unwrap();

    assert_eq!(manager.available_services(), vec![MtServiceType::Ollama]);
    assert!(!manager.supports(MtServiceType::Google, "de"));
}

#[test]
fn test_settings_withLanguageSupport_shouldDropUnsupportedServices() {
    let mut config = Config::default();
    for provider in config.providers.iter_mut() {
        provider.api_key = "key".to_string();
    }
    let manager = Arc::new(MtServiceManager::from_config(&config).unwrap());
    let settings = ConfigMtServiceSettings::from_config(&config)
        .with_available_services(manager.available_services())
        .with_language_support(manager);

    let armenian = LanguageRef::new(7, "hy");
    let enabled: Vec<_> = settings
        .enabled_services(&armenian)
        .into_iter()
        .map(|s| s.service_type)
        .collect();

    assert_eq!(enabled, vec![MtServiceType::Google]);
    assert_eq!(
        settings.primary_service(&armenian).map(|s| s.service_type),
        Some(MtServiceType::Google)
    );
}
