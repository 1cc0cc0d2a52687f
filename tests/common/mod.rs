/*!
 * Common test utilities for the polyglot-mt test suite
 *
 * In-memory stand-ins for the lookups, the provider transport, the
 * settings and the event subscribers the orchestrator depends on.
 */

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use polyglot_mt::errors::ProviderError;
use polyglot_mt::model::{KeyRef, LanguageRef, MtServiceInfo, MtServiceType, ProjectRef, TranslateResult};
use polyglot_mt::providers::{TranslationTransport, TransportRequest};
use polyglot_mt::translation::events::{EventSubscriber, LifecycleEvent, MtEvent};
use polyglot_mt::translation::lookup::{
    CloseKeyIndex, ProjectCatalog, StoredTranslation, TranslationLookup, TranslationMemory,
    TranslationMemoryItem, TranslationWriter,
};
use polyglot_mt::translation::settings::MtServiceConfig;

pub const ORGANIZATION_ID: i64 = 42;

/// Route library logs to the test output; safe to call from every test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn project() -> ProjectRef {
    ProjectRef::new(1, ORGANIZATION_ID)
}

pub fn english() -> LanguageRef {
    LanguageRef::new(1, "en")
}

pub fn german() -> LanguageRef {
    LanguageRef::new(2, "de")
}

pub fn french() -> LanguageRef {
    LanguageRef::new(3, "fr")
}

pub fn czech() -> LanguageRef {
    LanguageRef::new(4, "cs")
}

pub fn greeting_key() -> KeyRef {
    KeyRef::new(10, "greeting")
}

/// Transport answering `"<tag>:<text>"` and recording every request
pub struct RecordingTransport {
    requests: Mutex<Vec<TransportRequest>>,
    price: u64,
    failure: Option<fn() -> ProviderError>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            price: 10,
            failure: None,
        }
    }

    /// Every target result costs `price`
    pub fn with_price(mut self, price: u64) -> Self {
        self.price = price;
        self
    }

    /// Fail every call with the produced error
    pub fn failing_with(mut self, failure: fn() -> ProviderError) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl TranslationTransport for RecordingTransport {
    async fn translate(&self, request: &TransportRequest) -> Result<Vec<TranslateResult>, ProviderError> {
        self.requests.lock().push(request.clone());

        if let Some(failure) = self.failure {
            return Err(failure());
        }

        Ok(request
            .target_tags
            .iter()
            .map(|tag| {
                TranslateResult::new(
                    request.service.service_type,
                    format!("{}:{}", tag, request.text),
                    self.price,
                )
            })
            .collect())
    }
}

/// Settings keyed by language tag
#[derive(Default)]
pub struct FixedSettings {
    enabled: HashMap<String, Vec<MtServiceInfo>>,
    primary: HashMap<String, MtServiceInfo>,
}

impl FixedSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(mut self, tag: &str, services: &[MtServiceType]) -> Self {
        self.enabled
            .insert(tag.to_string(), services.iter().copied().map(MtServiceInfo::new).collect());
        self
    }

    pub fn primary(mut self, tag: &str, service: MtServiceType) -> Self {
        self.primary.insert(tag.to_string(), MtServiceInfo::new(service));
        self
    }
}

impl MtServiceConfig for FixedSettings {
    fn enabled_services(&self, language: &LanguageRef) -> Vec<MtServiceInfo> {
        self.enabled.get(&language.tag).cloned().unwrap_or_default()
    }

    fn primary_service(&self, language: &LanguageRef) -> Option<MtServiceInfo> {
        self.primary.get(&language.tag).copied()
    }
}

/// Catalog, translation memory, close keys and writer kept in memory
#[derive(Default)]
pub struct InMemoryCatalog {
    base_language: Option<LanguageRef>,
    keys: Mutex<HashMap<i64, KeyRef>>,
    translations: Mutex<HashMap<(i64, i64), String>>,
    memory: Vec<TranslationMemoryItem>,
    close_keys: HashMap<i64, Vec<i64>>,
    /// Key ids whose lookup fails
    broken_keys: Vec<i64>,
    /// (key id, language id) writes that fail once
    failing_writes: Mutex<Vec<(i64, i64)>>,
    saved: Mutex<Vec<(i64, i64, String)>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default().with_base_language(english())
    }

    pub fn without_base_language() -> Self {
        Self::default()
    }

    pub fn with_base_language(mut self, language: LanguageRef) -> Self {
        self.base_language = Some(language);
        self
    }

    /// Register a key with its base text
    pub fn with_key(self, key: KeyRef, base_text: &str) -> Self {
        let base_id = self.base_language.as_ref().map(|l| l.id).unwrap_or(1);
        self.translations.lock().insert((key.id, base_id), base_text.to_string());
        self.keys.lock().insert(key.id, key);
        self
    }

    pub fn with_translation(self, key_id: i64, language_id: i64, text: &str) -> Self {
        self.translations.lock().insert((key_id, language_id), text.to_string());
        self
    }

    pub fn with_memory(mut self, item: TranslationMemoryItem) -> Self {
        self.memory.push(item);
        self
    }

    pub fn with_close_keys(mut self, key_id: i64, close: &[i64]) -> Self {
        self.close_keys.insert(key_id, close.to_vec());
        self
    }

    pub fn with_broken_key(mut self, key_id: i64) -> Self {
        self.broken_keys.push(key_id);
        self
    }

    /// Fail the first write of `(key_id, language_id)`, later writes succeed
    pub fn with_failing_write_once(self, key_id: i64, language_id: i64) -> Self {
        self.failing_writes.lock().push((key_id, language_id));
        self
    }

    /// (key id, language id, text) written through `TranslationWriter`, in order
    pub fn saved(&self) -> Vec<(i64, i64, String)> {
        self.saved.lock().clone()
    }
}

#[async_trait]
impl ProjectCatalog for InMemoryCatalog {
    async fn project_base_language(&self, _project_id: i64) -> Result<Option<LanguageRef>> {
        Ok(self.base_language.clone())
    }

    async fn existing_translation(&self, key_id: i64, language_id: i64) -> Result<Option<String>> {
        Ok(self.translations.lock().get(&(key_id, language_id)).cloned())
    }

    async fn find_key(&self, _project_id: i64, key_id: i64) -> Result<Option<KeyRef>> {
        if self.broken_keys.contains(&key_id) {
            return Err(anyhow!("catalog unavailable for key {}", key_id));
        }
        Ok(self.keys.lock().get(&key_id).cloned())
    }
}

#[async_trait]
impl TranslationMemory for InMemoryCatalog {
    async fn find_similar(
        &self,
        _project_id: i64,
        _text: &str,
        _target_language: &LanguageRef,
        limit: usize,
    ) -> Result<Vec<TranslationMemoryItem>> {
        Ok(self.memory.iter().take(limit).cloned().collect())
    }
}

#[async_trait]
impl CloseKeyIndex for InMemoryCatalog {
    async fn close_key_ids(&self, key_id: i64) -> Result<Vec<i64>> {
        Ok(self.close_keys.get(&key_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl TranslationLookup for InMemoryCatalog {
    async fn translations_for_keys(&self, key_ids: &[i64], language_ids: &[i64]) -> Result<Vec<StoredTranslation>> {
        let keys = self.keys.lock();
        let translations = self.translations.lock();

        let mut sorted = key_ids.to_vec();
        sorted.sort();

        let mut rows = Vec::new();
        for key_id in sorted {
            let Some(key) = keys.get(&key_id) else { continue };
            for language_id in language_ids {
                if let Some(text) = translations.get(&(key_id, *language_id)) {
                    rows.push(StoredTranslation {
                        key_id,
                        key_name: key.name.clone(),
                        language_id: *language_id,
                        text: Some(text.clone()),
                    });
                }
            }
        }
        Ok(rows)
    }
}

#[async_trait]
impl TranslationWriter for InMemoryCatalog {
    async fn save_translation(&self, key_id: i64, language_id: i64, text: &str) -> Result<()> {
        {
            let mut failing = self.failing_writes.lock();
            if let Some(index) = failing.iter().position(|w| *w == (key_id, language_id)) {
                failing.remove(index);
                return Err(anyhow!("database is locked"));
            }
        }
        self.saved.lock().push((key_id, language_id, text.to_string()));
        self.translations.lock().insert((key_id, language_id), text.to_string());
        Ok(())
    }
}

/// Subscriber keeping every event it receives
#[derive(Default)]
pub struct CapturingSubscriber {
    events: Mutex<Vec<MtEvent>>,
}

impl CapturingSubscriber {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<MtEvent> {
        self.events.lock().clone()
    }
}

impl EventSubscriber for CapturingSubscriber {
    fn on_event(&self, event: &LifecycleEvent) -> Result<()> {
        self.events.lock().push(event.event.clone());
        Ok(())
    }
}

/// Build a memory item for the given key
pub fn memory_item(key_id: i64, key_name: &str, base: &str, target: &str) -> TranslationMemoryItem {
    TranslationMemoryItem {
        key_id,
        key_name: key_name.to_string(),
        base_text: base.to_string(),
        target_text: target.to_string(),
        similarity: 0.9,
    }
}
