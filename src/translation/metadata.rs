/*!
 * Metadata assembly for prompt-based providers.
 *
 * Each target language gets translation memory examples for the text,
 * translations of keys that appear close to the current key, and the
 * key/project/language descriptions. Lookup failures only drop the part
 * they would have produced.
 */

use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{ExampleItem, KeyRef, LanguageRef, Metadata, ProjectRef};

use super::lookup::{CloseKeyIndex, StoredTranslation, TranslationLookup, TranslationMemory};

/// Translation memory examples attached per language
pub const EXAMPLE_LIMIT: usize = 5;

/// Builds per-language metadata from the optional lookups
#[derive(Clone, Default)]
pub struct MetadataAssembler {
    memory: Option<Arc<dyn TranslationMemory>>,
    close_keys: Option<Arc<dyn CloseKeyIndex>>,
    translations: Option<Arc<dyn TranslationLookup>>,
}

impl MetadataAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memory(mut self, memory: Arc<dyn TranslationMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Close items need both the proximity index and the translation lookup
    pub fn with_close_keys(
        mut self,
        close_keys: Arc<dyn CloseKeyIndex>,
        translations: Arc<dyn TranslationLookup>,
    ) -> Self {
        self.close_keys = Some(close_keys);
        self.translations = Some(translations);
        self
    }

    /// Metadata keyed by target tag, or `None` when nothing needs it
    pub async fn build(
        &self,
        needs_metadata: bool,
        project: &ProjectRef,
        source_language: &LanguageRef,
        target_languages: &[LanguageRef],
        text: &str,
        key: Option<&KeyRef>,
    ) -> Option<HashMap<String, Metadata>> {
        if !needs_metadata {
            return None;
        }

        let close_ids = match key {
            Some(key) => self.close_key_ids(key.id).await,
            None => Vec::new(),
        };

        let mut result = HashMap::with_capacity(target_languages.len());
        for target in target_languages {
            let metadata = Metadata {
                examples: self.examples(project, text, target, key).await,
                close_items: self
                    .close_items(&close_ids, source_language, target, key)
                    .await,
                key_description: key.and_then(|k| non_blank(&k.description)),
                project_description: non_blank(&project.ai_description),
                language_description: non_blank(&target.ai_description),
            };
            result.insert(target.tag.clone(), metadata);
        }

        debug!("Built metadata for {} target language(s)", result.len());
        Some(result)
    }

    async fn examples(
        &self,
        project: &ProjectRef,
        text: &str,
        target: &LanguageRef,
        key: Option<&KeyRef>,
    ) -> Vec<ExampleItem> {
        let Some(memory) = &self.memory else {
            return Vec::new();
        };
        if text.trim().is_empty() {
            return Vec::new();
        }

        match memory.find_similar(project.id, text, target, EXAMPLE_LIMIT).await {
            Ok(items) => items
                .into_iter()
                .filter(|item| key.is_none_or(|k| k.id != item.key_id))
                .map(|item| ExampleItem::new(item.key_name, item.base_text, item.target_text))
                .collect(),
            Err(e) => {
                warn!("Translation memory lookup failed, continuing without examples: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn close_key_ids(&self, key_id: i64) -> Vec<i64> {
        let Some(index) = &self.close_keys else {
            return Vec::new();
        };

        index.close_key_ids(key_id).await.unwrap_or_else(|e| {
            warn!("Close key lookup failed, continuing without close items: {:#}", e);
            Vec::new()
        })
    }

    async fn close_items(
        &self,
        close_ids: &[i64],
        source: &LanguageRef,
        target: &LanguageRef,
        key: Option<&KeyRef>,
    ) -> Vec<ExampleItem> {
        let Some(lookup) = &self.translations else {
            return Vec::new();
        };
        if close_ids.is_empty() {
            return Vec::new();
        }

        let stored = match lookup
            .translations_for_keys(close_ids, &[source.id, target.id])
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Close translation lookup failed, continuing without close items: {:#}", e);
                return Vec::new();
            }
        };

        pair_close_translations(&stored, source.id, target.id, key.map(|k| k.id))
    }
}

/// Pair source and target translations by key; the current key never exposes its target
fn pair_close_translations(
    stored: &[StoredTranslation],
    source_language_id: i64,
    target_language_id: i64,
    current_key_id: Option<i64>,
) -> Vec<ExampleItem> {
    let targets: HashMap<i64, &str> = stored
        .iter()
        .filter(|t| t.language_id == target_language_id)
        .filter_map(|t| t.text.as_deref().map(|text| (t.key_id, text)))
        .collect();

    stored
        .iter()
        .filter(|t| t.language_id == source_language_id)
        .filter_map(|source| {
            let text = source.text.as_deref().filter(|t| !t.trim().is_empty())?;
            let target = if Some(source.key_id) == current_key_id {
                ""
            } else {
                targets.get(&source.key_id).copied().unwrap_or("")
            };
            Some(ExampleItem::new(source.key_name.clone(), text, target))
        })
        .collect()
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .filter(|v| !v.trim().is_empty())
        .cloned()
}
