/*!
 * Lookups the orchestrator consumes from the surrounding platform.
 *
 * The SQLite `Repository` implements all of them; tests use in-memory fakes.
 */

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{KeyRef, LanguageRef};

/// A translation memory hit: a similar base text and its translation
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationMemoryItem {
    pub key_id: i64,
    pub key_name: String,
    pub base_text: String,
    pub target_text: String,
    /// Similarity to the queried text, 0.0 - 1.0
    pub similarity: f64,
}

/// A stored translation of a key into one language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTranslation {
    pub key_id: i64,
    pub key_name: String,
    pub language_id: i64,
    pub text: Option<String>,
}

/// Base language and existing translations of a project
#[async_trait]
pub trait ProjectCatalog: Send + Sync {
    async fn project_base_language(&self, project_id: i64) -> Result<Option<LanguageRef>>;

    async fn existing_translation(&self, key_id: i64, language_id: i64) -> Result<Option<String>>;

    async fn find_key(&self, project_id: i64, key_id: i64) -> Result<Option<KeyRef>>;
}

#[async_trait]
pub trait TranslationMemory: Send + Sync {
    /// Up to `limit` translations into `target_language` whose base text resembles `text`, best first
    async fn find_similar(
        &self,
        project_id: i64,
        text: &str,
        target_language: &LanguageRef,
        limit: usize,
    ) -> Result<Vec<TranslationMemoryItem>>;
}

/// Proximity relation between keys that appear together
#[async_trait]
pub trait CloseKeyIndex: Send + Sync {
    async fn close_key_ids(&self, key_id: i64) -> Result<Vec<i64>>;
}

#[async_trait]
pub trait TranslationLookup: Send + Sync {
    /// Translations of `key_ids` in `language_ids`, ordered by key id
    async fn translations_for_keys(
        &self,
        key_ids: &[i64],
        language_ids: &[i64],
    ) -> Result<Vec<StoredTranslation>>;
}

/// Sink for translations produced by batch chunks
#[async_trait]
pub trait TranslationWriter: Send + Sync {
    async fn save_translation(&self, key_id: i64, language_id: i64, text: &str) -> Result<()>;
}
