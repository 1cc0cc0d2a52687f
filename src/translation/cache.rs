/*!
 * Provider result caching.
 *
 * The service manager caches plain provider answers to avoid paying twice
 * for the same text. Requests that carry metadata are never cached because
 * their answer depends on the surrounding translations.
 */

use log::debug;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::model::{Formality, MtServiceType};
use crate::providers::ProviderTranslation;

/// Cache key combining text digest, service, formality and language pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    /// SHA-256 of the normalized text
    text_hash: String,
    service: MtServiceType,
    formality: Option<Formality>,
    source_language: String,
    target_language: String,
}

impl CacheKey {
    fn new(
        service: MtServiceType,
        formality: Option<Formality>,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());

        Self {
            text_hash: format!("{:x}", hasher.finalize()),
            service,
            formality,
            source_language: source_language.to_lowercase(),
            target_language: target_language.to_lowercase(),
        }
    }
}

/// Cache for provider answers, shared between clones
pub struct TranslationCache {
    /// Internal cache storage
    cache: Arc<RwLock<HashMap<CacheKey, ProviderTranslation>>>,

    hits: Arc<AtomicUsize>,

    misses: Arc<AtomicUsize>,

    /// Whether caching is enabled
    enabled: bool,
}

impl TranslationCache {
    /// Create a new translation cache
    pub fn new(enabled: bool) -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            hits: Arc::new(AtomicUsize::new(0)),
            misses: Arc::new(AtomicUsize::new(0)),
            enabled,
        }
    }

    /// Get a cached answer; hits are free, so the returned price is zero
    pub fn get(
        &self,
        service: MtServiceType,
        formality: Option<Formality>,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Option<ProviderTranslation> {
        if !self.enabled {
            return None;
        }

        let key = CacheKey::new(service, formality, text, source_language, target_language);
        match self.cache.read().get(&key) {
            Some(cached) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "Cache hit for '{}' ({} -> {}, {})",
                    truncate_text(text, 30),
                    source_language,
                    target_language,
                    service
                );

                Some(ProviderTranslation {
                    price: 0,
                    ..cached.clone()
                })
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a provider answer
    pub fn store(
        &self,
        service: MtServiceType,
        formality: Option<Formality>,
        text: &str,
        source_language: &str,
        target_language: &str,
        translation: &ProviderTranslation,
    ) {
        if !self.enabled {
            return;
        }

        let key = CacheKey::new(service, formality, text, source_language, target_language);
        self.cache.write().insert(key, translation.clone());
    }

    /// Get cache statistics: hits, misses and hit rate
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        (hits, misses, hit_rate)
    }

    /// Clear the cache
    pub fn clear(&self) {
        self.cache.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        debug!("Translation cache cleared");
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Clone for TranslationCache {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            hits: self.hits.clone(),
            misses: self.misses.clone(),
            enabled: self.enabled,
        }
    }
}

/// Truncate text to a maximum number of characters with ellipsis
fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    }
}
