/*!
 * Provider implementations for different machine translation services.
 *
 * This module contains client implementations for the supported vendors:
 * - Google: Google Cloud Translation v2
 * - DeepL: DeepL API v2
 * - Anthropic: Anthropic Messages API (prompt-based, consumes metadata)
 * - Ollama: Local LLM server (prompt-based, consumes metadata)
 *
 * Every adapter implements `MtProvider`; `MtServiceManager` dispatches to
 * them by service type and is the transport the orchestrator talks to.
 */

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;
use crate::model::{Formality, Metadata, MtServiceInfo, MtServiceType, TranslateResult};

/// Input of a single provider call for one target language
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderParams {
    /// Text with placeholders replaced by provider-safe tokens
    pub text: String,
    /// Text exactly as stored
    pub raw_text: String,
    pub key_name: Option<String>,
    pub source_tag: String,
    pub target_tag: String,
    /// Contextual hints, only for services that consume them
    pub metadata: Option<Metadata>,
    pub formality: Option<Formality>,
    pub is_batch: bool,
}

/// Output of a single provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTranslation {
    pub translated_text: String,
    pub context_description: Option<String>,
    /// Cost in credits, before batch accounting
    pub price: u64,
}

impl ProviderTranslation {
    pub fn new(translated_text: impl Into<String>, price: u64) -> Self {
        Self {
            translated_text: translated_text.into(),
            context_description: None,
            price,
        }
    }
}

/// Common trait for all machine translation providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the service manager.
#[async_trait]
pub trait MtProvider: Send + Sync + Debug {
    /// Service type this provider implements
    fn service_type(&self) -> MtServiceType;

    /// Whether the provider can translate into `tag`
    fn supports_language(&self, _tag: &str) -> bool {
        true
    }

    /// Translate one text into one target language
    async fn translate(&self, params: &ProviderParams) -> Result<ProviderTranslation, ProviderError>;

    /// Translate into several target languages, results in input order
    ///
    /// The default issues one call per target. The bundled providers all
    /// take a single target language per request and keep it.
    async fn translate_many(
        &self,
        params: &[ProviderParams],
    ) -> Result<Vec<ProviderTranslation>, ProviderError> {
        let mut results = Vec::with_capacity(params.len());
        for item in params {
            results.push(self.translate(item).await?);
        }
        Ok(results)
    }
}

/// One transport call: a text translated by one service into one or more languages
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub text: String,
    pub raw_text: String,
    pub key_name: Option<String>,
    pub source_tag: String,
    pub target_tags: Vec<String>,
    pub service: MtServiceInfo,
    /// Metadata by target tag
    pub metadata: Option<HashMap<String, Metadata>>,
    pub is_batch: bool,
}

impl TransportRequest {
    /// Per-target provider parameters, in target order
    pub fn provider_params(&self) -> Vec<ProviderParams> {
        self.target_tags
            .iter()
            .map(|target| ProviderParams {
                text: self.text.clone(),
                raw_text: self.raw_text.clone(),
                key_name: self.key_name.clone(),
                source_tag: self.source_tag.clone(),
                target_tag: target.clone(),
                metadata: self
                    .metadata
                    .as_ref()
                    .and_then(|m| m.get(target))
                    .cloned(),
                formality: self.service.formality,
                is_batch: self.is_batch,
            })
            .collect()
    }
}

/// The provider transport consumed by the orchestrator
#[async_trait]
pub trait TranslationTransport: Send + Sync {
    /// Translate into every target of the request; one result per target, in order
    async fn translate(&self, request: &TransportRequest) -> Result<Vec<TranslateResult>, ProviderError>;
}

/// Build the adapter for a provider configuration
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn MtProvider>> {
    let provider: Arc<dyn MtProvider> = match config.service_type {
        MtServiceType::Google => Arc::new(google::GoogleTranslate::from_config(config)?),
        MtServiceType::Deepl => Arc::new(deepl::Deepl::from_config(config)?),
        MtServiceType::Anthropic => Arc::new(anthropic::Anthropic::from_config(config)?),
        MtServiceType::Ollama => Arc::new(ollama::Ollama::from_config(config)?),
    };
    Ok(provider)
}

pub mod anthropic;
pub mod deepl;
pub mod google;
pub mod http;
pub mod manager;
pub mod mock;
pub mod ollama;
pub mod prompt;
