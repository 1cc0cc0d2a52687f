/*!
 * Provider transport.
 *
 * `MtServiceManager` owns one adapter per service type, answers repeated
 * plain requests from the cache and applies batch accounting to prices.
 */

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;

use crate::app_config::Config;
use crate::errors::ProviderError;
use crate::model::{MtServiceType, TranslateResult};
use crate::translation::cache::TranslationCache;

use super::{MtProvider, ProviderTranslation, TranslationTransport, TransportRequest, build_provider};

/// Registered adapter with its accounting settings
#[derive(Debug, Clone)]
struct RegisteredProvider {
    provider: Arc<dyn MtProvider>,
    /// Share of the price charged for batch calls, in percent
    batch_price_percent: u32,
}

/// Dispatches transport requests to the registered providers
pub struct MtServiceManager {
    providers: HashMap<MtServiceType, RegisteredProvider>,
    cache: TranslationCache,
}

impl MtServiceManager {
    pub fn new(cache: TranslationCache) -> Self {
        Self {
            providers: HashMap::new(),
            cache,
        }
    }

    /// Build adapters for every usable provider in the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut manager = Self::new(TranslationCache::new(config.cache_enabled));

        for provider_config in &config.providers {
            if !provider_config.is_usable() {
                debug!(
                    "Skipping provider {}: no credentials configured",
                    provider_config.service_type
                );
                continue;
            }

            let provider = build_provider(provider_config)?;
            manager.register_with_pricing(provider, provider_config.batch_price_percent);
        }

        info!(
            "Machine translation providers ready: {:?}",
            manager.available_services()
        );
        Ok(manager)
    }

    /// Register an adapter at full batch price
    pub fn register(&mut self, provider: Arc<dyn MtProvider>) {
        self.register_with_pricing(provider, 100);
    }

    pub fn register_with_pricing(&mut self, provider: Arc<dyn MtProvider>, batch_price_percent: u32) {
        self.providers.insert(
            provider.service_type(),
            RegisteredProvider {
                provider,
                batch_price_percent,
            },
        );
    }

    /// Service types with a registered adapter, sorted
    pub fn available_services(&self) -> Vec<MtServiceType> {
        let mut services: Vec<_> = self.providers.keys().copied().collect();
        services.sort();
        services
    }

    /// Whether the service is registered and can translate into `tag`
    pub fn supports(&self, service: MtServiceType, tag: &str) -> bool {
        self.providers
            .get(&service)
            .is_some_and(|p| p.provider.supports_language(tag))
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    fn charge(price: u64, is_batch: bool, batch_price_percent: u32) -> u64 {
        if is_batch {
            price * batch_price_percent as u64 / 100
        } else {
            price
        }
    }
}

#[async_trait]
impl TranslationTransport for MtServiceManager {
    async fn translate(&self, request: &TransportRequest) -> Result<Vec<TranslateResult>, ProviderError> {
        let service = request.service.service_type;
        let registered = self.providers.get(&service).ok_or_else(|| {
            ProviderError::RequestFailed(format!("No provider registered for service {}", service))
        })?;

        let params = request.provider_params();
        let mut answers: Vec<Option<ProviderTranslation>> = params
            .iter()
            .map(|p| {
                if p.metadata.is_some() {
                    return None;
                }
                self.cache
                    .get(service, p.formality, &p.text, &p.source_tag, &p.target_tag)
            })
            .collect();

        let missing: Vec<usize> = answers
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_none())
            .map(|(i, _)| i)
            .collect();

        if !missing.is_empty() {
            let pending: Vec<_> = missing.iter().map(|i| params[*i].clone()).collect();
            debug!(
                "Calling {} for {} target(s) (batch: {})",
                service,
                pending.len(),
                request.is_batch
            );

            let translated = registered.provider.translate_many(&pending).await?;
            if translated.len() != pending.len() {
                warn!(
                    "{} returned {} results for {} targets",
                    service,
                    translated.len(),
                    pending.len()
                );
                return Err(ProviderError::ParseError(format!(
                    "{} returned {} results for {} targets",
                    service,
                    translated.len(),
                    pending.len()
                )));
            }

            for (index, answer) in missing.into_iter().zip(translated) {
                let p = &params[index];
                if p.metadata.is_none() {
                    self.cache
                        .store(service, p.formality, &p.text, &p.source_tag, &p.target_tag, &answer);
                }
                answers[index] = Some(answer);
            }
        }

        let results = answers
            .into_iter()
            .flatten()
            .map(|answer| TranslateResult {
                translated_text: Some(answer.translated_text),
                context_description: answer.context_description,
                actual_price: Self::charge(answer.price, request.is_batch, registered.batch_price_percent),
                used_service: service,
                base_blank: false,
            })
            .collect();

        Ok(results)
    }
}
